pub mod config;
pub mod container;
pub mod errors;

// Re-export key types for convenience
pub use config::{ConfigError, ConfigLoader, ConfigSource, ResolverConfig, Setting};
pub use container::{
    CallSite, CallSiteResolver, ConstructorInfo, ConstructorSignature, Dependency, GenericShape,
    Implementation, ParameterInfo, PlanValidator, ResolutionFailure, ResolutionPath,
    ServiceDescriptor, ServiceId, ServiceRegistry, ServiceRegistryBuilder, ServiceScope,
    TypeMetadata, Visibility,
};
pub use errors::CoreError;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
