pub mod autowiring;
pub mod builder;
pub mod call_site;
pub mod constructor;
pub mod descriptor;
pub mod diagnostics;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod validation;

pub use autowiring::{ConstructorInfo, Dependency, ParameterInfo, TypeMetadata, Visibility};
pub use builder::ServiceRegistryBuilder;
pub use call_site::CallSite;
pub use constructor::{ConstructorSelection, ConstructorSelector, ParameterSource};
pub use descriptor::{GenericShape, Implementation, ServiceDescriptor, ServiceFactory, ServiceId};
pub use diagnostics::{ConstructorSignature, ResolutionFailure, UnresolvedConstructor};
pub use registry::ServiceRegistry;
pub use resolver::{CallSiteResolver, PathGuard, ResolutionPath};
pub use scope::ServiceScope;
pub use validation::PlanValidator;
