use std::any::Any;

use crate::config::ResolverConfig;
use crate::container::autowiring::TypeMetadata;
use crate::container::descriptor::{Implementation, ServiceDescriptor, ServiceId};
use crate::container::registry::ServiceRegistry;
use crate::container::scope::ServiceScope;
use crate::container::validation::PlanValidator;
use crate::errors::CoreError;

/// Builder collecting registrations into an immutable [`ServiceRegistry`]
#[derive(Debug, Default)]
pub struct ServiceRegistryBuilder {
    registry: ServiceRegistry,
    config: ResolverConfig,
}

impl ServiceRegistryBuilder {
    /// Create a new registry builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration used for default lifetimes and build-time validation
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Bind a contract to an implementation type with the default lifetime
    pub fn bind(
        self,
        service_id: impl Into<ServiceId>,
        metadata: TypeMetadata,
    ) -> Result<Self, CoreError> {
        let lifetime = self.config.default_lifetime;
        self.bind_with(service_id, metadata, lifetime)
    }

    /// Bind a contract to an implementation type with an explicit lifetime
    pub fn bind_with(
        self,
        service_id: impl Into<ServiceId>,
        metadata: TypeMetadata,
        lifetime: ServiceScope,
    ) -> Result<Self, CoreError> {
        let service_id = service_id.into();
        if metadata.is_open() {
            return Err(CoreError::registration(format!(
                "'{}' is an open generic type; register it with bind_open_generic",
                metadata.service_id
            )));
        }
        self.add(ServiceDescriptor::for_type(service_id, metadata, lifetime))
    }

    /// Bind a contract to a fixed instance
    pub fn bind_instance<T: Any + Send + Sync>(
        self,
        service_id: impl Into<ServiceId>,
        instance: T,
    ) -> Result<Self, CoreError> {
        self.add(ServiceDescriptor::for_instance(service_id.into(), instance))
    }

    /// Bind a contract to a factory delegate
    pub fn bind_factory<F, T>(
        self,
        service_id: impl Into<ServiceId>,
        lifetime: ServiceScope,
        factory: F,
    ) -> Result<Self, CoreError>
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        self.add(ServiceDescriptor::for_factory(service_id.into(), lifetime, factory))
    }

    /// Bind an open generic contract, e.g. `IRepository<T>` to `Repository<T>`.
    ///
    /// The contract takes one argument per type parameter of `metadata`, in order.
    pub fn bind_open_generic(
        self,
        contract: impl Into<String>,
        metadata: TypeMetadata,
        lifetime: ServiceScope,
    ) -> Result<Self, CoreError> {
        if !metadata.is_open() {
            return Err(CoreError::registration(format!(
                "'{}' has no type parameters and cannot back an open generic contract",
                metadata.service_id
            )));
        }

        let type_args = metadata
            .type_params
            .iter()
            .map(|param| ServiceId::new(param.clone()))
            .collect();
        let service_id = ServiceId::generic(contract, type_args);
        self.add(ServiceDescriptor::for_type(service_id, metadata, lifetime))
    }

    /// Add a prepared descriptor
    pub fn add(mut self, descriptor: ServiceDescriptor) -> Result<Self, CoreError> {
        if let Implementation::Type(metadata) = &descriptor.implementation {
            if let Some(param) = metadata
                .type_params
                .iter()
                .find(|param| !descriptor.service_id.references(param))
            {
                return Err(CoreError::registration(format!(
                    "type parameter '{}' of '{}' does not appear in open generic contract '{}'",
                    param, metadata.service_id, descriptor.service_id
                )));
            }
        }
        self.registry.insert(descriptor);
        Ok(self)
    }

    /// Finish registration
    pub fn build(self) -> Result<ServiceRegistry, CoreError> {
        if self.config.validate_on_build {
            PlanValidator::with_config(&self.registry, self.config.clone())
                .validate_registry()
                .map_err(|failures| CoreError::Validation { failures })?;
        }
        tracing::debug!("Built service registry with {} registration(s)", self.registry.len());
        Ok(self.registry)
    }
}
