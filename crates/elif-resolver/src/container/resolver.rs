use std::ops::{Deref, DerefMut};

use crate::config::ResolverConfig;
use crate::container::autowiring::{Dependency, TypeMetadata};
use crate::container::call_site::CallSite;
use crate::container::constructor::{ConstructorSelector, ParameterSource};
use crate::container::descriptor::{Implementation, ServiceDescriptor, ServiceId};
use crate::container::diagnostics::ResolutionFailure;
use crate::container::registry::ServiceRegistry;
use crate::container::validation::PlanValidator;

/// Contracts currently being resolved on the active call chain
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    services: Vec<ServiceId>,
}

impl ResolutionPath {
    /// Create a new resolution path
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, service_id: ServiceId) {
        self.services.push(service_id);
    }

    fn pop(&mut self) -> Option<ServiceId> {
        self.services.pop()
    }

    /// Check if the path contains a service (for cycle detection)
    pub fn contains(&self, service_id: &ServiceId) -> bool {
        self.services.contains(service_id)
    }

    pub fn depth(&self) -> usize {
        self.services.len()
    }

    /// Contracts on the path, outermost first
    pub fn services(&self) -> &[ServiceId] {
        &self.services
    }

    /// Push `service_id`, failing if it is already on the path.
    ///
    /// The returned guard pops the entry when dropped, on success and failure alike.
    pub fn enter(&mut self, service_id: &ServiceId) -> Result<PathGuard<'_>, ResolutionFailure> {
        if self.contains(service_id) {
            let mut cycle = self.services.clone();
            cycle.push(service_id.clone());
            return Err(ResolutionFailure::CyclicDependency { path: cycle });
        }
        self.push(service_id.clone());
        Ok(PathGuard { path: self })
    }
}

/// Scoped entry on a [`ResolutionPath`]
#[derive(Debug)]
pub struct PathGuard<'p> {
    path: &'p mut ResolutionPath,
}

impl Deref for PathGuard<'_> {
    type Target = ResolutionPath;

    fn deref(&self) -> &Self::Target {
        self.path
    }
}

impl DerefMut for PathGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.path
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.path.pop();
    }
}

/// Builds call-site plans from a finished registry.
///
/// Each top-level call starts with a fresh [`ResolutionPath`], so a resolver
/// can be shared between threads together with its registry.
#[derive(Debug, Clone)]
pub struct CallSiteResolver<'r> {
    registry: &'r ServiceRegistry,
    config: ResolverConfig,
}

impl<'r> CallSiteResolver<'r> {
    /// Create a resolver with default configuration
    pub fn new(registry: &'r ServiceRegistry) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    pub fn with_config(registry: &'r ServiceRegistry, config: ResolverConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &'r ServiceRegistry {
        self.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Plan the construction of a single implementation of `service_id`
    pub fn resolve(&self, service_id: &ServiceId) -> Result<CallSite, ResolutionFailure> {
        self.resolve_dependency(&Dependency::Single(service_id.clone()))
    }

    /// Plan the construction of every implementation of `service_id`
    pub fn resolve_all(&self, service_id: &ServiceId) -> Result<CallSite, ResolutionFailure> {
        self.resolve_dependency(&Dependency::All(service_id.clone()))
    }

    /// Plan a request in either shape
    pub fn resolve_dependency(
        &self,
        dependency: &Dependency,
    ) -> Result<CallSite, ResolutionFailure> {
        tracing::debug!("Resolving '{}'", dependency);
        let mut path = ResolutionPath::new();
        let plan = match dependency {
            Dependency::Single(service_id) => self.resolve_single(service_id, &mut path),
            Dependency::All(service_id) => self.resolve_collection(service_id, &mut path),
        };

        let plan = match plan {
            Ok(plan) => plan,
            Err(failure) => {
                tracing::debug!("Resolution of '{}' failed: {}", dependency, failure);
                return Err(failure);
            }
        };

        if self.config.validate_lifetimes {
            PlanValidator::validate_lifetimes(&plan)?;
        }
        Ok(plan)
    }

    fn resolve_single(
        &self,
        service_id: &ServiceId,
        path: &mut ResolutionPath,
    ) -> Result<CallSite, ResolutionFailure> {
        let descriptor = self
            .registry
            .lookup_last(service_id)
            .ok_or_else(|| ResolutionFailure::ServiceNotRegistered {
                contract: service_id.clone(),
            })?;
        self.resolve_descriptor(&descriptor, path)
    }

    fn resolve_collection(
        &self,
        service_id: &ServiceId,
        path: &mut ResolutionPath,
    ) -> Result<CallSite, ResolutionFailure> {
        let members = self
            .registry
            .lookup_all(service_id)
            .iter()
            .map(|descriptor| self.resolve_descriptor(descriptor, path))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::trace!("Collected {} implementation(s) of '{}'", members.len(), service_id);
        Ok(CallSite::CollectAll {
            service_id: service_id.clone(),
            members,
        })
    }

    fn resolve_descriptor(
        &self,
        descriptor: &ServiceDescriptor,
        path: &mut ResolutionPath,
    ) -> Result<CallSite, ResolutionFailure> {
        let mut guard = path.enter(&descriptor.service_id)?;

        let site = match &descriptor.implementation {
            Implementation::Instance(instance) => CallSite::Instance {
                service_id: descriptor.service_id.clone(),
                instance: instance.clone(),
            },
            Implementation::Factory(factory) => CallSite::Factory {
                service_id: descriptor.service_id.clone(),
                factory: factory.clone(),
            },
            Implementation::Type(metadata) => {
                self.construct(&descriptor.service_id, metadata, &mut guard)?
            }
        };

        Ok(site.with_lifetime(descriptor.lifetime, descriptor.service_id.clone()))
    }

    fn construct(
        &self,
        contract: &ServiceId,
        metadata: &TypeMetadata,
        path: &mut ResolutionPath,
    ) -> Result<CallSite, ResolutionFailure> {
        let selection = ConstructorSelector::new(self.registry).choose(contract, metadata)?;
        if selection.arity() == 0 {
            return Ok(CallSite::Instantiate {
                implementation: metadata.service_id.clone(),
            });
        }

        let constructor = &metadata.constructors[selection.index()];
        let mut arguments = Vec::with_capacity(selection.arity());
        for (parameter, source) in constructor.parameters.iter().zip(&selection.sources) {
            let dependency = parameter.dependency.service_id();
            let argument = match source {
                ParameterSource::Registry => self.resolve_single(dependency, path)?,
                ParameterSource::Collection => self.resolve_collection(dependency, path)?,
                ParameterSource::Default(value) => CallSite::DefaultValue { value: value.clone() },
            };
            arguments.push(argument);
        }

        Ok(CallSite::ConstructWith {
            implementation: metadata.service_id.clone(),
            constructor: selection.signature,
            arguments,
        })
    }
}
