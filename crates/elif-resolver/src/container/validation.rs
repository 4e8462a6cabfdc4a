use crate::config::ResolverConfig;
use crate::container::call_site::CallSite;
use crate::container::descriptor::ServiceId;
use crate::container::diagnostics::ResolutionFailure;
use crate::container::registry::ServiceRegistry;
use crate::container::resolver::CallSiteResolver;
use crate::container::scope::ServiceScope;

/// Ahead-of-time checks over a whole registry or a single plan
#[derive(Debug, Clone)]
pub struct PlanValidator<'r> {
    resolver: CallSiteResolver<'r>,
}

impl<'r> PlanValidator<'r> {
    pub fn new(registry: &'r ServiceRegistry) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    pub fn with_config(registry: &'r ServiceRegistry, config: ResolverConfig) -> Self {
        Self {
            resolver: CallSiteResolver::with_config(registry, config),
        }
    }

    /// Resolve every registration of every closed contract and collect all failures.
    ///
    /// Open generic registrations are only checked once a closed contract reaches them.
    pub fn validate_registry(&self) -> Result<(), Vec<ResolutionFailure>> {
        let mut failures: Vec<ResolutionFailure> = Vec::new();

        for service_id in self.resolver.registry().service_ids() {
            if let Err(failure) = self.resolver.resolve_all(&service_id) {
                if !failures.contains(&failure) {
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            tracing::warn!("Registry validation found {} failure(s)", failures.len());
            Err(failures)
        }
    }

    /// Reject plans in which a singleton captures a scoped service
    pub fn validate_lifetimes(plan: &CallSite) -> Result<(), ResolutionFailure> {
        let mut chain = Vec::new();
        Self::check_lifetimes(plan, &mut chain)
    }

    fn check_lifetimes(
        site: &CallSite,
        chain: &mut Vec<(ServiceId, ServiceScope)>,
    ) -> Result<(), ResolutionFailure> {
        if let CallSite::Lifetime {
            lifetime,
            service_id,
            ..
        } = site
        {
            let captor = chain
                .iter()
                .position(|(_, owner)| !owner.can_depend_on(*lifetime));
            if let Some(owner) = captor {
                let (service, owner_lifetime) = chain[owner].clone();
                let mut path: Vec<ServiceId> =
                    chain[owner..].iter().map(|(id, _)| id.clone()).collect();
                path.push(service_id.clone());
                return Err(ResolutionFailure::CaptiveDependency {
                    service,
                    lifetime: owner_lifetime,
                    dependency: service_id.clone(),
                    dependency_lifetime: *lifetime,
                    path,
                });
            }
            chain.push((service_id.clone(), *lifetime));
            for child in site.dependencies() {
                Self::check_lifetimes(child, chain)?;
            }
            chain.pop();
            return Ok(());
        }

        for child in site.dependencies() {
            Self::check_lifetimes(child, chain)?;
        }
        Ok(())
    }
}
