//! Constructor candidate evaluation.
//!
//! Candidates are visited in descending parameter count (declaration order
//! within equal counts). A parameter is satisfied by a registration, by a
//! collect-all request, or by its declared default; only registrations count
//! toward a constructor's score.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::container::autowiring::{ConstructorInfo, Dependency, TypeMetadata};
use crate::container::descriptor::ServiceId;
use crate::container::diagnostics::{ConstructorSignature, ResolutionFailure, UnresolvedConstructor};
use crate::container::registry::ServiceRegistry;

/// How a selected constructor's parameter will be supplied
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSource {
    /// Single implementation looked up in the registry
    Registry,
    /// Every registered implementation (possibly none)
    Collection,
    /// The parameter's declared default
    Default(Value),
}

/// A constructor that passed viability, with its score
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorSelection {
    pub signature: ConstructorSignature,
    /// One entry per parameter, in declaration order
    pub sources: Vec<ParameterSource>,
    /// Number of registry-satisfied parameters
    pub score: usize,
    /// Number of collect-all parameters
    pub collect_count: usize,
    resolved: BTreeSet<ServiceId>,
}

impl ConstructorSelection {
    /// Declaration index of the chosen constructor
    pub fn index(&self) -> usize {
        self.signature.index
    }

    pub fn arity(&self) -> usize {
        self.sources.len()
    }

    /// Contracts satisfied through the registry
    pub fn resolved_services(&self) -> impl Iterator<Item = &ServiceId> {
        self.resolved.iter()
    }
}

/// Scores the public constructors of an implementation type against a registry
#[derive(Debug, Clone, Copy)]
pub struct ConstructorSelector<'r> {
    registry: &'r ServiceRegistry,
}

impl<'r> ConstructorSelector<'r> {
    pub fn new(registry: &'r ServiceRegistry) -> Self {
        Self { registry }
    }

    /// Check one constructor for viability.
    ///
    /// Stops at the first parameter that is neither registered, collected nor defaulted.
    pub fn evaluate(
        &self,
        index: usize,
        constructor: &ConstructorInfo,
    ) -> Result<ConstructorSelection, UnresolvedConstructor> {
        let signature = ConstructorSignature::of(index, constructor);
        let mut sources = Vec::with_capacity(constructor.arity());
        let mut resolved = BTreeSet::new();
        let mut collect_count = 0;

        for parameter in &constructor.parameters {
            match &parameter.dependency {
                Dependency::All(_) => {
                    collect_count += 1;
                    sources.push(ParameterSource::Collection);
                }
                Dependency::Single(service_id) => {
                    if self.registry.contains(service_id) {
                        resolved.insert(service_id.clone());
                        sources.push(ParameterSource::Registry);
                    } else if let Some(value) = &parameter.default_value {
                        sources.push(ParameterSource::Default(value.clone()));
                    } else {
                        return Err(UnresolvedConstructor {
                            signature,
                            parameter: service_id.clone(),
                        });
                    }
                }
            }
        }

        let score = sources
            .iter()
            .filter(|s| matches!(s, ParameterSource::Registry))
            .count();

        Ok(ConstructorSelection {
            signature,
            sources,
            score,
            collect_count,
            resolved,
        })
    }

    /// Pick the constructor to use for `metadata` when resolving `contract`
    pub fn choose(
        &self,
        contract: &ServiceId,
        metadata: &TypeMetadata,
    ) -> Result<ConstructorSelection, ResolutionFailure> {
        let mut candidates: Vec<(usize, &ConstructorInfo)> =
            metadata.public_constructors().collect();
        if candidates.is_empty() {
            return Err(ResolutionFailure::NoPublicConstructor {
                contract: contract.clone(),
                implementation: metadata.service_id.clone(),
            });
        }
        // Stable sort keeps declaration order within equal parameter counts
        candidates.sort_by(|(_, a), (_, b)| b.arity().cmp(&a.arity()));

        let mut viable = Vec::new();
        let mut unresolved = Vec::new();
        for (index, constructor) in &candidates {
            match self.evaluate(*index, constructor) {
                Ok(selection) => {
                    tracing::trace!(
                        "Constructor {}{} is viable with score {}",
                        metadata.service_id,
                        selection.signature,
                        selection.score
                    );
                    viable.push(selection);
                }
                Err(rejected) => {
                    tracing::trace!(
                        "Constructor {}{} rejected: '{}' is not resolvable",
                        metadata.service_id,
                        rejected.signature,
                        rejected.parameter
                    );
                    unresolved.push(rejected);
                }
            }
        }

        let Some(best) = viable.iter().map(|s| s.score).max() else {
            return Err(if candidates.len() == 1 {
                let parameter = unresolved
                    .into_iter()
                    .next()
                    .map(|u| u.parameter)
                    .unwrap_or_else(|| metadata.service_id.clone());
                ResolutionFailure::UnresolvableParameter {
                    contract: contract.clone(),
                    implementation: metadata.service_id.clone(),
                    parameter,
                }
            } else {
                ResolutionFailure::NoViableConstructor {
                    contract: contract.clone(),
                    implementation: metadata.service_id.clone(),
                    constructors: unresolved,
                }
            });
        };

        let mut tier: Vec<ConstructorSelection> =
            viable.into_iter().filter(|s| s.score == best).collect();
        if tier.len() == 1 || Self::has_unique_most_specific(&tier) {
            let chosen = tier.swap_remove(0);
            tracing::debug!(
                "Selected constructor {}{} for '{}' (score {})",
                metadata.service_id,
                chosen.signature,
                contract,
                chosen.score
            );
            return Ok(chosen);
        }

        tracing::debug!(
            "{} constructors of '{}' tie at score {}",
            tier.len(),
            metadata.service_id,
            best
        );
        Err(ResolutionFailure::AmbiguousConstructors {
            contract: contract.clone(),
            implementation: metadata.service_id.clone(),
            constructors: tier.into_iter().map(|s| s.signature).collect(),
        })
    }

    /// A tie is broken only when every tied constructor resolves the same
    /// contracts and the first (longest) one has strictly more parameters.
    fn has_unique_most_specific(tier: &[ConstructorSelection]) -> bool {
        let identical = tier.windows(2).all(|pair| pair[0].resolved == pair[1].resolved);
        identical && tier.len() > 1 && tier[0].arity() > tier[1].arity()
    }
}
