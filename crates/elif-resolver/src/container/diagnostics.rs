//! Structured resolution failures.
//!
//! Failures keep service IDs and constructor signatures as data; text is only
//! produced by `Display` at the presentation boundary.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::container::autowiring::{ConstructorInfo, Dependency};
use crate::container::descriptor::ServiceId;
use crate::container::scope::ServiceScope;

/// Parameter-type signature of one constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructorSignature {
    /// Declaration index among all constructors of the type
    pub index: usize,
    pub parameters: Vec<Dependency>,
}

impl ConstructorSignature {
    pub fn of(index: usize, constructor: &ConstructorInfo) -> Self {
        Self {
            index,
            parameters: constructor.parameter_types(),
        }
    }
}

impl fmt::Display for ConstructorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

/// A constructor rejected because one of its parameters could not be satisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedConstructor {
    pub signature: ConstructorSignature,
    /// First parameter contract that was neither registered nor defaulted
    pub parameter: ServiceId,
}

/// Reasons a resolution request can fail
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionFailure {
    #[error("No service registered for '{contract}'")]
    ServiceNotRegistered { contract: ServiceId },

    #[error("'{implementation}' (resolving '{contract}') has no public constructor")]
    NoPublicConstructor {
        contract: ServiceId,
        implementation: ServiceId,
    },

    #[error(
        "No constructor of '{implementation}' (resolving '{contract}') can be satisfied: {}",
        render_unresolved(.constructors)
    )]
    NoViableConstructor {
        contract: ServiceId,
        implementation: ServiceId,
        constructors: Vec<UnresolvedConstructor>,
    },

    #[error(
        "Unable to resolve parameter '{parameter}' while activating '{implementation}' (resolving '{contract}')"
    )]
    UnresolvableParameter {
        contract: ServiceId,
        implementation: ServiceId,
        parameter: ServiceId,
    },

    #[error(
        "Multiple constructors of '{implementation}' (resolving '{contract}') are equally satisfiable: {}",
        render_signatures(.constructors)
    )]
    AmbiguousConstructors {
        contract: ServiceId,
        implementation: ServiceId,
        constructors: Vec<ConstructorSignature>,
    },

    #[error("Circular dependency detected: {}", render_path(.path))]
    CyclicDependency { path: Vec<ServiceId> },

    #[error(
        "'{service}' ({lifetime}) captures '{dependency}' ({dependency_lifetime}) via {}",
        render_path(.path)
    )]
    CaptiveDependency {
        service: ServiceId,
        lifetime: ServiceScope,
        dependency: ServiceId,
        dependency_lifetime: ServiceScope,
        path: Vec<ServiceId>,
    },
}

impl ResolutionFailure {
    /// Short machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceNotRegistered { .. } => "service_not_registered",
            Self::NoPublicConstructor { .. } => "no_public_constructor",
            Self::NoViableConstructor { .. } => "no_viable_constructor",
            Self::UnresolvableParameter { .. } => "unresolvable_parameter",
            Self::AmbiguousConstructors { .. } => "ambiguous_constructors",
            Self::CyclicDependency { .. } => "cyclic_dependency",
            Self::CaptiveDependency { .. } => "captive_dependency",
        }
    }

    /// The contract being resolved when the failure was decided
    pub fn contract(&self) -> Option<&ServiceId> {
        match self {
            Self::ServiceNotRegistered { contract }
            | Self::NoPublicConstructor { contract, .. }
            | Self::NoViableConstructor { contract, .. }
            | Self::UnresolvableParameter { contract, .. }
            | Self::AmbiguousConstructors { contract, .. } => Some(contract),
            Self::CyclicDependency { path } => path.last(),
            Self::CaptiveDependency { service, .. } => Some(service),
        }
    }

    /// The implementation type under evaluation, if any
    pub fn implementation(&self) -> Option<&ServiceId> {
        match self {
            Self::NoPublicConstructor { implementation, .. }
            | Self::NoViableConstructor { implementation, .. }
            | Self::UnresolvableParameter { implementation, .. }
            | Self::AmbiguousConstructors { implementation, .. } => Some(implementation),
            _ => None,
        }
    }

    /// Export the failure as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn render_signatures(signatures: &[ConstructorSignature]) -> String {
    signatures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_unresolved(constructors: &[UnresolvedConstructor]) -> String {
    constructors
        .iter()
        .map(|c| format!("{} missing '{}'", c.signature, c.parameter))
        .collect::<Vec<_>>()
        .join("; ")
}

fn render_path(path: &[ServiceId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(index: usize, params: &[&str]) -> ConstructorSignature {
        ConstructorSignature {
            index,
            parameters: params.iter().map(|p| Dependency::Single((*p).into())).collect(),
        }
    }

    #[test]
    fn test_ambiguous_message_lists_signatures() {
        let failure = ResolutionFailure::AmbiguousConstructors {
            contract: "IService".into(),
            implementation: "Service".into(),
            constructors: vec![signature(0, &["IFoo"]), signature(1, &["IBar"])],
        };

        assert_eq!(
            failure.to_string(),
            "Multiple constructors of 'Service' (resolving 'IService') are equally satisfiable: (IFoo), (IBar)"
        );
        assert_eq!(failure.kind(), "ambiguous_constructors");
        assert_eq!(failure.implementation(), Some(&ServiceId::new("Service")));
    }

    #[test]
    fn test_cycle_message_renders_path() {
        let failure = ResolutionFailure::CyclicDependency {
            path: vec!["IA".into(), "IB".into(), "IA".into()],
        };
        assert_eq!(failure.to_string(), "Circular dependency detected: IA -> IB -> IA");
        assert_eq!(failure.contract(), Some(&ServiceId::new("IA")));
    }

    #[test]
    fn test_no_viable_message() {
        let failure = ResolutionFailure::NoViableConstructor {
            contract: "IService".into(),
            implementation: "Service".into(),
            constructors: vec![UnresolvedConstructor {
                signature: signature(0, &["IFoo", "IBar"]),
                parameter: "IBar".into(),
            }],
        };
        assert!(failure.to_string().ends_with("(IFoo, IBar) missing 'IBar'"));
    }

    #[test]
    fn test_json_export_is_structured() {
        let failure = ResolutionFailure::UnresolvableParameter {
            contract: "IService".into(),
            implementation: "Service".into(),
            parameter: "IFoo".into(),
        };

        let json: serde_json::Value = serde_json::from_str(&failure.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "unresolvable_parameter");
        assert_eq!(json["parameter"]["type_name"], "IFoo");
    }
}
