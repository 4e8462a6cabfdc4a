//! Constructor metadata for implementation types.
//!
//! Each implementation type carries an explicit table of its constructors,
//! built once at registration time. The resolver selects among them without
//! any runtime type introspection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::container::descriptor::ServiceId;

/// Shape in which a constructor parameter requests its contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "service", rename_all = "snake_case")]
pub enum Dependency {
    /// A single implementation (the last registration wins)
    Single(ServiceId),
    /// Every registered implementation, in registration order
    All(ServiceId),
}

impl Dependency {
    /// The contract this dependency refers to
    pub fn service_id(&self) -> &ServiceId {
        match self {
            Dependency::Single(id) | Dependency::All(id) => id,
        }
    }

    /// Whether this is a collect-all request
    pub fn is_collection(&self) -> bool {
        matches!(self, Dependency::All(_))
    }

    fn substitute(&self, params: &[String], args: &[ServiceId]) -> Dependency {
        match self {
            Dependency::Single(id) => Dependency::Single(id.substitute(params, args)),
            Dependency::All(id) => Dependency::All(id.substitute(params, args)),
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::Single(id) => write!(f, "{}", id),
            Dependency::All(id) => write!(f, "[{}]", id),
        }
    }
}

/// Metadata about a constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// Optional parameter name, used in diagnostics only
    pub name: Option<String>,
    /// The contract this parameter requires
    pub dependency: Dependency,
    /// Literal default used when the contract is not registered
    pub default_value: Option<Value>,
}

impl ParameterInfo {
    /// Parameter requiring a single implementation of `service_id`
    pub fn single(service_id: impl Into<ServiceId>) -> Self {
        Self {
            name: None,
            dependency: Dependency::Single(service_id.into()),
            default_value: None,
        }
    }

    /// Parameter requiring every implementation of `service_id`
    pub fn all(service_id: impl Into<ServiceId>) -> Self {
        Self {
            name: None,
            dependency: Dependency::All(service_id.into()),
            default_value: None,
        }
    }

    /// Set the parameter name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare a default value for this parameter
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Whether the parameter declares a default value
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }
}

/// Accessibility of a constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Metadata about a single constructor
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorInfo {
    pub visibility: Visibility,
    /// Parameters in declaration order
    pub parameters: Vec<ParameterInfo>,
}

impl ConstructorInfo {
    /// A public constructor with the given parameters
    pub fn public(parameters: Vec<ParameterInfo>) -> Self {
        Self {
            visibility: Visibility::Public,
            parameters,
        }
    }

    /// A constructor the resolver is not allowed to call
    pub fn private(parameters: Vec<ParameterInfo>) -> Self {
        Self {
            visibility: Visibility::Private,
            parameters,
        }
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Parameter contracts in declaration order
    pub fn parameter_types(&self) -> Vec<Dependency> {
        self.parameters.iter().map(|p| p.dependency.clone()).collect()
    }
}

/// Constructor table for one implementation type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMetadata {
    /// Identity of the implementation type
    pub service_id: ServiceId,
    /// Named type parameters, empty unless the type is an open generic
    pub type_params: Vec<String>,
    /// Constructors in declaration order
    pub constructors: Vec<ConstructorInfo>,
}

impl TypeMetadata {
    /// Metadata for a non-generic type with no constructors yet
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            service_id: ServiceId::new(type_name),
            type_params: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Metadata for an open generic type such as `Repository<T>`
    pub fn open<I, S>(type_name: impl Into<String>, type_params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_params: Vec<String> = type_params.into_iter().map(Into::into).collect();
        let type_args = type_params.iter().map(|p| ServiceId::new(p.clone())).collect();
        Self {
            service_id: ServiceId::generic(type_name, type_args),
            type_params,
            constructors: Vec::new(),
        }
    }

    /// Add a constructor
    pub fn with_constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a public parameterless constructor
    pub fn with_default_constructor(self) -> Self {
        self.with_constructor(ConstructorInfo::public(Vec::new()))
    }

    /// Public constructors paired with their declaration index
    pub fn public_constructors(&self) -> impl Iterator<Item = (usize, &ConstructorInfo)> {
        self.constructors
            .iter()
            .enumerate()
            .filter(|(_, ctor)| ctor.is_public())
    }

    /// Whether the type still has unbound type parameters
    pub fn is_open(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Arity of the generic definition
    pub fn arity(&self) -> usize {
        self.type_params.len()
    }

    /// Bind the type parameters to concrete arguments
    pub fn close(&self, type_args: &[ServiceId]) -> TypeMetadata {
        let params = &self.type_params;
        TypeMetadata {
            service_id: self.service_id.substitute(params, type_args),
            type_params: Vec::new(),
            constructors: self
                .constructors
                .iter()
                .map(|ctor| ConstructorInfo {
                    visibility: ctor.visibility,
                    parameters: ctor
                        .parameters
                        .iter()
                        .map(|p| ParameterInfo {
                            name: p.name.clone(),
                            dependency: p.dependency.substitute(params, type_args),
                            default_value: p.default_value.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
