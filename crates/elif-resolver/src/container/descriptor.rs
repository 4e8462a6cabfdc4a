use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::container::autowiring::TypeMetadata;
use crate::container::scope::ServiceScope;

/// Service identifier: a type name plus its (possibly empty) type arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<ServiceId>,
}

impl ServiceId {
    /// Create a non-generic service ID
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            type_args: Vec::new(),
        }
    }

    /// Create a closed generic service ID, e.g. `IRepository<User>`
    pub fn generic(type_name: impl Into<String>, type_args: Vec<ServiceId>) -> Self {
        Self {
            type_name: type_name.into(),
            type_args,
        }
    }

    /// Create a service ID from a Rust type's name
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether this ID carries type arguments
    pub fn is_generic(&self) -> bool {
        !self.type_args.is_empty()
    }

    /// The open generic shape this ID is an instance of
    pub fn shape(&self) -> GenericShape {
        GenericShape {
            type_name: self.type_name.clone(),
            arity: self.type_args.len(),
        }
    }

    /// Replace every reference to a named type parameter with its argument.
    ///
    /// A reference is a bare ID (no type arguments) whose name appears in `params`.
    pub fn substitute(&self, params: &[String], args: &[ServiceId]) -> ServiceId {
        if self.type_args.is_empty() {
            if let Some(index) = params.iter().position(|p| *p == self.type_name) {
                if let Some(arg) = args.get(index) {
                    return arg.clone();
                }
            }
            return self.clone();
        }

        ServiceId {
            type_name: self.type_name.clone(),
            type_args: self
                .type_args
                .iter()
                .map(|arg| arg.substitute(params, args))
                .collect(),
        }
    }

    /// Match this ID, read as a pattern over `params`, against a concrete ID.
    ///
    /// Each parameter reference binds to the argument found at the same place in
    /// `concrete`. Fails when the structure differs or one parameter would bind
    /// to two different arguments.
    pub fn bind_params(
        &self,
        params: &[String],
        concrete: &ServiceId,
        bindings: &mut BTreeMap<String, ServiceId>,
    ) -> bool {
        if self.type_args.is_empty() && params.contains(&self.type_name) {
            return match bindings.get(&self.type_name) {
                Some(bound) => bound == concrete,
                None => {
                    bindings.insert(self.type_name.clone(), concrete.clone());
                    true
                }
            };
        }

        self.type_name == concrete.type_name
            && self.type_args.len() == concrete.type_args.len()
            && self
                .type_args
                .iter()
                .zip(&concrete.type_args)
                .all(|(pattern, arg)| pattern.bind_params(params, arg, bindings))
    }

    /// Whether a named type parameter occurs anywhere in this ID
    pub fn references(&self, param: &str) -> bool {
        (self.type_args.is_empty() && self.type_name == param)
            || self.type_args.iter().any(|arg| arg.references(param))
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if !self.type_args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.type_args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl From<&str> for ServiceId {
    fn from(type_name: &str) -> Self {
        ServiceId::new(type_name)
    }
}

impl From<String> for ServiceId {
    fn from(type_name: String) -> Self {
        ServiceId::new(type_name)
    }
}

/// Key for open generic registrations: generic identity plus arity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenericShape {
    pub type_name: String,
    pub arity: usize,
}

impl fmt::Display for GenericShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.type_name, ",".repeat(self.arity.saturating_sub(1)))
    }
}

/// Factory delegate for services registered with a factory.
/// Invoking it belongs to the instantiation layer, not to resolution.
pub type ServiceFactory = Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// How a registration produces its service
#[derive(Clone)]
pub enum Implementation {
    /// Concrete type constructed through one of its constructors
    Type(TypeMetadata),
    /// Pre-built instance shared as-is
    Instance(Arc<dyn Any + Send + Sync>),
    /// Factory delegate invoked by the instantiation layer
    Factory(ServiceFactory),
}

impl Implementation {
    /// Name of the implementation type, when known
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Implementation::Type(metadata) => Some(metadata.service_id.type_name()),
            Implementation::Instance(_) | Implementation::Factory(_) => None,
        }
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Type(metadata) => {
                f.debug_tuple("Type").field(&metadata.service_id).finish()
            }
            Implementation::Instance(_) => f.debug_tuple("Instance").field(&"<instance>").finish(),
            Implementation::Factory(_) => f.debug_tuple("Factory").field(&"<factory_fn>").finish(),
        }
    }
}

/// Immutable registration entry: contract, implementation and lifetime
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Contract this entry satisfies
    pub service_id: ServiceId,
    /// How the service is produced
    pub implementation: Implementation,
    /// Service lifetime tag
    pub lifetime: ServiceScope,
    /// Position in the registration sequence
    pub(crate) order: usize,
}

impl ServiceDescriptor {
    /// Create a descriptor bound to a concrete implementation type
    pub fn for_type(service_id: ServiceId, metadata: TypeMetadata, lifetime: ServiceScope) -> Self {
        Self {
            service_id,
            implementation: Implementation::Type(metadata),
            lifetime,
            order: 0,
        }
    }

    /// Create a descriptor for a fixed instance
    pub fn for_instance<T: Any + Send + Sync>(service_id: ServiceId, instance: T) -> Self {
        Self {
            service_id,
            implementation: Implementation::Instance(Arc::new(instance)),
            lifetime: ServiceScope::Singleton,
            order: 0,
        }
    }

    /// Create a descriptor backed by a factory delegate
    pub fn for_factory<F, T>(service_id: ServiceId, lifetime: ServiceScope, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        let factory: ServiceFactory =
            Arc::new(move || Box::new(factory()) as Box<dyn Any + Send + Sync>);
        Self {
            service_id,
            implementation: Implementation::Factory(factory),
            lifetime,
            order: 0,
        }
    }

    /// Registration order within the registry
    pub fn order(&self) -> usize {
        self.order
    }

    /// Whether the contract is an open generic (its arguments are type parameters)
    pub fn is_open_generic(&self) -> bool {
        matches!(&self.implementation, Implementation::Type(metadata) if metadata.is_open())
    }

    /// Bind the implementation's type parameters from a requested closed contract.
    ///
    /// Arguments come back in `type_params` order, or `None` when the request
    /// does not fit the contract's pattern.
    fn bind_type_args(&self, type_args: &[ServiceId]) -> Option<Vec<ServiceId>> {
        let metadata = match &self.implementation {
            Implementation::Type(metadata) if metadata.is_open() => metadata,
            _ => return None,
        };

        let requested = ServiceId::generic(self.service_id.type_name.clone(), type_args.to_vec());
        let mut bindings = BTreeMap::new();
        if !self
            .service_id
            .bind_params(&metadata.type_params, &requested, &mut bindings)
        {
            return None;
        }

        metadata
            .type_params
            .iter()
            .map(|param| bindings.remove(param))
            .collect()
    }

    /// Whether this open generic registration can serve the given type arguments
    pub fn accepts(&self, type_args: &[ServiceId]) -> bool {
        self.bind_type_args(type_args).is_some()
    }

    /// Close an open generic registration over a requested contract's type arguments.
    ///
    /// Returns `None` when the arguments do not fit the contract, e.g. `IRepository<User>`
    /// against a registration for `IRepository<Vec<T>>`.
    pub fn close(&self, type_args: &[ServiceId]) -> Option<ServiceDescriptor> {
        let bound = self.bind_type_args(type_args)?;
        let implementation = match &self.implementation {
            Implementation::Type(metadata) => Implementation::Type(metadata.close(&bound)),
            other => other.clone(),
        };
        Some(ServiceDescriptor {
            service_id: ServiceId::generic(self.service_id.type_name.clone(), type_args.to_vec()),
            implementation,
            lifetime: self.lifetime,
            order: self.order,
        })
    }
}
