use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::container::descriptor::{ServiceFactory, ServiceId};
use crate::container::diagnostics::ConstructorSignature;
use crate::container::scope::ServiceScope;

/// Resolved, not-yet-executed recipe for producing a service.
///
/// Leaves are `Instantiate`, `Factory`, `Instance` and `DefaultValue`; the
/// tree never contains a cycle.
#[derive(Clone)]
pub enum CallSite {
    /// Parameterless construction
    Instantiate { implementation: ServiceId },
    /// Invoke a specific constructor with resolved arguments
    ConstructWith {
        implementation: ServiceId,
        constructor: ConstructorSignature,
        arguments: Vec<CallSite>,
    },
    /// Every registered implementation of a contract, in registration order
    CollectAll {
        service_id: ServiceId,
        members: Vec<CallSite>,
    },
    /// Pass-through to a registered factory delegate
    Factory {
        service_id: ServiceId,
        factory: ServiceFactory,
    },
    /// Pass-through to a registered instance
    Instance {
        service_id: ServiceId,
        instance: Arc<dyn Any + Send + Sync>,
    },
    /// Literal default for a parameter whose contract is not registered
    DefaultValue { value: Value },
    /// Lifetime tag of the registration that produced `inner`
    Lifetime {
        lifetime: ServiceScope,
        service_id: ServiceId,
        inner: Box<CallSite>,
    },
}

impl CallSite {
    pub(crate) fn with_lifetime(self, lifetime: ServiceScope, service_id: ServiceId) -> Self {
        CallSite::Lifetime {
            lifetime,
            service_id,
            inner: Box::new(self),
        }
    }

    /// Lifetime of the outermost wrapper, if any
    pub fn lifetime(&self) -> Option<ServiceScope> {
        match self {
            CallSite::Lifetime { lifetime, .. } => Some(*lifetime),
            _ => None,
        }
    }

    /// Strip the lifetime wrapper, if present
    pub fn unwrap_lifetime(&self) -> &CallSite {
        match self {
            CallSite::Lifetime { inner, .. } => inner,
            other => other,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            CallSite::Instantiate { .. }
                | CallSite::Factory { .. }
                | CallSite::Instance { .. }
                | CallSite::DefaultValue { .. }
        )
    }

    /// Direct children of this node
    pub fn dependencies(&self) -> &[CallSite] {
        match self {
            CallSite::ConstructWith { arguments, .. } => arguments,
            CallSite::CollectAll { members, .. } => members,
            CallSite::Lifetime { inner, .. } => std::slice::from_ref(inner.as_ref()),
            _ => &[],
        }
    }

    /// Implementation type constructed by this node, looking through the lifetime wrapper
    pub fn implementation(&self) -> Option<&ServiceId> {
        match self.unwrap_lifetime() {
            CallSite::Instantiate { implementation }
            | CallSite::ConstructWith { implementation, .. } => Some(implementation),
            _ => None,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            CallSite::Instantiate { implementation } => {
                writeln!(f, "{}new {}()", indent, implementation)?
            }
            CallSite::ConstructWith {
                implementation,
                constructor,
                ..
            } => writeln!(f, "{}new {}{}", indent, implementation, constructor)?,
            CallSite::CollectAll { service_id, members } => {
                writeln!(f, "{}all {} ({} member(s))", indent, service_id, members.len())?
            }
            CallSite::Factory { service_id, .. } => {
                writeln!(f, "{}factory {}", indent, service_id)?
            }
            CallSite::Instance { service_id, .. } => {
                writeln!(f, "{}instance {}", indent, service_id)?
            }
            CallSite::DefaultValue { value } => writeln!(f, "{}default {}", indent, value)?,
            CallSite::Lifetime {
                lifetime,
                service_id,
                ..
            } => writeln!(f, "{}{} {}", indent, lifetime, service_id)?,
        }
        for child in self.dependencies() {
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Instantiate { implementation } => f
                .debug_struct("Instantiate")
                .field("implementation", implementation)
                .finish(),
            CallSite::ConstructWith {
                implementation,
                constructor,
                arguments,
            } => f
                .debug_struct("ConstructWith")
                .field("implementation", implementation)
                .field("constructor", constructor)
                .field("arguments", arguments)
                .finish(),
            CallSite::CollectAll { service_id, members } => f
                .debug_struct("CollectAll")
                .field("service_id", service_id)
                .field("members", members)
                .finish(),
            CallSite::Factory { service_id, .. } => f
                .debug_struct("Factory")
                .field("service_id", service_id)
                .field("factory", &"<factory_fn>")
                .finish(),
            CallSite::Instance { service_id, .. } => f
                .debug_struct("Instance")
                .field("service_id", service_id)
                .field("instance", &"<instance>")
                .finish(),
            CallSite::DefaultValue { value } => {
                f.debug_struct("DefaultValue").field("value", value).finish()
            }
            CallSite::Lifetime {
                lifetime,
                service_id,
                inner,
            } => f
                .debug_struct("Lifetime")
                .field("lifetime", lifetime)
                .field("service_id", service_id)
                .field("inner", inner)
                .finish(),
        }
    }
}
