use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Service lifetime tag carried by every registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScope {
    /// Single instance shared across the application
    Singleton,
    /// New instance created for each request
    #[default]
    Transient,
    /// Instance scoped to a particular context (e.g., request scope)
    Scoped,
}

impl ServiceScope {
    /// Check if the scope is singleton
    pub fn is_singleton(&self) -> bool {
        matches!(self, ServiceScope::Singleton)
    }

    /// Check if the scope is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceScope::Transient)
    }

    /// Check if the scope is scoped
    pub fn is_scoped(&self) -> bool {
        matches!(self, ServiceScope::Scoped)
    }

    /// Whether a service with this lifetime may hold a dependency with `dependency` lifetime.
    ///
    /// Singletons outlive every scope, so they must not capture scoped services.
    pub fn can_depend_on(&self, dependency: ServiceScope) -> bool {
        !(self.is_singleton() && dependency.is_scoped())
    }

    /// Get the scope name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceScope::Singleton => "singleton",
            ServiceScope::Transient => "transient",
            ServiceScope::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "singleton" => Ok(ServiceScope::Singleton),
            "transient" => Ok(ServiceScope::Transient),
            "scoped" => Ok(ServiceScope::Scoped),
            _ => Err(ConfigError::invalid_value(
                "lifetime",
                s,
                "singleton, transient, or scoped",
            )),
        }
    }
}
