use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{parse_flag, ConfigError};
use crate::container::scope::ServiceScope;

pub const ENV_DEFAULT_LIFETIME: &str = "ELIF_RESOLVER_DEFAULT_LIFETIME";
pub const ENV_VALIDATE_ON_BUILD: &str = "ELIF_RESOLVER_VALIDATE_ON_BUILD";
pub const ENV_VALIDATE_LIFETIMES: &str = "ELIF_RESOLVER_VALIDATE_LIFETIMES";

/// Resolver settings whose origin is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Setting {
    DefaultLifetime,
    ValidateOnBuild,
    ValidateLifetimes,
}

impl Setting {
    pub const ALL: [Setting; 3] = [
        Setting::DefaultLifetime,
        Setting::ValidateOnBuild,
        Setting::ValidateLifetimes,
    ];

    /// Field name in YAML documents
    pub fn key(self) -> &'static str {
        match self {
            Setting::DefaultLifetime => "default_lifetime",
            Setting::ValidateOnBuild => "validate_on_build",
            Setting::ValidateLifetimes => "validate_lifetimes",
        }
    }

    /// Environment variable overriding the setting
    pub fn env_var(self) -> &'static str {
        match self {
            Setting::DefaultLifetime => ENV_DEFAULT_LIFETIME,
            Setting::ValidateOnBuild => ENV_VALIDATE_ON_BUILD,
            Setting::ValidateLifetimes => ENV_VALIDATE_LIFETIMES,
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where a setting's value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// Set in code through the `with_*` methods or a preset
    Programmatic,
    /// Read from the named environment variable
    EnvVar(&'static str),
    /// Present in an inline YAML document
    Yaml,
    /// Present in a YAML file
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Programmatic => write!(f, "set in code"),
            ConfigSource::EnvVar(var) => write!(f, "environment variable {}", var),
            ConfigSource::Yaml => write!(f, "inline YAML"),
            ConfigSource::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// Configuration loading for resolver settings
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Origin of every setting, for debugging
    fn config_sources(&self) -> BTreeMap<Setting, ConfigSource>;
}

/// Resolver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Lifetime applied by `bind` when none is given
    pub default_lifetime: ServiceScope,
    /// Resolve every registration when the registry is built
    pub validate_on_build: bool,
    /// Reject plans in which a singleton captures a scoped service
    pub validate_lifetimes: bool,
    #[serde(skip)]
    sources: BTreeMap<Setting, ConfigSource>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_lifetime: ServiceScope::Transient,
            validate_on_build: false,
            validate_lifetimes: false,
            sources: BTreeMap::new(),
        }
    }
}

impl ResolverConfig {
    /// Strict settings: validate the registry at build time and check lifetimes
    pub fn strict() -> Self {
        Self::default()
            .with_validate_on_build(true)
            .with_validate_lifetimes(true)
    }

    /// Set the lifetime applied by `bind`
    pub fn with_default_lifetime(mut self, lifetime: ServiceScope) -> Self {
        self.default_lifetime = lifetime;
        self.sources.insert(Setting::DefaultLifetime, ConfigSource::Programmatic);
        self
    }

    pub fn with_validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self.sources.insert(Setting::ValidateOnBuild, ConfigSource::Programmatic);
        self
    }

    pub fn with_validate_lifetimes(mut self, enabled: bool) -> Self {
        self.validate_lifetimes = enabled;
        self.sources.insert(Setting::ValidateLifetimes, ConfigSource::Programmatic);
        self
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_document(yaml, ConfigSource::Yaml)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_document(&contents, ConfigSource::File(path.to_path_buf()))
    }

    /// Settings present in the document take `origin`; the rest stay defaults
    fn from_yaml_document(yaml: &str, origin: ConfigSource) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let mut config: Self = if document.is_null() {
            Self::default()
        } else {
            serde_yaml::from_value(document.clone())?
        };

        for setting in Setting::ALL {
            if document.get(setting.key()).is_some() {
                config.sources.insert(setting, origin.clone());
            }
        }
        tracing::debug!("Loaded resolver configuration from {}: {:?}", origin, config);
        Ok(config)
    }

    fn read_env(setting: Setting) -> Result<Option<String>, ConfigError> {
        match env::var(setting.env_var()) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::environment_error(format!(
                "{} is not valid unicode",
                setting.env_var()
            ))),
        }
    }
}

impl ConfigLoader for ResolverConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for setting in Setting::ALL {
            let Some(value) = Self::read_env(setting)? else {
                continue;
            };
            match setting {
                Setting::DefaultLifetime => config.default_lifetime = value.parse()?,
                Setting::ValidateOnBuild => {
                    config.validate_on_build = parse_flag(setting.key(), &value)?
                }
                Setting::ValidateLifetimes => {
                    config.validate_lifetimes = parse_flag(setting.key(), &value)?
                }
            }
            config.sources.insert(setting, ConfigSource::EnvVar(setting.env_var()));
        }

        tracing::debug!("Loaded resolver configuration from environment: {:?}", config);
        Ok(config)
    }

    fn config_sources(&self) -> BTreeMap<Setting, ConfigSource> {
        Setting::ALL
            .into_iter()
            .map(|setting| {
                let source = self
                    .sources
                    .get(&setting)
                    .cloned()
                    .unwrap_or(ConfigSource::Default);
                (setting, source)
            })
            .collect()
    }
}
