use std::fmt;

/// Config-loading failures. Distinct from `wayfinder_core::ConfigurationError`,
/// which covers invariant violations in an already-parsed
/// `SiteConfiguration` — this enum covers everything upstream of that:
/// missing files, bad YAML, and unresolved placeholders.
#[derive(Debug)]
pub enum ConfigError {
    Load(String),
    NotFound(String),
    Site(wayfinder_core::ConfigurationError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "failed to load configuration: {msg}"),
            ConfigError::NotFound(reference) => write!(f, "unresolved placeholder reference '{reference}'"),
            ConfigError::Site(err) => write!(f, "invalid site configuration: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Site(err) => Some(err),
            _ => None,
        }
    }
}

impl From<wayfinder_core::ConfigurationError> for ConfigError {
    fn from(err: wayfinder_core::ConfigurationError) -> Self {
        ConfigError::Site(err)
    }
}
