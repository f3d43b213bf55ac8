//! Configuration loading for Wayfinder: YAML `SiteConfiguration` with
//! `${VAR}` / `${VAR:-default}` placeholder substitution and
//! profile-layered overlays, validated before the service can start.

pub mod error;
pub mod loader;
pub mod secrets;

pub use error::ConfigError;
pub use loader::{from_str, load, load_with, PROFILE_ENV_VAR};
pub use secrets::{resolve_placeholders, DefaultSecretResolver, SecretResolver};
