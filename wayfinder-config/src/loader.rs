//! Site configuration loading (spec.md §4.C1's loading half; the data
//! model and `validate()` invariants live in `wayfinder_core::model::site`).
//!
//! Adapted from `r2e-core::config::{loader, mod}`'s profile-layered YAML
//! loading, but deliberately narrower: the teacher flattens every file into
//! a dot-keyed `HashMap<String, ConfigValue>` so arbitrary untyped config
//! can be looked up by key at runtime. `SiteConfiguration` is one closed,
//! fully-typed struct known at compile time, so this crate skips the
//! flatten-to-registry step entirely and deserializes straight into it with
//! `serde_yaml` — see DESIGN.md for the reasoning.

use crate::error::ConfigError;
use crate::secrets::{resolve_placeholders, DefaultSecretResolver, SecretResolver};
use std::path::Path;
use wayfinder_core::SiteConfiguration;

/// Env var naming the active profile, mirroring `r2e-core`'s
/// `APP_PROFILE` / `R2E_PROFILE` convention.
pub const PROFILE_ENV_VAR: &str = "WAYFINDER_PROFILE";

/// Load a `SiteConfiguration` from `base_path`, optionally layering a
/// profile-specific sibling file on top (`site.yaml` + `site-{profile}.yaml`,
/// profile read from `WAYFINDER_PROFILE`), then substituting `${...}`
/// placeholders and validating the result.
pub fn load(base_path: &Path) -> Result<SiteConfiguration, ConfigError> {
    let profile = std::env::var(PROFILE_ENV_VAR).ok();
    load_with(base_path, profile.as_deref(), &DefaultSecretResolver)
}

/// Same as [`load`] but with an explicit profile and resolver, for tests
/// and for callers that don't want process-environment coupling.
pub fn load_with(
    base_path: &Path,
    profile: Option<&str>,
    resolver: &dyn SecretResolver,
) -> Result<SiteConfiguration, ConfigError> {
    let base_text = std::fs::read_to_string(base_path)
        .map_err(|e| ConfigError::Load(format!("reading '{}': {e}", base_path.display())))?;
    let mut merged: serde_yaml::Value =
        serde_yaml::from_str(&base_text).map_err(|e| ConfigError::Load(format!("parsing '{}': {e}", base_path.display())))?;

    if let Some(profile) = profile {
        if let Some(overlay_path) = profile_sibling(base_path, profile) {
            if overlay_path.exists() {
                let overlay_text = std::fs::read_to_string(&overlay_path)
                    .map_err(|e| ConfigError::Load(format!("reading '{}': {e}", overlay_path.display())))?;
                let overlay: serde_yaml::Value = serde_yaml::from_str(&overlay_text)
                    .map_err(|e| ConfigError::Load(format!("parsing '{}': {e}", overlay_path.display())))?;
                merged = merge_yaml(merged, overlay);
            }
        }
    }

    let merged_text =
        serde_yaml::to_string(&merged).map_err(|e| ConfigError::Load(format!("re-serializing merged config: {e}")))?;
    let resolved_text = resolve_placeholders(&merged_text, resolver)?;

    let config: SiteConfiguration =
        serde_yaml::from_str(&resolved_text).map_err(|e| ConfigError::Load(format!("decoding site configuration: {e}")))?;
    config.validate()?;
    tracing::info!(domain = %config.domain, patterns = config.route_patterns.len(), "loaded site configuration");
    Ok(config)
}

/// Deserialize a `SiteConfiguration` directly from a YAML string, applying
/// placeholder substitution and validation. Exposed for callers (and
/// tests) that already have the text in hand rather than a file path.
pub fn from_str(text: &str, resolver: &dyn SecretResolver) -> Result<SiteConfiguration, ConfigError> {
    let resolved = resolve_placeholders(text, resolver)?;
    let config: SiteConfiguration =
        serde_yaml::from_str(&resolved).map_err(|e| ConfigError::Load(format!("decoding site configuration: {e}")))?;
    config.validate()?;
    Ok(config)
}

fn profile_sibling(base_path: &Path, profile: &str) -> Option<std::path::PathBuf> {
    let stem = base_path.file_stem()?.to_str()?;
    let ext = base_path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
    Some(base_path.with_file_name(format!("{stem}-{profile}.{ext}")))
}

/// Shallow-recursive merge: mapping keys in `overlay` take precedence over
/// `base`, nested mappings merge key-by-key, any other value type in
/// `overlay` replaces `base` wholesale.
fn merge_yaml(base: serde_yaml::Value, overlay: serde_yaml::Value) -> serde_yaml::Value {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(mut base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => merge_yaml(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            serde_yaml::Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}
