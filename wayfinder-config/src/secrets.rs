//! `${...}` placeholder resolution, adapted from `r2e-core::config::secrets`.
//!
//! Extends the teacher's reference grammar with a `${VAR:-default}` form —
//! SPEC_FULL.md's configuration section needs a fallback value for optional
//! deployment knobs (the teacher's `R2eConfig` never needed one, since its
//! flattened registry already has its own default-value machinery at the
//! lookup site rather than the placeholder site).

use crate::error::ConfigError;

/// Backend for resolving one `${...}` reference. Kept as a trait, not a
/// bare function, so tests can substitute a fixed-map resolver instead of
/// touching the process environment.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError>;
}

/// Env vars and file references:
/// - `${VAR_NAME}` — resolves from environment variable
/// - `${env:VAR_NAME}` — explicit env var resolution
/// - `${file:/path/to/secret}` — reads from file (trimmed)
/// - `${VAR_NAME:-default}` — any of the above, falling back to `default`
///   if the underlying reference can't be resolved
pub struct DefaultSecretResolver;

impl DefaultSecretResolver {
    fn resolve_reference(&self, reference: &str) -> Result<String, ConfigError> {
        if let Some(path) = reference.strip_prefix("file:") {
            std::fs::read_to_string(path.trim())
                .map(|s| s.trim().to_string())
                .map_err(|e| ConfigError::Load(format!("secret file '{}': {e}", path.trim())))
        } else if let Some(var) = reference.strip_prefix("env:") {
            std::env::var(var.trim()).map_err(|_| ConfigError::NotFound(format!("env:{}", var.trim())))
        } else {
            std::env::var(reference.trim()).map_err(|_| ConfigError::NotFound(reference.trim().to_string()))
        }
    }
}

impl SecretResolver for DefaultSecretResolver {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
        if let Some((var_part, default)) = reference.split_once(":-") {
            return Ok(self.resolve_reference(var_part).unwrap_or_else(|_| default.to_string()));
        }
        self.resolve_reference(reference)
    }
}

/// Resolve every `${...}` placeholder in `value`.
pub fn resolve_placeholders(value: &str, resolver: &dyn SecretResolver) -> Result<String, ConfigError> {
    let mut result = value.to_string();
    while let Some(start) = result.find("${") {
        let end = result[start..]
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("unclosed placeholder in: {value}")))?;
        let reference = &result[start + 2..start + end];
        let resolved = resolver.resolve(reference)?;
        result = format!("{}{}{}", &result[..start], resolved, &result[start + end + 1..]);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_reference_resolves_from_env() {
        std::env::set_var("WAYFINDER_TEST_BARE", "bare-value");
        let resolved = resolve_placeholders("${WAYFINDER_TEST_BARE}", &DefaultSecretResolver).unwrap();
        assert_eq!(resolved, "bare-value");
        std::env::remove_var("WAYFINDER_TEST_BARE");
    }

    #[test]
    fn env_prefixed_reference_resolves_from_env() {
        std::env::set_var("WAYFINDER_TEST_ENV", "env-value");
        let resolved = resolve_placeholders("${env:WAYFINDER_TEST_ENV}", &DefaultSecretResolver).unwrap();
        assert_eq!(resolved, "env-value");
        std::env::remove_var("WAYFINDER_TEST_ENV");
    }

    #[test]
    fn missing_reference_without_default_is_an_error() {
        std::env::remove_var("WAYFINDER_TEST_MISSING");
        let err = resolve_placeholders("${WAYFINDER_TEST_MISSING}", &DefaultSecretResolver).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn missing_reference_falls_back_to_inline_default() {
        std::env::remove_var("WAYFINDER_TEST_MISSING_WITH_DEFAULT");
        let resolved =
            resolve_placeholders("${WAYFINDER_TEST_MISSING_WITH_DEFAULT:-fallback}", &DefaultSecretResolver).unwrap();
        assert_eq!(resolved, "fallback");
    }

    #[test]
    fn present_reference_wins_over_inline_default() {
        std::env::set_var("WAYFINDER_TEST_PRESENT", "actual");
        let resolved = resolve_placeholders("${WAYFINDER_TEST_PRESENT:-fallback}", &DefaultSecretResolver).unwrap();
        assert_eq!(resolved, "actual");
        std::env::remove_var("WAYFINDER_TEST_PRESENT");
    }

    #[test]
    fn multiple_placeholders_in_one_value_all_resolve() {
        std::env::set_var("WAYFINDER_TEST_A", "a");
        std::env::set_var("WAYFINDER_TEST_B", "b");
        let resolved = resolve_placeholders("${WAYFINDER_TEST_A}-${WAYFINDER_TEST_B}", &DefaultSecretResolver).unwrap();
        assert_eq!(resolved, "a-b");
        std::env::remove_var("WAYFINDER_TEST_A");
        std::env::remove_var("WAYFINDER_TEST_B");
    }

    #[test]
    fn unclosed_placeholder_is_a_load_error() {
        let err = resolve_placeholders("${UNCLOSED", &DefaultSecretResolver).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
