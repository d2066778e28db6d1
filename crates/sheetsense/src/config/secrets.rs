//! Credential resolution from multiple sources.
//!
//! Sources are tried in priority order, supporting local testing (direct
//! value), Docker secrets (file reference) and production deployments
//! (environment variable).

use crate::error::ConfigError;

/// Resolves a credential from the first usable source:
/// 1. Direct value (if provided and non-empty)
/// 2. File contents (if a path is provided)
/// 3. Environment variable (if a name is provided)
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<String, ConfigError> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }

    if let Some(path) = file_path {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Credential {
            message: format!("failed to read secret file '{}': {}", path, e),
        })?;
        let trimmed = contents.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    if let Some(name) = env_var {
        return match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(ConfigError::Credential {
                message: format!("environment variable '{}' not set", name),
            }),
        };
    }

    Err(ConfigError::Credential {
        message: "no credential source provided (need one of: value, file, env var)".to_string(),
    })
}
