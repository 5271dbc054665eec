//! API key resolution for generation backends.
//!
//! A key can come from three places, checked in this order:
//!
//! 1. **Inline value** (`ai.apiKey`), handy for local testing
//! 2. **File** (`ai.apiKeyFile`), e.g. a mounted Docker secret
//! 3. **Environment variable** (`ai.apiKeyEnvVar`, defaulting to the
//!    provider's conventional variable such as `ANTHROPIC_API_KEY`)

use secrecy::SecretString;
use std::fs;

use crate::config::AiConfig;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Secret from {origin} is empty")]
    Empty { origin: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves the API key for the configured provider.
pub fn resolve_api_key(ai: &AiConfig) -> Result<SecretString> {
    let env_var = ai.resolved_api_key_env_var();
    resolve_secret(
        ai.api_key.as_deref(),
        ai.api_key_file.as_deref(),
        Some(env_var.as_str()),
    )
}

/// Resolves a secret from the first non-empty source. Values read from files
/// and environment variables are trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
            path: expanded.clone(),
            source: e,
        })?;
        return non_empty(content.trim(), format!("file '{}'", expanded));
    }

    if let Some(var_name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(var_name) {
            Ok(value) => non_empty(value.trim(), format!("env var '{}'", var_name)),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

fn non_empty(value: &str, origin: String) -> Result<SecretString> {
    if value.is_empty() {
        return Err(SecretError::Empty { origin });
    }
    Ok(SecretString::from(value.to_string()))
}

/// Expands a leading `~` to the user's home directory.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_direct_value_takes_priority() {
        let secret = resolve_secret(Some("inline"), Some("/nonexistent"), Some("NOPE")).unwrap();
        assert_eq!(secret.expose_secret(), "inline");
    }

    #[test]
    fn test_file_takes_priority_over_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-file  ").unwrap();

        let secret = resolve_secret(
            None,
            Some(file.path().to_str().unwrap()),
            Some("DOCVAULT_TEST_UNUSED"),
        )
        .unwrap();
        assert_eq!(secret.expose_secret(), "from-file");
    }

    #[test]
    fn test_file_not_found_error() {
        let err = resolve_secret(None, Some("/nonexistent/key"), None).unwrap_err();
        assert!(matches!(err, SecretError::FileReadError { .. }));
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = resolve_secret(None, Some(file.path().to_str().unwrap()), None).unwrap_err();
        assert!(matches!(err, SecretError::Empty { .. }));
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("DOCVAULT_TEST_KEY", " sk-test\n");
        let secret = resolve_secret(None, None, Some("DOCVAULT_TEST_KEY")).unwrap();
        std::env::remove_var("DOCVAULT_TEST_KEY");
        assert_eq!(secret.expose_secret(), "sk-test");
    }

    #[test]
    #[serial]
    fn test_env_var_not_set_error() {
        std::env::remove_var("DOCVAULT_TEST_MISSING");
        let err = resolve_secret(None, None, Some("DOCVAULT_TEST_MISSING")).unwrap_err();
        assert!(matches!(err, SecretError::EnvVarNotSet { name } if name == "DOCVAULT_TEST_MISSING"));
    }

    #[test]
    fn test_no_source_error() {
        let err = resolve_secret(Some(""), None, Some("")).unwrap_err();
        assert!(matches!(err, SecretError::NoSourceProvided));
    }

    #[test]
    #[serial]
    fn test_resolve_api_key_uses_provider_default_env_var() {
        std::env::set_var("OPENAI_API_KEY", "sk-openai");
        let ai = AiConfig {
            provider: crate::config::AiProvider::OpenAi,
            ..Default::default()
        };
        let secret = resolve_api_key(&ai);
        std::env::remove_var("OPENAI_API_KEY");
        assert_eq!(secret.unwrap().expose_secret(), "sk-openai");
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home("~/keys/anthropic");
        if let Some(home) = dirs::home_dir() {
            assert!(expanded.starts_with(&*home.to_string_lossy()));
            assert!(expanded.ends_with("keys/anthropic"));
        }
        assert_eq!(expand_home("/abs/path"), "/abs/path");
    }
}
