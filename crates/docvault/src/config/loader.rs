use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies the environment variables the service has always honoured on top
/// of a loaded config, then re-validates.
pub fn apply_env_overrides(mut config: Config) -> Result<Config, ConfigError> {
    if let Some(provider) = env_var("AI_PROVIDER") {
        config.ai.provider = provider
            .parse()
            .map_err(|message| ConfigError::Validation { message })?;
    }

    let model_var = match config.ai.provider {
        crate::config::AiProvider::Claude => "ANTHROPIC_MODEL",
        crate::config::AiProvider::OpenAi => "OPENAI_MODEL",
    };
    if let Some(model) = env_var(model_var) {
        config.ai.model = Some(model);
    }

    if let Some(dir) = env_var("UPLOAD_DIR") {
        config.storage_directory = dir;
    }

    if let Some(path) = env_var("DOCVAULT_DATABASE_PATH") {
        config.database_path = Some(path);
    }

    if let Some(level) = env_var("DOCVAULT_LOG") {
        config.logging.level = level;
    }

    validate_config(&config)?;
    Ok(config)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.storage_directory.trim().is_empty() {
        return Err(invalid("storageDirectory must not be empty"));
    }

    if config.upload.max_file_size == 0 {
        return Err(invalid("upload.maxFileSize must be greater than 0"));
    }

    if config.upload.allowed_mime_types.is_empty() {
        return Err(invalid("upload.allowedMimeTypes must not be empty"));
    }

    let generation = &config.generation;
    if generation.summary_char_limit == 0 {
        return Err(invalid("generation.summaryCharLimit must be greater than 0"));
    }
    if generation.chunk_size == 0 {
        return Err(invalid("generation.chunkSize must be greater than 0"));
    }
    if generation.max_chunks == 0 {
        return Err(invalid("generation.maxChunks must be greater than 0"));
    }

    if !(0.0..=2.0).contains(&config.ai.temperature) {
        return Err(invalid(format!(
            "ai.temperature must be between 0 and 2, got {}",
            config.ai.temperature
        )));
    }
    if config.ai.max_tokens == 0 {
        return Err(invalid("ai.maxTokens must be greater than 0"));
    }
    if config.ai.request_timeout_secs == 0 {
        return Err(invalid("ai.requestTimeoutSecs must be greater than 0"));
    }

    if config.worker.max_concurrent_runs == 0 {
        return Err(invalid("worker.maxConcurrentRuns must be greater than 0"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
