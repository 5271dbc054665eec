use serde::{Deserialize, Serialize};

pub const MIB: u64 = 1024 * 1024;

pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_MSWORD: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_storage_directory")]
    pub storage_directory: String,
    /// Falls back to `~/.docvault/data/docvault.db` when unset.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            storage_directory: default_storage_directory(),
            database_path: None,
            upload: UploadConfig::default(),
            generation: GenerationConfig::default(),
            ai: AiConfig::default(),
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_storage_directory() -> String {
    "./uploads".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

fn default_max_file_size() -> u64 {
    10 * MIB
}

fn default_allowed_mime_types() -> Vec<String> {
    [MIME_TEXT_PLAIN, MIME_PDF, MIME_MSWORD, MIME_DOCX]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

/// Cost bounds applied to every generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default = "default_summary_char_limit")]
    pub summary_char_limit: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

fn default_summary_char_limit() -> usize {
    150_000
}

fn default_chunk_size() -> usize {
    80_000
}

fn default_max_chunks() -> usize {
    20
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            summary_char_limit: default_summary_char_limit(),
            chunk_size: default_chunk_size(),
            max_chunks: default_max_chunks(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    #[serde(alias = "anthropic")]
    Claude,
    #[serde(rename = "openai")]
    OpenAi,
}

impl AiProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Claude => "claude-3-5-sonnet-20241022",
            AiProvider::OpenAi => "gpt-4o",
        }
    }

    pub fn default_api_key_env_var(&self) -> &'static str {
        match self {
            AiProvider::Claude => "ANTHROPIC_API_KEY",
            AiProvider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            AiProvider::Claude => "https://api.anthropic.com",
            AiProvider::OpenAi => "https://api.openai.com",
        }
    }
}

impl std::str::FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(AiProvider::Claude),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(format!(
                "Unsupported AI provider: {}. Supported providers are: openai, claude",
                other
            )),
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiProvider::Claude => write!(f, "claude"),
            AiProvider::OpenAi => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default)]
    pub provider: AiProvider,
    #[serde(default)]
    pub model: Option<String>,
    /// Inline key. Prefer `api_key_file` or `api_key_env_var` outside local testing.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default)]
    pub api_key_env_var: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl AiConfig {
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn resolved_api_key_env_var(&self) -> String {
        self.api_key_env_var
            .clone()
            .unwrap_or_else(|| self.provider.default_api_key_env_var().to_string())
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            model: None,
            api_key: None,
            api_key_file: None,
            api_key_env_var: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// What happens to pipeline runs that are still in flight at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Start every queued run and wait for all of them to finish.
    #[default]
    Drain,
    /// Abort in-flight runs; their records stay PROCESSING.
    Abandon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    #[serde(default)]
    pub shutdown_policy: ShutdownPolicy,
}

fn default_max_concurrent_runs() -> usize {
    num_cpus::get()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: default_max_concurrent_runs(),
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
