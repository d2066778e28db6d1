use serde::{Deserialize, Serialize};

use crate::config::secrets::resolve_secret;
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub watch_directory: String,
    /// Name of the subfolder (inside the watch directory) holding exported
    /// results. Events under it refresh viewers instead of mutating the
    /// descriptor set.
    #[serde(default = "default_results_subdirectory")]
    pub results_subdirectory: String,
    /// Store file location. Falls back to `~/.sheetsense/data/sheetsense.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub raster: RasterConfig,
    pub codegen: CodegenConfig,
}

fn default_results_subdirectory() -> String {
    "results".to_string()
}

fn default_scan_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Credential sources in priority order: direct value, file, env var.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "o4-mini".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl CompletionConfig {
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        resolve_secret(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Upper bound on rendered pages per document.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_max_pages() -> usize {
    5
}

fn default_dpi() -> u32 {
    150
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Path to the external code-generation executable.
    pub tool_path: String,
    #[serde(default = "default_codegen_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_codegen_timeout_secs() -> u64 {
    120
}
