//! Configuration for module titles and the generation service.
//!
//! Specifically, we try to find a docweave.toml (or the file passed with `--config`), and if
//! present we load settings from there. A missing or malformed file falls back to the built-in
//! defaults, so a run never stops for want of configuration.

use facet::Facet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "docweave.toml";

/// Module titles used when none are configured.
pub const DEFAULT_MODULE_TITLES: [&str; 5] = ["研究背景", "研究目的", "研究内容", "关键技术", "实施方案"];

#[must_use]
/// Owned copy of [`DEFAULT_MODULE_TITLES`].
pub fn default_module_titles() -> Vec<String> {
    DEFAULT_MODULE_TITLES.iter().map(|t| (*t).to_string()).collect()
}

#[derive(Facet, Clone, Debug)]
/// Pipeline settings loaded from docweave.toml or falling back to defaults.
pub struct Config {
    #[facet(default = default_module_titles())]
    /// Ordered level-1 module titles to split documents by.
    pub module_titles: Vec<String>,
    #[facet(default = true)]
    /// Whether to request per-section summaries before restructuring.
    pub summarize: bool,
    #[facet(default = "https://api.deepseek.com".to_string())]
    /// Base URL of the OpenAI-compatible generation endpoint.
    pub api_base_url: String,
    #[facet(default = "deepseek-chat".to_string())]
    /// Model name sent with every request.
    pub model: String,
    #[facet(default = "DOCWEAVE_API_KEY".to_string())]
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[facet(default = 300)]
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_titles: default_module_titles(),
            summarize: true,
            api_base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            api_key_env: "DOCWEAVE_API_KEY".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl Config {
    #[must_use]
    /// Load configuration from `path`, or from docweave.toml when no path is given.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "malformed configuration, using defaults");
                Self::default()
            }),
            Err(_) => {
                info!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
        }
    }

    /// Parse configuration from TOML text; absent fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the text is not a valid configuration.
    pub fn from_toml(contents: &str) -> Result<Self, String> {
        facet_toml::from_str::<Self>(contents).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;
