//! Runtime configuration - CLI flags with environment fallbacks
//!
//! `.env` is loaded by the binary before parsing, so every flag can also
//! come from there.

use clap::Args;

pub const DEFAULT_DB_PATH: &str = "totalgains.db";
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite file for the offline log and caches
    #[arg(long = "db", global = true, env = "TOTALGAINS_DB", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Coaching backend base URL
    #[arg(long, global = true, env = "TOTALGAINS_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bearer token for the backend
    #[arg(long, global = true, env = "TOTALGAINS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

impl Config {
    /// Base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_trims_slash() {
        let config = Config {
            api_url: "https://api.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.api_base(), "https://api.example.com");
    }
}
