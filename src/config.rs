//! Runtime configuration for ollama-relay.
//!
//! The upstream base URL comes from the `OLLAMA_URL` environment variable,
//! overridable on the command line. Everything else has fixed defaults.

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default HTTP listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "ollama-relay", about = "HTTP relay for a local Ollama server")]
pub struct Cli {
    /// HTTP listen address.
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// Ollama base URL (overrides the OLLAMA_URL environment variable).
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen address (e.g. "0.0.0.0:8080").
    pub listen: String,

    /// Base URL of the upstream Ollama server.
    pub ollama_url: String,

    /// Total wait bound for the buffered chat path, in seconds.
    /// The streaming path is deliberately unbounded.
    pub chat_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            chat_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Build configuration from CLI arguments and the environment.
    ///
    /// Upstream URL precedence: `--ollama-url`, then `OLLAMA_URL`, then the
    /// default loopback address.
    pub fn from_cli(cli: &Cli) -> Self {
        let ollama_url = cli
            .ollama_url
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Self {
            listen: cli.listen.clone(),
            ollama_url,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(cfg.chat_timeout_secs, 120);
    }

    #[test]
    fn test_cli_url_overrides_default() {
        let cli = Cli {
            listen: DEFAULT_LISTEN.to_string(),
            ollama_url: Some("http://10.0.0.5:11434".to_string()),
            verbose: false,
        };
        let cfg = Config::from_cli(&cli);
        assert_eq!(cfg.ollama_url, "http://10.0.0.5:11434");
    }

    #[test]
    fn test_env_url_used_when_cli_absent() {
        std::env::set_var("OLLAMA_URL", "http://envhost:11434");
        let cli = Cli {
            listen: DEFAULT_LISTEN.to_string(),
            ollama_url: None,
            verbose: false,
        };
        let cfg = Config::from_cli(&cli);
        std::env::remove_var("OLLAMA_URL");
        assert_eq!(cfg.ollama_url, "http://envhost:11434");
    }

    #[test]
    fn test_listen_passed_through() {
        let cli = Cli {
            listen: "127.0.0.1:9999".to_string(),
            ollama_url: None,
            verbose: false,
        };
        let cfg = Config::from_cli(&cli);
        assert_eq!(cfg.listen, "127.0.0.1:9999");
    }
}
