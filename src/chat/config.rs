//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling where prompts go and where preferences live.

use std::env;
use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_API_URL;

/// Environment variable consulted when no `--api-url` is given.
pub const API_URL_ENV: &str = "STREAMCHAT_API_URL";

/// Command-line arguments for the streamchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Endpoint prompts are posted to.
    #[arrrg(
        optional,
        "Generate endpoint (default: http://localhost:8080/generate)",
        "URL"
    )]
    pub api_url: Option<String>,

    /// File the theme preference is persisted in.
    #[arrrg(optional, "State file for persisted preferences", "PATH")]
    pub state_file: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat client.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The generate endpoint.
    pub api_url: String,

    /// Where durable preferences are stored.
    pub state_path: PathBuf,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - API URL: `$STREAMCHAT_API_URL`, else http://localhost:8080/generate
    /// - State file: `<config dir>/streamchat/state.json`
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            api_url: env::var(API_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            state_path: default_state_path(),
            use_color: true,
        }
    }

    /// Sets the generate endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Sets the state file.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let mut config = ChatConfig::new();
        if let Some(api_url) = args.api_url {
            config = config.with_api_url(api_url);
        }
        if let Some(path) = args.state_file {
            config = config.with_state_path(path);
        }
        if args.no_color {
            config = config.without_color();
        }
        config
    }
}

/// `<config dir>/streamchat/state.json`, or `./streamchat-state.json` when
/// the platform has no config directory.
pub fn default_state_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("streamchat").join("state.json"),
        None => PathBuf::from("streamchat-state.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.use_color);
        assert!(config.state_path.ends_with("state.json"));
        assert!(!config.api_url.is_empty());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            api_url: Some("http://example.com:9000/generate".to_string()),
            state_file: Some("/tmp/prefs.json".to_string()),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.api_url, "http://example.com:9000/generate");
        assert_eq!(config.state_path, PathBuf::from("/tmp/prefs.json"));
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_api_url("https://chat.example.com/generate")
            .with_state_path("state.json")
            .without_color();
        assert_eq!(config.api_url, "https://chat.example.com/generate");
        assert_eq!(config.state_path, PathBuf::from("state.json"));
        assert!(!config.use_color);
    }
}
