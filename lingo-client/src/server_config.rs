use crate::config::{ConfigManager, ServerConfig, DEFAULT_API_URL};
use anyhow::Result;

/// Environment variables consulted for the API base, highest priority first.
/// `NEXT_PUBLIC_API_URL` is what the web deployment already sets.
pub const API_URL_ENV_VARS: [&str; 2] = ["LINGO_API_URL", "NEXT_PUBLIC_API_URL"];

/// Server configuration utility for managing the API base URL
pub struct ServerConfigManager {
    config_manager: ConfigManager,
}

impl ServerConfigManager {
    pub fn new(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Determine the API URL to use based on priority:
    /// 1. CLI argument (highest priority)
    /// 2. `LINGO_API_URL`, then `NEXT_PUBLIC_API_URL`
    /// 3. Saved configuration file
    /// 4. Default (lowest priority)
    pub fn determine_api_url(&self, cli_override: Option<String>) -> Result<String> {
        self.determine_api_url_with(cli_override, |key| std::env::var(key).ok())
    }

    fn determine_api_url_with<F>(&self, cli_override: Option<String>, env: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = cli_override.filter(|u| !u.trim().is_empty()) {
            return Ok(url);
        }

        for key in API_URL_ENV_VARS {
            if let Some(url) = env(key).filter(|u| !u.trim().is_empty()) {
                return Ok(url);
            }
        }

        if let Some(config) = self.config_manager.load_server_config()? {
            return Ok(config.api_url);
        }

        Ok(DEFAULT_API_URL.to_string())
    }

    /// Save API URL to configuration file
    pub fn save_api_url(&self, api_url: String) -> Result<()> {
        let config = ServerConfig {
            api_url,
            last_updated: chrono::Utc::now(),
        };
        self.config_manager.save_server_config(&config)
    }

    /// Get a display-friendly description of the API in use
    pub fn describe(&self, current_url: &str) -> &'static str {
        if current_url == DEFAULT_API_URL {
            "Local Development Server (default)"
        } else if current_url.contains("localhost") || current_url.contains("127.0.0.1") {
            "Local Development Server"
        } else {
            "Custom Server"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> ServerConfigManager {
        ServerConfigManager::new(ConfigManager::with_dir(dir.path()).unwrap())
    }

    #[test]
    fn test_cli_override_priority() {
        let dir = TempDir::new().unwrap();
        let env: HashMap<&str, &str> = [("LINGO_API_URL", "http://env:1")].into();
        let url = manager(&dir)
            .determine_api_url_with(Some("http://cli:1".to_string()), |k| {
                env.get(k).map(|v| v.to_string())
            })
            .unwrap();
        assert_eq!(url, "http://cli:1");
    }

    #[test]
    fn test_env_priority_order() {
        let dir = TempDir::new().unwrap();
        let env: HashMap<&str, &str> = [
            ("LINGO_API_URL", "http://lingo:1"),
            ("NEXT_PUBLIC_API_URL", "http://next:1"),
        ]
        .into();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());
        assert_eq!(
            manager(&dir).determine_api_url_with(None, lookup).unwrap(),
            "http://lingo:1"
        );

        let env: HashMap<&str, &str> = [("NEXT_PUBLIC_API_URL", "http://next:1")].into();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());
        assert_eq!(
            manager(&dir).determine_api_url_with(None, lookup).unwrap(),
            "http://next:1"
        );
    }

    #[test]
    fn test_saved_config_then_default() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let no_env = |_: &str| None;

        assert_eq!(
            manager.determine_api_url_with(None, no_env).unwrap(),
            DEFAULT_API_URL
        );

        manager.save_api_url("https://api.example.org".to_string()).unwrap();
        assert_eq!(
            manager.determine_api_url_with(None, no_env).unwrap(),
            "https://api.example.org"
        );
    }

    #[test]
    fn test_describe() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert_eq!(
            manager.describe(DEFAULT_API_URL),
            "Local Development Server (default)"
        );
        assert_eq!(manager.describe("http://127.0.0.1:8080"), "Local Development Server");
        assert_eq!(manager.describe("https://custom.example.com"), "Custom Server");
    }
}
