use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// API base used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Client tunables
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Items revealed per "load more"
    pub page_size: usize,
    /// Delay before a window grows, so scroll bursts collapse into one step
    pub load_more_debounce: Duration,
    /// How long transient notifications stay visible
    pub notification_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: 12,
            load_more_debounce: Duration::from_millis(500),
            notification_ttl: Duration::from_secs(4),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Feed preferences stored locally per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPreferences {
    /// "all", "bookmarks", "following" or a category slug
    pub last_tab: String,
    pub page_size: usize,
}

impl Default for FeedPreferences {
    fn default() -> Self {
        Self {
            last_tab: "all".to_string(),
            page_size: ClientConfig::default().page_size,
        }
    }
}

/// Server configuration stored locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub api_url: String,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Configuration manager for the .lingo directory
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a config manager rooted at `~/.lingo`
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Self::with_dir(home_dir.join(".lingo"))
    }

    /// Create a config manager rooted at an explicit directory
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create .lingo directory")?;
        }
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn get_preferences_file(&self, user_id: &str) -> PathBuf {
        // user ids come from the server; keep them from escaping the directory
        let safe: String = user_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.config_dir.join(format!("prefs_{}.json", safe))
    }

    fn get_server_config_file(&self) -> PathBuf {
        self.config_dir.join("server_config.json")
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    pub fn save_preferences(&self, user_id: &str, prefs: &FeedPreferences) -> Result<()> {
        self.write_json(&self.get_preferences_file(user_id), prefs)
    }

    pub fn load_preferences(&self, user_id: &str) -> Result<Option<FeedPreferences>> {
        self.read_json(&self.get_preferences_file(user_id))
    }

    pub fn save_server_config(&self, config: &ServerConfig) -> Result<()> {
        self.write_json(&self.get_server_config_file(), config)
    }

    pub fn load_server_config(&self) -> Result<Option<ServerConfig>> {
        self.read_json(&self.get_server_config_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_preferences_round_trip() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(dir.path().join("lingo")).unwrap();

        assert_eq!(manager.load_preferences("u1").unwrap(), None);

        let prefs = FeedPreferences {
            last_tab: "question".to_string(),
            page_size: 24,
        };
        manager.save_preferences("u1", &prefs).unwrap();
        assert_eq!(manager.load_preferences("u1").unwrap(), Some(prefs));
    }

    #[test]
    fn test_preferences_file_name_is_sanitized() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(dir.path()).unwrap();
        let path = manager.get_preferences_file("../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[test]
    fn test_corrupted_server_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(dir.path()).unwrap();
        fs::write(dir.path().join("server_config.json"), "{not json").unwrap();
        assert!(manager.load_server_config().is_err());
    }
}
