use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::AUTH_TOKEN_NAME;

/// Stores the bearer token the web client keeps in its `token` cookie.
///
/// The file lives at `~/.lingo/token` with 0600 permissions.
#[derive(Debug, Clone)]
pub struct TokenStore {
    file_path: PathBuf,
}

impl TokenStore {
    /// Creates a store at the default path `~/.lingo/token`.
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(Self::in_dir(home_dir.join(".lingo")))
    }

    /// Creates a store inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            file_path: dir.as_ref().join(AUTH_TOKEN_NAME),
        }
    }

    /// Loads the token.
    ///
    /// - `Ok(Some(token))` if the file exists and holds a plausible token
    /// - `Ok(None)` if the file is missing, empty or corrupted
    /// - `Err(_)` if the file cannot be read
    pub fn load(&self) -> Result<Option<String>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path).context("Failed to read token file")?;
        let token = content.trim();

        if token.is_empty() {
            log::warn!("Token file is empty, treating as signed out");
            return Ok(None);
        }

        // JWTs run well past 256 chars, so only guard against absurd sizes
        if token.len() < 8 || token.len() > 4096 {
            log::warn!("Token has invalid length: {}, treating as corrupted", token.len());
            return Ok(None);
        }

        if token.chars().any(|c| c.is_control() || c.is_whitespace()) {
            log::warn!("Token file contains control characters, treating as corrupted");
            return Ok(None);
        }

        log::debug!("Loaded token from {}", self.file_path.display());
        Ok(Some(token.to_string()))
    }

    /// Saves the token with an atomic write and 0600 permissions.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create .lingo directory")?;
        }

        let temp_path = self.file_path.with_extension("tmp");

        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary token file")?;
        file.write_all(token.trim().as_bytes())
            .context("Failed to write token")?;
        file.sync_all().context("Failed to sync token file to disk")?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&temp_path, permissions)
                .context("Failed to set token file permissions")?;
        }

        fs::rename(&temp_path, &self.file_path).context("Failed to rename temporary token file")?;

        log::info!("Saved token to {}", self.file_path.display());
        Ok(())
    }

    /// Deletes the token file; succeeds if it is already gone.
    pub fn delete(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).context("Failed to delete token file")?;
            log::info!("Deleted token file at {}", self.file_path.display());
        } else {
            log::debug!("Token file does not exist, nothing to delete");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::in_dir(temp_dir.path());

        store.save("eyJhbGciOiJIUzI1NiJ9.payload.sig").unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some("eyJhbGciOiJIUzI1NiJ9.payload.sig".to_string())
        );
        assert!(store.path().ends_with("token"));
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::in_dir(temp_dir.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::in_dir(temp_dir.path());

        store.save("token-12345").unwrap();
        store.delete().unwrap();
        assert!(!store.path().exists());
        store.delete().unwrap();
    }

    #[test]
    fn test_whitespace_only_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::in_dir(temp_dir.path());
        fs::write(store.path(), "   \n\t  ").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_corrupted_file_with_control_chars() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::in_dir(temp_dir.path());
        fs::write(store.path(), b"token\x00with\x01control").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::in_dir(temp_dir.path());
        store.save("test-token").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
