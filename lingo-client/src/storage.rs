use anyhow::Result;
use std::sync::Mutex;

use crate::session::TokenStore;

/// Where the bearer token lives between runs
pub trait StorageAdapter: Send + Sync {
    fn store_credentials(&self, credentials: &str) -> Result<()>;

    fn load_credentials(&self) -> Result<Option<String>>;

    fn clear_credentials(&self) -> Result<()>;
}

/// File-backed storage for the command-line client
#[derive(Debug, Clone)]
pub struct FileStorageAdapter {
    token_store: TokenStore,
}

impl FileStorageAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            token_store: TokenStore::new()?,
        })
    }

    pub fn with_store(token_store: TokenStore) -> Self {
        Self { token_store }
    }
}

impl StorageAdapter for FileStorageAdapter {
    fn store_credentials(&self, credentials: &str) -> Result<()> {
        self.token_store.save(credentials)
    }

    fn load_credentials(&self) -> Result<Option<String>> {
        self.token_store.load()
    }

    fn clear_credentials(&self) -> Result<()> {
        self.token_store.delete()
    }
}

/// In-memory storage for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStorageAdapter {
    token: Mutex<Option<String>>,
}

impl MemoryStorageAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl StorageAdapter for MemoryStorageAdapter {
    fn store_credentials(&self, credentials: &str) -> Result<()> {
        let mut token = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        *token = Some(credentials.to_string());
        Ok(())
    }

    fn load_credentials(&self) -> Result<Option<String>> {
        let token = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        Ok(token.clone())
    }

    fn clear_credentials(&self) -> Result<()> {
        let mut token = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        *token = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(adapter: &dyn StorageAdapter) {
        adapter.store_credentials("test-session-token").unwrap();
        assert_eq!(
            adapter.load_credentials().unwrap(),
            Some("test-session-token".to_string())
        );
        adapter.clear_credentials().unwrap();
        assert_eq!(adapter.load_credentials().unwrap(), None);
    }

    #[test]
    fn test_file_storage_adapter() {
        let dir = TempDir::new().unwrap();
        exercise(&FileStorageAdapter::with_store(TokenStore::in_dir(dir.path())));
    }

    #[test]
    fn test_memory_storage_adapter() {
        exercise(&MemoryStorageAdapter::new());
        let seeded = MemoryStorageAdapter::with_token("seeded-token");
        assert_eq!(
            seeded.load_credentials().unwrap(),
            Some("seeded-token".to_string())
        );
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_file_storage_returns_what_was_stored(credentials in "[a-zA-Z0-9_.-]{8,256}") {
            let dir = TempDir::new().unwrap();
            let adapter = FileStorageAdapter::with_store(TokenStore::in_dir(dir.path()));
            adapter.store_credentials(&credentials).unwrap();
            prop_assert_eq!(adapter.load_credentials().unwrap(), Some(credentials));
        }
    }
}
