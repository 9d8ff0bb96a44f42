use lingo_types::User;

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::storage::StorageAdapter;

/// Outcome of checking for a signed-in user
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    Authenticated(User),
    /// No usable token; the caller should send the user to sign in
    AuthRequired,
}

/// Resolves the stored token into a signed-in user.
///
/// Sign-in itself happens on the web; this side only carries the token.
pub struct AuthGate<'a> {
    storage: &'a dyn StorageAdapter,
}

impl<'a> AuthGate<'a> {
    pub fn new(storage: &'a dyn StorageAdapter) -> Self {
        Self { storage }
    }

    /// Loads the token into `client` and fetches `/users/me`.
    ///
    /// - no token: `AuthRequired` without touching the network
    /// - token rejected (401): token cleared, `AuthRequired`
    /// - any other failure is returned for a page-level error
    pub async fn resolve(&self, client: &mut ApiClient) -> ApiResult<AuthStatus> {
        let token = match self.storage.load_credentials() {
            Ok(Some(token)) => token,
            Ok(None) => {
                log::debug!("No stored token");
                return Ok(AuthStatus::AuthRequired);
            }
            Err(e) => {
                log::warn!("Failed to read stored token: {}", e);
                return Ok(AuthStatus::AuthRequired);
            }
        };

        client.set_token(Some(token));

        match client.get_me().await {
            Ok(user) => {
                log::info!("Signed in as {} ({})", user.name, user.id);
                client.set_viewer_id(Some(user.id.clone()));
                Ok(AuthStatus::Authenticated(user))
            }
            Err(ApiError::Unauthorized(msg)) => {
                log::warn!("Stored token rejected: {}", msg);
                self.sign_out(client);
                Ok(AuthStatus::AuthRequired)
            }
            Err(e) => Err(e),
        }
    }

    pub fn sign_in(&self, client: &mut ApiClient, token: &str) -> anyhow::Result<()> {
        self.storage.store_credentials(token)?;
        client.set_token(Some(token.trim().to_string()));
        Ok(())
    }

    pub fn sign_out(&self, client: &mut ApiClient) {
        if let Err(e) = self.storage.clear_credentials() {
            log::warn!("Failed to clear stored token: {}", e);
        }
        client.set_token(None);
        client.set_viewer_id(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageAdapter;

    #[tokio::test]
    async fn test_no_token_requires_auth() {
        let storage = MemoryStorageAdapter::new();
        let gate = AuthGate::new(&storage);
        // Unroutable base: resolving must not reach the network
        let mut client = ApiClient::new("http://127.0.0.1:9/api");
        assert_eq!(gate.resolve(&mut client).await.unwrap(), AuthStatus::AuthRequired);
        assert!(!client.has_token());
    }

    #[test]
    fn test_sign_in_and_out() {
        let storage = MemoryStorageAdapter::new();
        let gate = AuthGate::new(&storage);
        let mut client = ApiClient::new("http://127.0.0.1:9/api");

        gate.sign_in(&mut client, "abcdefgh123").unwrap();
        assert!(client.has_token());
        assert_eq!(
            storage.load_credentials().unwrap(),
            Some("abcdefgh123".to_string())
        );

        gate.sign_out(&mut client);
        assert!(!client.has_token());
        assert_eq!(storage.load_credentials().unwrap(), None);
    }
}
