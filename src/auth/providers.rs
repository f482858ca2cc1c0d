//! Token Provider Implementations

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use super::{normalize, TokenProvider};

/// Fixed token, or none
#[derive(Debug, Clone, Default)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self {
            token: normalize(Some(token.to_string())),
        }
    }

    /// A provider that never has a token
    pub fn none() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Token cell shared with an auth flow
///
/// Clones share the same cell: `set` after login is seen by the next connect.
#[derive(Debug, Clone, Default)]
pub struct SharedToken {
    token: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: &str) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            normalize(Some(token.to_string()));
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TokenProvider for SharedToken {
    async fn access_token(&self) -> Option<String> {
        self.get()
    }
}

/// Reads an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: &str) -> Self {
        Self {
            var: var.to_string(),
        }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn access_token(&self) -> Option<String> {
        normalize(std::env::var(&self.var).ok())
    }
}

/// Reads a token file on every call
///
/// A missing, unreadable, or empty file means no token.
#[derive(Debug, Clone)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenProvider for FileToken {
    async fn access_token(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => normalize(Some(content)),
            Err(e) => {
                tracing::debug!(path = ?self.path, error = %e, "Token file not readable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_static_token() {
        assert_eq!(
            StaticToken::new("abc").access_token().await,
            Some("abc".to_string())
        );
        assert_eq!(StaticToken::new("").access_token().await, None);
        assert_eq!(StaticToken::none().access_token().await, None);
    }

    #[tokio::test]
    async fn test_shared_token_login_logout() {
        let token = SharedToken::new();
        let provider = token.clone();
        assert_eq!(provider.access_token().await, None);

        token.set("fresh-token");
        assert_eq!(provider.access_token().await, Some("fresh-token".to_string()));

        token.clear();
        assert_eq!(provider.access_token().await, None);
    }

    #[tokio::test]
    async fn test_env_token() {
        let var = "NOTIFYLINK_TEST_ENV_TOKEN_PROVIDER";
        let provider = EnvToken::new(var);

        std::env::remove_var(var);
        assert_eq!(provider.access_token().await, None);

        std::env::set_var(var, "env-token");
        assert_eq!(provider.access_token().await, Some("env-token".to_string()));
        std::env::remove_var(var);
    }

    #[tokio::test]
    async fn test_file_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        let provider = FileToken::new(&path);

        assert_eq!(provider.access_token().await, None);

        std::fs::write(&path, "file-token\n").unwrap();
        assert_eq!(provider.access_token().await, Some("file-token".to_string()));

        std::fs::write(&path, "").unwrap();
        assert_eq!(provider.access_token().await, None);
    }
}
