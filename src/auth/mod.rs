//! Access Tokens
//!
//! The connection manager reads the access token through a [`TokenProvider`]
//! once per connection attempt. Token storage belongs to the caller:
//! - [`StaticToken`] (fixed value)
//! - [`SharedToken`] (updated by login/logout flows)
//! - [`EnvToken`] (environment variable)
//! - [`FileToken`] (file written by another process)

mod providers;

pub use providers::{EnvToken, FileToken, SharedToken, StaticToken};

use async_trait::async_trait;
use std::sync::Arc;

/// Source of the access token used to authenticate the socket
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token, `None` when the user is not authenticated
    async fn access_token(&self) -> Option<String>;
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn access_token(&self) -> Option<String> {
        (**self).access_token().await
    }
}

/// Empty and whitespace-only tokens count as absent
pub(crate) fn normalize(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
