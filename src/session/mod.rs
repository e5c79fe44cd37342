//! Session lookup: turns a bearer token into a storefront identity.
//!
//! Authentication itself lives outside this service; we only ask who a
//! token belongs to.

use crate::domain::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod http;
pub mod mock;

pub use http::HttpSessionResolver;
pub use mock::StaticSessionResolver;

/// Caller identity as issued by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(id),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(id),
            is_admin: true,
        }
    }
}

#[async_trait]
pub trait SessionResolver: Send + Sync + fmt::Debug {
    /// Resolve a bearer token. `Ok(None)` means the token is unknown or expired.
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, SessionError>;
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}
