//! In-memory token table, for local runs and tests.

use super::{Identity, SessionError, SessionResolver};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct StaticSessionResolver {
    sessions: HashMap<String, Identity>,
}

impl StaticSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.sessions.insert(token.into(), identity);
        self
    }

    /// Parse `token:user_id[:admin]` entries separated by commas.
    pub fn from_spec(spec: &str) -> Result<Self, String> {
        let mut resolver = Self::new();
        for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let identity = match parts.as_slice() {
                [token, user] if !token.is_empty() && !user.is_empty() => {
                    (*token, Identity::user(*user))
                }
                [token, user, "admin"] if !token.is_empty() && !user.is_empty() => {
                    (*token, Identity::admin(*user))
                }
                _ => return Err(format!("malformed session entry: {}", entry)),
            };
            resolver = resolver.with_session(identity.0, identity.1);
        }
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, SessionError> {
        Ok(self.sessions.get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_known_tokens_only() {
        let resolver = StaticSessionResolver::new().with_session("t1", Identity::user("u1"));
        assert_eq!(resolver.resolve("t1").await.unwrap(), Some(Identity::user("u1")));
        assert_eq!(resolver.resolve("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_from_spec() {
        let resolver = StaticSessionResolver::from_spec("t1:u1, t2:ops:admin,").unwrap();
        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.resolve("t2").await.unwrap(), Some(Identity::admin("ops")));
    }

    #[test]
    fn test_from_spec_rejects_malformed_entries() {
        assert!(StaticSessionResolver::from_spec("justatoken").is_err());
        assert!(StaticSessionResolver::from_spec("t1:u1:root").is_err());
        assert!(StaticSessionResolver::from_spec(":u1").is_err());
    }
}
