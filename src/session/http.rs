//! Session lookup against the storefront's auth service.

use super::{Identity, SessionError, SessionResolver};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Calls `GET {base_url}/session` with the caller's bearer token.
#[derive(Debug, Clone)]
pub struct HttpSessionResolver {
    client: Client,
    base_url: String,
}

impl HttpSessionResolver {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SessionResolver for HttpSessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, SessionError> {
        let url = format!("{}/session", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(SessionError::Network(e.to_string())))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
                debug!("Session lookup rejected token ({})", status);
                return Ok(None);
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(SessionError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(SessionError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<Identity>()
                .await
                .map(Some)
                .map_err(|e| backoff::Error::permanent(SessionError::Parse(e.to_string())))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let resolver = HttpSessionResolver::new("http://auth.local/".to_string());
        assert_eq!(resolver.base_url, "http://auth.local");
    }
}
