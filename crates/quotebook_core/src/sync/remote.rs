//! Remote quote source adapter.
//!
//! # Responsibility
//! - Fetch candidate quotes from the configured HTTP endpoint.
//! - Publish locally created quotes, best-effort.
//!
//! # Invariants
//! - `fetch_candidates` never returns an error: network, status and decode
//!   failures become `FetchOutcome::Unavailable`.
//! - Every fetched record carries the `"Server"` category.
//! - Publishing never retries and never reports failure to the user.

use crate::config::RemoteConfig;
use crate::model::quote::{Quote, REMOTE_CATEGORY};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Transport/decoding failure inside the adapter.
#[derive(Debug)]
pub enum RemoteError {
    Http(reqwest::Error),
    Status(u16),
    Decode(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "http request failed: {err}"),
            Self::Status(code) => write!(f, "remote responded with status {code}"),
            Self::Decode(details) => write!(f, "unexpected remote payload: {details}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Result of one fetch attempt.
///
/// Keeps "remote unreachable" distinguishable from "nothing new".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Available(Vec<Quote>),
    Unavailable { reason: String },
}

impl FetchOutcome {
    /// Candidate records; empty when the remote was unavailable.
    pub fn candidates(&self) -> &[Quote] {
        match self {
            Self::Available(quotes) => quotes,
            Self::Unavailable { .. } => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Remote collection contract used by the sync engine and the add flow.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Reads candidate quotes. Degrades to `Unavailable` instead of failing.
    async fn fetch_candidates(&self) -> FetchOutcome;
    /// Sends one locally created quote.
    async fn publish(&self, record: &Quote) -> Result<(), RemoteError>;
}

/// `reqwest`-backed remote source.
pub struct HttpRemoteSource {
    client: reqwest::Client,
    endpoint: String,
    fetch_limit: u32,
}

impl HttpRemoteSource {
    /// Builds a client with the configured request timeout.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            fetch_limit: config.fetch_limit,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn try_fetch(&self) -> Result<Vec<Quote>, RemoteError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("_limit", self.fetch_limit)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        map_remote_items(&body)
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_candidates(&self) -> FetchOutcome {
        match self.try_fetch().await {
            Ok(quotes) => {
                debug!(
                    "event=remote_fetch module=sync status=ok count={}",
                    quotes.len()
                );
                FetchOutcome::Available(quotes)
            }
            Err(err) => {
                warn!("event=remote_fetch module=sync status=unavailable error={err}");
                FetchOutcome::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn publish(&self, record: &Quote) -> Result<(), RemoteError> {
        let response = self.client.post(&self.endpoint).json(record).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Maps a remote JSON array of generic items into quotes.
///
/// Each item's string `title` becomes the quote text; items without one are
/// skipped.
pub fn map_remote_items(body: &str) -> Result<Vec<Quote>, RemoteError> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| RemoteError::Decode(err.to_string()))?;
    let Value::Array(items) = value else {
        return Err(RemoteError::Decode("expected a JSON array".to_string()));
    };

    Ok(items
        .iter()
        .filter_map(|item| item.get("title").and_then(Value::as_str))
        .map(|title| Quote::unchecked(title, REMOTE_CATEGORY))
        .collect())
}

/// Publishes `record` on a background task; failures are only logged.
pub fn publish_in_background(remote: Arc<dyn RemoteSource>, record: Quote) -> JoinHandle<()> {
    tokio::spawn(async move {
        match remote.publish(&record).await {
            Ok(()) => info!("event=remote_publish module=sync status=ok"),
            Err(err) => warn!("event=remote_publish module=sync status=error error={err}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{map_remote_items, FetchOutcome, HttpRemoteSource, RemoteError, RemoteSource};
    use crate::config::RemoteConfig;
    use crate::model::quote::Quote;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn maps_titles_to_server_quotes() {
        let body = r#"[
            {"userId": 1, "id": 1, "title": "first", "body": "x"},
            {"id": 2, "body": "no title"},
            {"id": 3, "title": 42},
            {"id": 4, "title": "second"}
        ]"#;
        let quotes = map_remote_items(body).unwrap();
        assert_eq!(
            quotes,
            vec![
                Quote::unchecked("first", "Server"),
                Quote::unchecked("second", "Server"),
            ]
        );
    }

    #[test]
    fn non_array_payload_is_a_decode_error() {
        let err = map_remote_items(r#"{"title": "x"}"#).unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
        assert!(matches!(
            map_remote_items("not json"),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn unavailable_outcome_has_no_candidates() {
        let outcome = FetchOutcome::Unavailable {
            reason: "offline".to_string(),
        };
        assert!(outcome.candidates().is_empty());
        assert!(!outcome.is_available());
    }

    #[tokio::test]
    async fn closed_endpoint_degrades_to_unavailable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let remote = HttpRemoteSource::new(&RemoteConfig {
            endpoint: format!("http://127.0.0.1:{port}/posts"),
            fetch_limit: 5,
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let outcome = remote.fetch_candidates().await;
        assert!(matches!(outcome, FetchOutcome::Unavailable { .. }));

        let publish = remote.publish(&Quote::unchecked("Hi", "A")).await;
        assert!(publish.is_err());
    }
}
