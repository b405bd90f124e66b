//! Availability sources
//!
//! Two channels feed the synchronizer:
//! - Pull: an authoritative snapshot fetched on demand
//! - Push: change signals only; the synchronizer re-pulls on every signal

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::AvailabilityPayload;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, instrument, warn};

use super::error::{SyncError, SyncResult};

/// Buffer of a push subscription. Signals are coalesced, so it stays small.
const SUBSCRIPTION_BUFFER: usize = 16;

/// "Something changed" notification from the push channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSignal {
    /// Changed entity, when the publisher knows it (informational only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub received_at: i64,
}

impl ChangeSignal {
    pub fn new(entity: Option<String>) -> Self {
        Self {
            entity,
            received_at: shared::util::now_millis(),
        }
    }
}

/// Open push subscription; dropping it unsubscribes
pub type PushSubscription = mpsc::Receiver<ChangeSignal>;

/// Pull channel: full availability snapshot
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> SyncResult<AvailabilityPayload>;
}

/// Push channel: change signals
#[async_trait]
pub trait PushSource: Send + Sync {
    async fn subscribe(&self) -> SyncResult<PushSubscription>;
}

// ============================================================================
// HTTP pull
// ============================================================================

/// Pulls `GET {url}` returning `{"products": {...}, "ingredients": {...}}`
pub struct HttpSnapshotSource {
    client: Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SyncError::InvalidConfig(format!(
                "Availability URL must be http(s): {url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_snapshot(&self) -> SyncResult<AvailabilityPayload> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SyncError::Fetch(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Fetch(format!(
                "Unexpected status {status}: {body}"
            )));
        }

        let payload: AvailabilityPayload = response
            .json()
            .await
            .map_err(|e| SyncError::Fetch(format!("Failed to parse snapshot: {e}")))?;

        debug!(
            products = payload.products.len(),
            ingredients = payload.ingredients.len(),
            "Availability snapshot fetched"
        );
        Ok(payload)
    }
}

// ============================================================================
// In-process push
// ============================================================================

/// In-process push channel backed by a broadcast bus
///
/// Publishers call [`BroadcastPushSource::notify`]; every subscription gets
/// its own bounded receiver.
#[derive(Debug, Clone)]
pub struct BroadcastPushSource {
    tx: broadcast::Sender<ChangeSignal>,
}

impl BroadcastPushSource {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a change signal; returns the number of live subscribers
    pub fn notify(&self, entity: Option<String>) -> usize {
        self.tx.send(ChangeSignal::new(entity)).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastPushSource {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl PushSource for BroadcastPushSource {
    async fn subscribe(&self) -> SyncResult<PushSubscription> {
        let mut bus_rx = self.tx.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    msg = bus_rx.recv() => match msg {
                        Ok(signal) => {
                            if tx.send(signal).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // A re-pull covers every missed change
                            warn!("Push subscription lagged {n} signals");
                            if tx.send(ChangeSignal::new(None)).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("Push subscription forwarder stopped");
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server answering a single request with `status` and `body`
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/availability")
    }

    #[tokio::test]
    async fn test_http_source_parses_snapshot() {
        let url = serve_once(
            "200 OK",
            r#"{"products":{"x-burger":true,"coke":false},"ingredients":{"bacon":false}}"#,
        )
        .await;
        let source = HttpSnapshotSource::new(url, Duration::from_secs(5)).unwrap();

        let payload = source.fetch_snapshot().await.unwrap();
        assert_eq!(payload.products.get("x-burger"), Some(&true));
        assert_eq!(payload.products.get("coke"), Some(&false));
        assert_eq!(payload.ingredients.get("bacon"), Some(&false));
    }

    #[tokio::test]
    async fn test_http_source_rejects_error_status() {
        let url = serve_once("503 Service Unavailable", "down").await;
        let source = HttpSnapshotSource::new(url, Duration::from_secs(5)).unwrap();

        let err = source.fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(ref msg) if msg.contains("503")));
    }

    #[test]
    fn test_http_source_invalid_url() {
        let result = HttpSnapshotSource::new("ftp://menu", Duration::from_secs(1));
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_broadcast_push_forwards_signals() {
        let push = BroadcastPushSource::default();
        assert_eq!(push.notify(None), 0);

        let mut sub = push.subscribe().await.unwrap();
        assert_eq!(push.subscriber_count(), 1);
        push.notify(Some("bacon".into()));

        let signal = sub.recv().await.unwrap();
        assert_eq!(signal.entity.as_deref(), Some("bacon"));
    }

    #[tokio::test]
    async fn test_broadcast_push_unsubscribes_on_drop() {
        let push = BroadcastPushSource::default();
        let sub = push.subscribe().await.unwrap();
        drop(sub);

        // The forwarder notices the closed receiver and drops its bus handle
        for _ in 0..100 {
            if push.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(push.subscriber_count(), 0);
    }
}
