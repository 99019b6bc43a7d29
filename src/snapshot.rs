use crate::engine::DashboardEngine;
use crate::model::{EventRecord, RawRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

#[derive(Debug)]
pub enum FetchError {
    Transport(String),
    Status(u16),
    Malformed(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "Snapshot transport error: {}", msg),
            FetchError::Status(code) => write!(f, "Snapshot HTTP status {}", code),
            FetchError::Malformed(msg) => write!(f, "Malformed snapshot payload: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Stats as the backend reports them. The engine recomputes its own on
/// every projection; these are logged for drift visibility only.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerStats {
    pub total_24h: i64,
    pub avg_magnitude: f64,
    pub active_alerts: i64,
}

/// One parsed snapshot: the valid records plus how many were dropped.
#[derive(Debug)]
pub struct SnapshotBatch {
    pub records: Vec<EventRecord>,
    pub dropped: usize,
    pub server_stats: Option<ServerStats>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    earthquakes: Vec<serde_json::Value>,
    #[serde(default)]
    stats: Option<ServerStats>,
}

/// Decode the dashboard-data payload. A malformed record never aborts the
/// batch: it is dropped and counted, and the valid remainder still applies.
pub fn parse_payload(payload: serde_json::Value) -> Result<SnapshotBatch, FetchError> {
    let raw: RawPayload =
        serde_json::from_value(payload).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let mut records = Vec::with_capacity(raw.earthquakes.len());
    let mut dropped = 0;
    for value in raw.earthquakes {
        let parsed = serde_json::from_value::<RawRecord>(value)
            .map_err(|e| e.to_string())
            .and_then(|r| EventRecord::try_from(r).map_err(|e| e.to_string()));
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => {
                dropped += 1;
                log::warn!("⚠️ Dropping invalid snapshot record: {}", e);
            }
        }
    }

    Ok(SnapshotBatch {
        records,
        dropped,
        server_stats: raw.stats,
    })
}

/// Source of full snapshots. The poll task only sees this trait, so tests
/// drive it with an in-memory fake.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<SnapshotBatch, FetchError>;
}

pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotFetcher {
    pub fn new(url: String) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotFetcher {
    async fn fetch(&self) -> Result<SnapshotBatch, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        parse_payload(payload)
    }
}

/// Fetch once immediately, then on every interval tick. A failed cycle is
/// logged and skipped; the store and views keep their last good state. No
/// immediate retry, the next tick is the retry.
pub async fn snapshot_poll_task(
    source: Arc<dyn SnapshotSource>,
    engine: Arc<Mutex<DashboardEngine>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match source.fetch().await {
                    Ok(batch) => {
                        if batch.dropped > 0 {
                            log::warn!("⚠️ Snapshot contained {} invalid records", batch.dropped);
                        }
                        if let Some(stats) = &batch.server_stats {
                            log::debug!(
                                "Server stats: total_24h={} avg={:.2} alerts={}",
                                stats.total_24h,
                                stats.avg_magnitude,
                                stats.active_alerts
                            );
                        }
                        engine.lock().await.apply_snapshot(batch.records, Utc::now());
                    }
                    Err(e) => {
                        log::error!("❌ Snapshot fetch failed, skipping cycle: {}", e);
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("Snapshot poller stopping");
                    break;
                }
            }
        }
    }
}
