use crate::backoff::ExponentialBackoff;
use crate::engine::DashboardEngine;
use crate::model::{EventRecord, RawRecord};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: explicit shutdown, no further reconnects.
    Closed,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Closed => "Closed",
        }
    }
}

enum ReadOutcome {
    Disconnected,
    Shutdown,
}

/// Persistent live feed connection. Reconnects forever with capped
/// exponential backoff; only the shutdown signal ends the loop.
pub struct LiveFeedClient {
    url: String,
    backoff: ExponentialBackoff,
    state_tx: watch::Sender<ConnectionState>,
}

impl LiveFeedClient {
    pub fn new(
        url: String,
        reconnect_base: Duration,
        reconnect_max: Duration,
    ) -> (Self, watch::Receiver<ConnectionState>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        (
            Self {
                url,
                backoff: ExponentialBackoff::new(reconnect_base, reconnect_max),
                state_tx,
            },
            state_rx,
        )
    }

    pub async fn run(
        mut self,
        engine: Arc<Mutex<DashboardEngine>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            log::info!("🔌 Connecting to live feed: {}", self.url);

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            match connected {
                Ok((stream, _)) => {
                    self.set_state(ConnectionState::Connected);
                    log::info!("✅ Live feed connected");
                    self.backoff.reset();

                    match read_stream(stream, &engine, &mut shutdown).await {
                        ReadOutcome::Shutdown => break,
                        ReadOutcome::Disconnected => {
                            self.set_state(ConnectionState::Disconnected);
                            log::warn!("❌ Live feed disconnected");
                        }
                    }
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    log::error!("❌ Live feed connection failed: {}", e);
                }
            }

            tokio::select! {
                _ = self.backoff.sleep() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Closed);
        log::info!("Live feed closed");
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }
}

async fn read_stream(
    stream: WsStream,
    engine: &Arc<Mutex<DashboardEngine>>,
    shutdown: &mut watch::Receiver<bool>,
) -> ReadOutcome {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match parse_live_frame(text.as_str()) {
                        Ok(record) => {
                            log::debug!("📥 Live event {}", record.id);
                            engine.lock().await.apply_live_event(record, Utc::now());
                        }
                        Err(e) => {
                            // Bad frame is dropped; the connection stays up
                            log::warn!("⚠️ Dropping unparseable live frame: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if write.send(Message::Pong(data)).await.is_err() {
                        return ReadOutcome::Disconnected;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return ReadOutcome::Disconnected;
                }
                Some(Err(e)) => {
                    log::warn!("Live feed read error: {}", e);
                    return ReadOutcome::Disconnected;
                }
                Some(Ok(_)) => {}
            },
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    let _ = write.send(Message::Close(None)).await;
                    return ReadOutcome::Shutdown;
                }
            }
        }
    }
}

/// One live frame carries exactly one event.
pub fn parse_live_frame(text: &str) -> Result<EventRecord, String> {
    let raw: RawRecord = serde_json::from_str(text).map_err(|e| e.to_string())?;
    EventRecord::try_from(raw).map_err(|e| e.to_string())
}
