use std::time::Duration;

use {
    async_trait::async_trait,
    chrono::Utc,
    futures::{SinkExt, StreamExt},
    secrecy::{ExposeSecret, Secret},
    tokio::{net::TcpStream, sync::mpsc, time::MissedTickBehavior},
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use herald_connectors::{ConnectorError, ConnectorState, Event, InboundConnector};

use crate::frame::{CHANNEL_POINTS_TOPIC, Incoming, ListenData, Outgoing};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Twitch PubSub WebSocket endpoint.
pub const TWITCH_PUBSUB_URL: &str = "wss://pubsub-edge.twitch.tv";

/// The server drops clients that stay silent for five minutes.
const PING_INTERVAL: Duration = Duration::from_secs(240);

/// Connection settings for the PubSub connector.
#[derive(Clone)]
pub struct PubSubConfig {
    /// WebSocket URL of the PubSub edge.
    pub url: String,
    /// Numeric channel id used to build the topic name.
    pub channel_id: String,
    /// OAuth token authorizing the topic subscription.
    pub token: Secret<String>,
}

/// Inbound-only connector for platform pub/sub notifications.
pub struct PubSubConnector {
    config: PubSubConfig,
    state: ConnectorState,
    cancel: CancellationToken,
}

impl PubSubConnector {
    pub fn new(config: PubSubConfig) -> Self {
        Self {
            config,
            state: ConnectorState::Created,
            cancel: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl InboundConnector for PubSubConnector {
    fn name(&self) -> &str {
        "pubsub"
    }

    async fn start(&mut self, events: mpsc::Sender<Event>) -> Result<(), ConnectorError> {
        match self.state {
            ConnectorState::Created => {}
            ConnectorState::Started => {
                return Err(ConnectorError::AlreadyStarted("pubsub".into()));
            }
            ConnectorState::Closed => return Err(ConnectorError::Closed("pubsub".into())),
        }

        let (mut ws, _) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        let listen = Outgoing::Listen {
            nonce: format!("herald-{}", Utc::now().timestamp_millis()),
            data: ListenData {
                topics: vec![format!("{CHANNEL_POINTS_TOPIC}.{}", self.config.channel_id)],
                auth_token: self.config.token.expose_secret().clone(),
            },
        };
        let frame =
            serde_json::to_string(&listen).map_err(|e| ConnectorError::Connection(e.to_string()))?;
        ws.send(Message::Text(frame.into()))
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        tokio::spawn(run_loop(ws, events, self.cancel.clone()));

        self.state = ConnectorState::Started;
        info!(channel_id = %self.config.channel_id, "pubsub connector started");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        if self.state == ConnectorState::Started {
            info!("closing pubsub connector");
        }
        self.cancel.cancel();
        self.state = ConnectorState::Closed;
        Ok(())
    }
}

/// Single task owning the socket: interleaves the keepalive ping with
/// inbound frames until the connection terminates or shutdown is
/// signaled.
async fn run_loop(mut ws: WsStream, events: mpsc::Sender<Event>, cancel: CancellationToken) {
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.send(Message::Close(None)).await;
                break;
            }
            _ = ping.tick() => {
                let Ok(frame) = serde_json::to_string(&Outgoing::Ping) else {
                    continue;
                };
                if let Err(error) = ws.send(Message::Text(frame.into())).await {
                    warn!(%error, "pubsub ping failed");
                    break;
                }
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if !handle_frame(text.as_str(), &events).await {
                        break;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = ws.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    warn!("pubsub stream closed by peer");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(%error, "pubsub read failed");
                    break;
                }
            },
        }
    }
}

/// Handle one text frame. Returns false when the stream should terminate.
async fn handle_frame(raw: &str, events: &mpsc::Sender<Event>) -> bool {
    let frame: Incoming = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(error) => {
            debug!(%error, "unparseable pubsub frame");
            return true;
        }
    };

    match frame.kind.as_str() {
        "MESSAGE" => {
            let Some(data) = frame.data else {
                return true;
            };
            // The payload is a JSON document encoded as a string; keep the
            // raw text when it does not parse.
            let payload = serde_json::from_str(&data.message)
                .unwrap_or_else(|_| serde_json::Value::String(data.message.clone()));
            events
                .send(Event::PubSubNotification {
                    at: Utc::now(),
                    topic: data.topic,
                    payload,
                })
                .await
                .is_ok()
        }
        "RESPONSE" => {
            if let Some(error) = frame.error.filter(|e| !e.is_empty()) {
                warn!(%error, nonce = frame.nonce.as_deref().unwrap_or_default(), "pubsub listen rejected");
            }
            true
        }
        "PONG" => true,
        "RECONNECT" => {
            info!("pubsub server requested reconnect, terminating stream");
            false
        }
        other => {
            debug!(kind = other, "ignored pubsub frame");
            true
        }
    }
}
