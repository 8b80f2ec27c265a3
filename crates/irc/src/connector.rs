use {
    async_trait::async_trait,
    chrono::Utc,
    futures::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream},
    secrecy::ExposeSecret,
    tokio::{net::TcpStream, sync::mpsc},
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use herald_connectors::{ChatSender, ConnectorError, ConnectorState, Event, InboundConnector};

use crate::{config::IrcConfig, parse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Chat connector: IRC over a WebSocket transport.
///
/// `start` authenticates, joins the configured channel, and spawns a
/// reader and a writer task. The reader pushes events in wire order; the
/// writer drains an unbounded queue shared with [`IrcSender`], so sends
/// never contend with the receive loop.
pub struct IrcConnector {
    config: IrcConfig,
    state: ConnectorState,
    write_tx: mpsc::UnboundedSender<Message>,
    write_rx: Option<mpsc::UnboundedReceiver<Message>>,
    cancel: CancellationToken,
}

impl IrcConnector {
    pub fn new(config: IrcConfig) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        Self {
            config,
            state: ConnectorState::Created,
            write_tx,
            write_rx: Some(write_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Outbound handle for posting messages to the joined channel.
    /// Cheap to clone into modules; valid for the connector's lifetime.
    pub fn sender(&self) -> IrcSender {
        IrcSender {
            channel: self.config.channel.clone(),
            write_tx: self.write_tx.clone(),
        }
    }
}

#[async_trait]
impl InboundConnector for IrcConnector {
    fn name(&self) -> &str {
        "irc"
    }

    async fn start(&mut self, events: mpsc::Sender<Event>) -> Result<(), ConnectorError> {
        match self.state {
            ConnectorState::Created => {}
            ConnectorState::Started => {
                return Err(ConnectorError::AlreadyStarted("irc".into()));
            }
            ConnectorState::Closed => return Err(ConnectorError::Closed("irc".into())),
        }

        let (mut ws, _) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        // Login and join before handing the socket to the background tasks
        // so a rejected connection fails `start` instead of surfacing later.
        let login = [
            "CAP REQ :twitch.tv/membership".to_string(),
            format!("PASS oauth:{}", self.config.token.expose_secret()),
            format!("NICK {}", self.config.nick),
            format!("JOIN {}", self.config.channel),
        ];
        for line in login {
            ws.send(Message::Text(line.into()))
                .await
                .map_err(|e| ConnectorError::Connection(e.to_string()))?;
        }

        let (sink, stream) = ws.split();
        let write_rx = self
            .write_rx
            .take()
            .ok_or_else(|| ConnectorError::AlreadyStarted("irc".into()))?;

        tokio::spawn(write_loop(sink, write_rx, self.cancel.clone()));
        tokio::spawn(read_loop(
            stream,
            events,
            self.write_tx.clone(),
            self.cancel.clone(),
        ));

        self.state = ConnectorState::Started;
        info!(channel = %self.config.channel, "irc connector started");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        if self.state == ConnectorState::Started {
            info!("closing irc connector");
        }
        self.cancel.cancel();
        self.state = ConnectorState::Closed;
        Ok(())
    }
}

/// Drains the outbound queue into the socket.
async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut write_rx: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            queued = write_rx.recv() => match queued {
                Some(message) => {
                    if let Err(error) = sink.send(message).await {
                        warn!(%error, "irc write failed");
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

/// Reads frames until the connection terminates, translating chat lines
/// into events. Dropping `events` on exit is what signals stream
/// termination to the orchestrator.
async fn read_loop(
    mut stream: SplitStream<WsStream>,
    events: mpsc::Sender<Event>,
    write_tx: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    for line in text.as_str().lines() {
                        if !handle_line(line, &events, &write_tx).await {
                            return;
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = write_tx.send(Message::Pong(payload));
                }
                Some(Ok(Message::Close(_))) | None => {
                    warn!("irc stream closed by peer");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(%error, "irc read failed");
                    break;
                }
            },
        }
    }
}

/// Translate one IRC line. Returns false when the dispatch side is gone
/// and the read loop should stop.
async fn handle_line(
    line: &str,
    events: &mpsc::Sender<Event>,
    write_tx: &mpsc::UnboundedSender<Message>,
) -> bool {
    let Some(parsed) = parse::parse_line(line) else {
        return true;
    };

    match parsed.command {
        "PING" => {
            let reply = match parsed.params.first() {
                Some(server) => format!("PONG :{server}"),
                None => "PONG".to_string(),
            };
            let _ = write_tx.send(Message::Text(reply.into()));
            true
        }
        "PRIVMSG" => {
            let sender = parsed.prefix.map(parse::nick_of).unwrap_or_default();
            let (Some(channel), Some(text)) = (parsed.params.first(), parsed.params.get(1)) else {
                return true;
            };
            events
                .send(Event::ChatMessage {
                    at: Utc::now(),
                    channel: (*channel).to_string(),
                    sender: sender.to_string(),
                    text: (*text).to_string(),
                })
                .await
                .is_ok()
        }
        "JOIN" => {
            let Some(prefix) = parsed.prefix else {
                return true;
            };
            let channel = parsed.params.first().copied().unwrap_or_default();
            events
                .send(Event::Presence {
                    at: Utc::now(),
                    channel: channel.to_string(),
                    identity: parse::nick_of(prefix).to_string(),
                })
                .await
                .is_ok()
        }
        other => {
            debug!(command = other, "ignored irc command");
            true
        }
    }
}

/// Outbound half of the chat connector.
#[derive(Clone)]
pub struct IrcSender {
    channel: String,
    write_tx: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl ChatSender for IrcSender {
    async fn send(&self, text: &str) -> Result<(), ConnectorError> {
        let line = format!("PRIVMSG {} :{}", self.channel, text);
        self.write_tx
            .send(Message::Text(line.into()))
            .map_err(|_| ConnectorError::Send("irc connection closed".into()))
    }
}
