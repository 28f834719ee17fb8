//! WebSocket transport speaking Socket.IO.
//!
//! Each [`WebSocketConnector::open`] spawns one connection task. The task owns
//! the socket; the returned [`WebSocketTransport`] only holds the sending half
//! of a command channel. Everything the connection observes is reported as a
//! [`TransportEnvelope`] tagged with the connection's generation, ending with
//! exactly one `Disconnected`.

use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::time::Duration;

use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

use crate::{
    domain::{Connector, OutboundEvent, Transport, TransportEnvelope, TransportEvent},
    error::TransportError,
    infrastructure::{
        dto::event::outbound_packet,
        protocol::{
            EnginePacket, Frame, FrameDecoder, Incoming, Packet, PacketType, encode_packet,
            socket_endpoint,
        },
    },
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Commands from the session to the connection task
#[derive(Debug)]
enum Command {
    Emit(OutboundEvent),
    Close,
}

/// Opens Socket.IO connections to one server.
pub struct WebSocketConnector {
    endpoint: String,
    events: mpsc::UnboundedSender<TransportEnvelope>,
}

impl WebSocketConnector {
    /// Create a connector for `server` (e.g. `http://192.168.1.2:2333`).
    ///
    /// Every connection it opens reports into `events`.
    pub fn new(server: &str, events: mpsc::UnboundedSender<TransportEnvelope>) -> Self {
        Self {
            endpoint: socket_endpoint(server),
            events,
        }
    }

    /// The WebSocket URL connections are made to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Connector for WebSocketConnector {
    fn open(&mut self, generation: u64) -> Box<dyn Transport> {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection(
            self.endpoint.clone(),
            generation,
            rx,
            self.events.clone(),
        ));
        Box::new(WebSocketTransport {
            generation,
            commands,
        })
    }
}

/// Handle to one connection task.
pub struct WebSocketTransport {
    generation: u64,
    commands: mpsc::UnboundedSender<Command>,
}

impl Transport for WebSocketTransport {
    fn emit(&mut self, event: OutboundEvent) {
        if self.commands.send(Command::Emit(event)).is_err() {
            tracing::debug!(
                generation = self.generation,
                "Connection task finished; dropping outbound event"
            );
        }
    }

    fn close(&mut self) {
        if self.commands.send(Command::Close).is_err() {
            tracing::debug!(generation = self.generation, "Connection already closed");
        }
    }
}

async fn run_connection(
    endpoint: String,
    generation: u64,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEnvelope>,
) {
    tracing::info!(generation, "Connecting to {}", endpoint);

    match drive(&endpoint, generation, commands, &events).await {
        Ok(()) => tracing::info!(generation, "Connection closed"),
        Err(e) => tracing::warn!(generation, "Connection ended: {}", e),
    }

    if events
        .send(TransportEnvelope::new(generation, TransportEvent::Disconnected))
        .is_err()
    {
        tracing::debug!(generation, "Session gone before disconnect was reported");
    }
}

async fn drive(
    endpoint: &str,
    generation: u64,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<TransportEnvelope>,
) -> Result<(), TransportError> {
    let (socket, _response) = connect_async(endpoint).await?;
    let (sink, mut stream) = socket.split();
    let mut connection = Connection {
        generation,
        sink,
        decoder: FrameDecoder::new(),
        joined_namespace: false,
        heartbeat: None,
        heartbeat_deadline: None,
        backlog: Vec::new(),
        events: events.clone(),
    };

    loop {
        let heartbeat_deadline = connection.heartbeat_deadline;
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Emit(event)) => connection.emit(event).await?,
                Some(Command::Close) | None => return connection.close().await,
            },
            message = stream.next() => {
                let Some(message) = message else {
                    return Ok(());
                };
                if connection.receive(message?).await? == Flow::Stop {
                    return Ok(());
                }
            }
            _ = wait_for_heartbeat(heartbeat_deadline) => {
                return Err(TransportError::HeartbeatTimeout(
                    connection.heartbeat.unwrap_or_default(),
                ));
            }
        }
    }
}

async fn wait_for_heartbeat(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// State of one live socket
struct Connection {
    generation: u64,
    sink: WsSink,
    decoder: FrameDecoder,
    joined_namespace: bool,
    /// Ping interval plus ping timeout from the handshake
    heartbeat: Option<Duration>,
    /// The server is considered gone if no ping arrives by then
    heartbeat_deadline: Option<Instant>,
    /// Events emitted before the namespace handshake completed
    backlog: Vec<OutboundEvent>,
    events: mpsc::UnboundedSender<TransportEnvelope>,
}

impl Connection {
    async fn emit(&mut self, event: OutboundEvent) -> Result<(), TransportError> {
        if !self.joined_namespace {
            self.backlog.push(event);
            return Ok(());
        }
        tracing::debug!(generation = self.generation, "Emitting '{}'", event.name());
        let (packet, attachments) = outbound_packet(event);
        self.send_frames(encode_packet(&packet, attachments)).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.joined_namespace {
            self.send_frames(encode_packet(&Packet::disconnect(), Vec::new()))
                .await?;
        }
        self.sink.close().await?;
        Ok(())
    }

    async fn receive(&mut self, message: Message) -> Result<Flow, TransportError> {
        let decoded = match message {
            Message::Text(text) => self.decoder.text(text.as_str()),
            Message::Binary(data) => self.decoder.binary(data.to_vec()),
            Message::Close(frame) => {
                tracing::debug!(generation = self.generation, "Server closed socket: {:?}", frame);
                return Ok(Flow::Stop);
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Ok(Flow::Continue),
        };

        let incoming = match decoded {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!(generation = self.generation, "Dropping undecodable frame: {}", e);
                return Ok(Flow::Continue);
            }
        };

        match incoming {
            Incoming::Open(handshake) => {
                tracing::debug!(
                    generation = self.generation,
                    sid = %handshake.sid,
                    ping_interval = handshake.ping_interval,
                    "Engine.IO session opened"
                );
                self.heartbeat = Some(handshake.heartbeat_timeout());
                self.arm_heartbeat();
                self.send_frames(encode_packet(&Packet::connect(), Vec::new()))
                    .await?;
            }
            Incoming::Ping(data) => {
                tracing::trace!(generation = self.generation, "ping");
                self.arm_heartbeat();
                self.send_frames(vec![Frame::Text(EnginePacket::Pong(data).encode())])
                    .await?;
            }
            Incoming::Close => return Ok(Flow::Stop),
            Incoming::Packet(packet) => return self.handle_packet(packet).await,
            Incoming::Nothing => {}
        }
        Ok(Flow::Continue)
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<Flow, TransportError> {
        match packet.kind {
            PacketType::Connect => {
                self.joined_namespace = true;
                if !self.report(TransportEvent::Connected) {
                    return Ok(Flow::Stop);
                }
                for event in std::mem::take(&mut self.backlog) {
                    self.emit(event).await?;
                }
            }
            PacketType::Disconnect => return Ok(Flow::Stop),
            PacketType::ConnectError => {
                let reason = packet
                    .data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown reason")
                    .to_string();
                return Err(TransportError::Refused(reason));
            }
            PacketType::Event | PacketType::BinaryEvent => {
                let (name, mut args) = match packet.into_event() {
                    Ok(parts) => parts,
                    Err(e) => {
                        tracing::warn!(generation = self.generation, "Dropping event: {}", e);
                        return Ok(Flow::Continue);
                    }
                };
                let payload = if args.is_empty() {
                    serde_json::Value::Null
                } else {
                    args.swap_remove(0)
                };
                tracing::debug!(generation = self.generation, "Received '{}'", name);
                if !self.report(TransportEvent::Event { name, payload }) {
                    return Ok(Flow::Stop);
                }
            }
            PacketType::Ack | PacketType::BinaryAck => {
                tracing::trace!(generation = self.generation, "Ignoring ack {:?}", packet.id);
            }
        }
        Ok(Flow::Continue)
    }

    fn arm_heartbeat(&mut self) {
        self.heartbeat_deadline = self.heartbeat.map(|timeout| Instant::now() + timeout);
    }

    /// Returns `false` once nobody listens anymore.
    fn report(&self, event: TransportEvent) -> bool {
        self.events
            .send(TransportEnvelope::new(self.generation, event))
            .is_ok()
    }

    async fn send_frames(&mut self, frames: Vec<Frame>) -> Result<(), TransportError> {
        for frame in frames {
            let message = match frame {
                Frame::Text(text) => Message::Text(text.into()),
                Frame::Binary(data) => Message::Binary(data.into()),
            };
            self.sink.send(message).await?;
        }
        Ok(())
    }
}
