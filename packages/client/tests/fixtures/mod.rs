//! Test fixtures: a scripted Socket.IO server and recording host ports.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use lanchat_client::{
    domain::{
        ChatMessage, DesktopNotification, IconState, NotificationPermission, Notifier, Platform,
        SoundPlayer, TransportEnvelope, View,
    },
    error::PlatformError,
    usecase::SessionController,
};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// How long a test waits for any single frame or event.
pub const WAIT: Duration = Duration::from_secs(5);

fn open_packet(ping_interval_ms: u64, ping_timeout_ms: u64) -> String {
    format!(
        r#"0{{"sid":"engine-1","upgrades":[],"pingInterval":{ping_interval_ms},"pingTimeout":{ping_timeout_ms},"maxPayload":1000000}}"#
    )
}

/// Fake Socket.IO server.
///
/// Accepts connections one after another. For each it sends the Engine.IO
/// open packet and answers the namespace connect (`40`); every other frame
/// the client sends is handed to the test, and the test decides what to push.
pub struct FakeServer {
    addr: SocketAddr,
    received: mpsc::UnboundedReceiver<Message>,
    push: mpsc::UnboundedSender<Message>,
}

impl FakeServer {
    /// Start the server on a free local port.
    pub async fn start() -> Self {
        Self::start_with_heartbeat(25_000, 20_000).await
    }

    /// Start the server announcing the given heartbeat timers.
    ///
    /// The server never pings on its own; tests push `2` when they want one.
    pub async fn start_with_heartbeat(ping_interval_ms: u64, ping_timeout_ms: u64) -> Self {
        let open = open_packet(ping_interval_ms, ping_timeout_ms);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake server");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let (received_tx, received) = mpsc::unbounded_channel();
        let (push, mut push_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(mut ws) = accept_async(stream).await else {
                    continue;
                };
                if ws.send(Message::text(open.clone())).await.is_err() {
                    continue;
                }
                loop {
                    tokio::select! {
                        Some(message) = push_rx.recv() => {
                            let close = message.is_close();
                            if ws.send(message).await.is_err() || close {
                                break;
                            }
                        }
                        frame = ws.next() => {
                            let Some(Ok(message)) = frame else {
                                break;
                            };
                            if message.to_text().map(|t| t == "40").unwrap_or(false) {
                                if ws.send(Message::text(r#"40{"sid":"socket-1"}"#.to_string())).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                            let close = message.is_close();
                            if received_tx.send(message).is_err() || close {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            addr,
            received,
            push,
        }
    }

    /// Base URL as a user would pass it with `--server`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Push a raw text frame to the connected client.
    pub fn push_text(&self, text: &str) {
        self.push
            .send(Message::text(text.to_string()))
            .expect("Server task gone");
    }

    /// Push an event (`42[name, payload]`).
    pub fn push_event(&self, name: &str, payload: serde_json::Value) {
        let body = serde_json::json!([name, payload]);
        self.push_text(&format!("42{body}"));
    }

    /// Close the client's socket from the server side.
    pub fn close_socket(&self) {
        self.push.send(Message::Close(None)).expect("Server task gone");
    }

    /// Next frame sent by the client.
    pub async fn next_frame(&mut self) -> Message {
        timeout(WAIT, self.received.recv())
            .await
            .expect("Timed out waiting for a client frame")
            .expect("Server task gone")
    }

    /// Next text frame sent by the client.
    pub async fn next_text(&mut self) -> String {
        match self.next_frame().await {
            Message::Text(text) => text.as_str().to_string(),
            other => panic!("Expected a text frame, got {other:?}"),
        }
    }

    /// Next event sent by the client, as `(name, first argument)`.
    pub async fn next_event(&mut self) -> (String, serde_json::Value) {
        let text = self.next_text().await;
        let body = text
            .strip_prefix("42")
            .unwrap_or_else(|| panic!("Expected an event, got {text}"));
        let value: serde_json::Value = serde_json::from_str(body).expect("Invalid event JSON");
        (
            value[0].as_str().expect("Event without name").to_string(),
            value[1].clone(),
        )
    }
}

/// What the recording view saw.
#[derive(Default)]
pub struct Screen {
    pub messages: Vec<ChatMessage>,
    pub members: Vec<String>,
    pub typing: Option<String>,
    pub connected: bool,
    pub titles: Vec<String>,
}

/// View that records into a shared [`Screen`].
pub struct RecordingView(pub Arc<Mutex<Screen>>);

impl View for RecordingView {
    fn append_message(&mut self, message: &ChatMessage) {
        self.0.lock().unwrap().messages.push(message.clone());
    }

    fn clear_messages(&mut self) {
        self.0.lock().unwrap().messages.clear();
    }

    fn show_members(&mut self, members: &[String]) {
        self.0.lock().unwrap().members = members.to_vec();
    }

    fn show_typing(&mut self, label: Option<&str>) {
        self.0.lock().unwrap().typing = label.map(str::to_string);
    }

    fn show_connection(&mut self, connected: bool) {
        self.0.lock().unwrap().connected = connected;
    }

    fn set_title(&mut self, title: &str) {
        self.0.lock().unwrap().titles.push(title.to_string());
    }

    fn set_icon(&mut self, _icon: IconState) {}
}

/// Notifier that has already been granted and shows nothing.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn request_permission(&mut self) {}

    fn show(&mut self, _notification: &DesktopNotification) {}
}

/// Host without sound.
pub struct NoSound;

impl SoundPlayer for NoSound {
    fn play(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("sound"))
    }
}

/// Platform recording into `screen`.
pub fn recording_platform(screen: Arc<Mutex<Screen>>) -> Platform {
    Platform {
        view: Box::new(RecordingView(screen)),
        notifier: Box::new(SilentNotifier),
        sound: Box::new(NoSound),
    }
}

/// Receive the next transport event and feed it to the controller.
pub async fn pump(
    controller: &mut SessionController,
    events: &mut mpsc::UnboundedReceiver<TransportEnvelope>,
) -> TransportEnvelope {
    let envelope = timeout(WAIT, events.recv())
        .await
        .expect("Timed out waiting for a transport event")
        .expect("Connector dropped");
    controller.handle_transport(envelope.clone(), std::time::Instant::now());
    envelope
}
