//! Runtime loop.
//!
//! Feeds the session controller, strictly in arrival order, with transport
//! events, user input and timer deadlines.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    config::ClientConfig,
    domain::{Attachment, TransportEnvelope, TransportEvent},
    error::ClientError,
    infrastructure::transport::WebSocketConnector,
    usecase::SessionController,
};

use super::{
    input::{self, HELP, UserInput},
    terminal::{self, Console},
};

/// How long to wait for the connection to flush `leave` on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Run the terminal client until the user quits.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();

    let connector = WebSocketConnector::new(&config.server, transport_tx);
    tracing::info!("Chat server endpoint: {}", connector.endpoint());

    let (input, printer) = input::spawn_input(input_tx);
    let console = Console::new(printer.await.ok().flatten());

    let mut controller = SessionController::new(
        config.session.clone(),
        terminal::platform(&config, &console),
        Box::new(connector),
    );
    controller.set_username(&config.username);
    controller.set_room(&config.room);

    console.notice("LAN Chat. Type /help for commands.");
    if config.connect_on_start {
        connect(&mut controller, &console);
    }

    loop {
        let deadline = controller.next_deadline();
        tokio::select! {
            Some(envelope) = transport_rx.recv() => {
                controller.handle_transport(envelope, Instant::now());
            }
            input = input_rx.recv() => match input {
                None | Some(UserInput::Quit) => break,
                Some(input) => handle_input(&mut controller, &console, input).await,
            },
            _ = wait_until(deadline) => controller.tick(Instant::now()),
        }
    }

    let generation = controller.generation();
    let was_open = controller.session().is_some();
    controller.shutdown();
    if was_open {
        wait_for_close(&mut transport_rx, generation).await;
    }
    join_input(input).await?;
    tracing::info!("Bye");
    Ok(())
}

async fn handle_input(controller: &mut SessionController, console: &Console, input: UserInput) {
    match input {
        UserInput::Draft(text) => controller.input_changed(&text, Instant::now()),
        UserInput::Submit(text) => controller.submit(&text),
        UserInput::Connect => connect(controller, console),
        UserInput::Leave => controller.disconnect(),
        UserInput::Name(name) => {
            controller.set_username(&name);
            console.notice("Username set; it applies on the next /connect.");
        }
        UserInput::Room(room) => {
            controller.set_room(&room);
            console.notice("Room set; it applies on the next /connect.");
        }
        UserInput::Paste(path) => {
            let attachments = read_attachments(vec![path], console).await;
            if controller.paste(attachments) == 0 {
                console.notice("Nothing sent (not connected, or not an image).");
            }
        }
        UserInput::Drop(paths) => {
            let attachments = read_attachments(paths, console).await;
            if controller.drop_files(attachments) == 0 {
                console.notice("Nothing sent (not connected, or no images).");
            }
        }
        UserInput::Away => controller.set_window_active(false),
        UserInput::Back => controller.set_window_active(true),
        UserInput::Help => console.notice(HELP),
        UserInput::Unknown(command) => {
            console.notice(&format!("Unknown command {command}. Try /help."));
        }
        UserInput::Quit => {}
    }
}

fn connect(controller: &mut SessionController, console: &Console) {
    if let Err(e) = controller.connect() {
        tracing::warn!("Connect rejected: {}", e);
        console.notice(&format!("Cannot connect: {e}"));
    }
}

async fn read_attachments(paths: Vec<PathBuf>, console: &Console) -> Vec<Attachment> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                console.notice(&format!("Cannot read {}: {e}", path.display()));
                continue;
            }
        };
        match Attachment::new(&path.to_string_lossy(), data) {
            Ok(attachment) => attachments.push(attachment),
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    attachments
}

/// The input task's own result, or how it died.
async fn join_input(input: JoinHandle<Result<(), ClientError>>) -> Result<(), ClientError> {
    input.await?
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

async fn wait_for_close(
    transport_rx: &mut mpsc::UnboundedReceiver<TransportEnvelope>,
    generation: u64,
) {
    let closed = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while let Some(envelope) = transport_rx.recv().await {
            if envelope.generation == generation && envelope.event == TransportEvent::Disconnected
            {
                return;
            }
        }
    })
    .await;

    if closed.is_err() {
        tracing::debug!("Connection did not close within {:?}", SHUTDOWN_GRACE);
    }
}
