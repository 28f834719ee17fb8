//! Line input.
//!
//! `rustyline` owns the terminal line on a blocking task. A helper sees
//! every redraw of the line, which is how draft edits are observed before
//! Enter is pressed.

use std::{cell::RefCell, path::PathBuf};

use rustyline::{
    Context, Editor, ExternalPrinter, Helper, completion::Completer, error::ReadlineError,
    highlight::Highlighter, hint::Hinter, history::DefaultHistory, validate::Validator,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::error::ClientError;

const PROMPT: &str = "> ";

/// Help shown by `/help`.
pub const HELP: &str = "\
Commands:
  /connect          connect, or leave when connected
  /leave            leave the room
  /name <name>      username for the next connect (blank: Guest)
  /room <room>      room for the next connect (blank: public)
  /paste <path>     send the file if it is an image
  /drop <path>...   send every image among the files
  /away, /back      mark the window inactive / active
  /help             show this help
  /quit             leave and exit
Anything else is sent as a message.";

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// The line was edited but not submitted
    Draft(String),
    /// Enter on a plain line
    Submit(String),
    /// `/connect`
    Connect,
    /// `/leave`
    Leave,
    /// `/name <name>`
    Name(String),
    /// `/room <room>`
    Room(String),
    /// `/paste <path>`
    Paste(PathBuf),
    /// `/drop <path>...`
    Drop(Vec<PathBuf>),
    /// `/away`
    Away,
    /// `/back`
    Back,
    /// `/help`
    Help,
    /// `/quit`, Ctrl-C or Ctrl-D
    Quit,
    /// A command nobody knows
    Unknown(String),
}

/// Interpret a submitted line.
pub fn parse(line: &str) -> UserInput {
    let Some(command) = line.trim_start().strip_prefix('/') else {
        return UserInput::Submit(line.to_string());
    };
    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command.trim_end(), ""),
    };

    match name {
        "connect" => UserInput::Connect,
        "leave" => UserInput::Leave,
        "name" => UserInput::Name(rest.to_string()),
        "room" => UserInput::Room(rest.to_string()),
        "paste" if !rest.is_empty() => UserInput::Paste(PathBuf::from(rest)),
        "drop" if !rest.is_empty() => {
            UserInput::Drop(rest.split_whitespace().map(PathBuf::from).collect())
        }
        "away" => UserInput::Away,
        "back" => UserInput::Back,
        "help" => UserInput::Help,
        "quit" | "exit" => UserInput::Quit,
        _ => UserInput::Unknown(format!("/{name}")),
    }
}

/// Reports draft edits as the line is redrawn.
pub struct TypingHelper {
    tx: mpsc::UnboundedSender<UserInput>,
    last: RefCell<String>,
}

impl TypingHelper {
    /// Create a helper reporting into `tx`.
    pub fn new(tx: mpsc::UnboundedSender<UserInput>) -> Self {
        Self {
            tx,
            last: RefCell::new(String::new()),
        }
    }

    /// Record the current line; send a draft if it changed.
    ///
    /// Deleting the last character is a draft edit too. Commands are not
    /// drafts.
    fn observe(&self, line: &str) {
        let mut last = self.last.borrow_mut();
        if *last == line {
            return;
        }
        *last = line.to_string();
        if line.starts_with('/') {
            return;
        }
        if self.tx.send(UserInput::Draft(line.to_string())).is_err() {
            tracing::trace!("Input receiver gone");
        }
    }

    /// Forget the submitted line, so the fresh empty prompt is no edit.
    fn reset(&self) {
        self.last.borrow_mut().clear();
    }
}

impl Completer for TypingHelper {
    type Candidate = String;
}

impl Hinter for TypingHelper {
    type Hint = String;

    fn hint(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        self.observe(line);
        None
    }
}

impl Highlighter for TypingHelper {}

impl Validator for TypingHelper {}

impl Helper for TypingHelper {}

/// Printer that writes above the prompt while a line is being edited.
pub type PromptPrinter = Box<dyn ExternalPrinter + Send>;

/// Read lines on a blocking task until the user quits.
///
/// Every edit is sent as [`UserInput::Draft`], every submitted line as the
/// parsed [`UserInput`]. Ctrl-C, Ctrl-D and editor failures end with
/// [`UserInput::Quit`]; an editor failure is also the task's result.
///
/// The returned receiver yields the editor's printer once the editor is up,
/// or `None` when the terminal has none (not a tty).
pub fn spawn_input(
    tx: mpsc::UnboundedSender<UserInput>,
) -> (
    JoinHandle<Result<(), ClientError>>,
    oneshot::Receiver<Option<PromptPrinter>>,
) {
    let (printer_tx, printer_rx) = oneshot::channel();
    let handle = tokio::task::spawn_blocking(move || {
        let result = read_lines(&tx, printer_tx);
        if tx.send(UserInput::Quit).is_err() {
            tracing::trace!("Input receiver gone");
        }
        result
    });
    (handle, printer_rx)
}

fn read_lines(
    tx: &mpsc::UnboundedSender<UserInput>,
    printer_tx: oneshot::Sender<Option<PromptPrinter>>,
) -> Result<(), ClientError> {
    let mut editor: Editor<TypingHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(TypingHelper::new(tx.clone())));

    let printer = match editor.create_external_printer() {
        Ok(printer) => Some(Box::new(printer) as PromptPrinter),
        Err(e) => {
            tracing::debug!("No external printer, writing to stdout: {}", e);
            None
        }
    };
    if printer_tx.send(printer).is_err() {
        tracing::trace!("Printer receiver gone");
    }

    loop {
        let read = editor.readline(PROMPT);
        if let Some(helper) = editor.helper() {
            helper.reset();
        }
        match read {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.as_str())?;
                }
                let input = parse(&line);
                let quit = input == UserInput::Quit;
                if tx.send(input).is_err() || quit {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(e) => {
                tracing::error!("Line editor failed: {}", e);
                return Err(e.into());
            }
        }
    }
}
