//! Terminal implementations of the host ports.
//!
//! Messages are written as plain lines. The window title and icon name use
//! the xterm OSC 2 / OSC 1 sequences, desktop notifications OSC 9, and the
//! notification sound is the terminal bell. Every escape sequence can be
//! switched off for terminals that print them literally.
//!
//! While the line editor owns the prompt, complete lines are handed to its
//! external printer so they land above the prompt instead of over it.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

use rustyline::ExternalPrinter;

use crate::{
    config::ClientConfig,
    domain::{
        ChatMessage, DesktopNotification, IconState, MessageKind, NotificationPermission,
        Notifier, Platform, SoundPlayer, View,
    },
    error::PlatformError,
};

/// Terminal output shared by the host implementations.
pub type Output = Box<dyn Write + Send>;

const ESC: &str = "\x1b";
const BEL: &str = "\x07";

/// Printer of the line editor, shared by every writer.
pub type SharedPrinter = Arc<Mutex<Box<dyn ExternalPrinter + Send>>>;

/// Where terminal output goes.
#[derive(Clone)]
pub enum Console {
    /// Straight to stdout
    Stdout,
    /// Above the line editor's prompt
    Prompt(SharedPrinter),
}

impl Console {
    /// Use the editor's printer when there is one.
    pub fn new(printer: Option<Box<dyn ExternalPrinter + Send>>) -> Self {
        match printer {
            Some(printer) => Self::Prompt(Arc::new(Mutex::new(printer))),
            None => Self::Stdout,
        }
    }

    /// A fresh writer to this console.
    pub fn output(&self) -> Output {
        match self {
            Self::Stdout => Box::new(io::stdout()),
            Self::Prompt(printer) => Box::new(PromptWriter::new(printer.clone(), io::stdout())),
        }
    }

    /// Print a local notice (command feedback, help).
    pub fn notice(&self, text: &str) {
        let mut out = self.output();
        if writeln!(out, "* {text}").and_then(|_| out.flush()).is_err() {
            tracing::debug!("Terminal unavailable for notice");
        }
    }
}

/// Writes complete lines through the editor's printer.
///
/// A trailing partial line (escape sequences, the bell) does not move the
/// cursor, so it goes to `raw` directly.
pub struct PromptWriter<W> {
    printer: SharedPrinter,
    raw: W,
    pending: Vec<u8>,
}

impl<W: Write> PromptWriter<W> {
    /// Create a writer printing through `printer`, with `raw` for partial lines.
    pub fn new(printer: SharedPrinter, raw: W) -> Self {
        Self {
            printer,
            raw,
            pending: Vec::new(),
        }
    }
}

impl<W: Write> Write for PromptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let split = self
            .pending
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let rest = self.pending.split_off(split);
        let lines = std::mem::take(&mut self.pending);

        if !lines.is_empty() {
            let text = String::from_utf8_lossy(&lines).into_owned();
            let mut printer = self
                .printer
                .lock()
                .map_err(|_| io::Error::other("terminal printer poisoned"))?;
            printer
                .print(text)
                .map_err(|e| io::Error::other(e.to_string()))?;
        }
        if !rest.is_empty() {
            self.raw.write_all(&rest)?;
        }
        self.raw.flush()
    }
}

/// Drop control characters from server-supplied text.
///
/// Newlines survive; every other C0, DEL and C1 character (ESC, BEL, CSI...)
/// is removed.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

/// Like [`sanitize`], for text that must stay inside one escape sequence.
fn single_line(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Build the terminal [`Platform`] writing to `console`.
pub fn platform(config: &ClientConfig, console: &Console) -> Platform {
    let permission = if config.escapes {
        config.notifications.initial_permission()
    } else {
        NotificationPermission::Unsupported
    };

    Platform {
        view: Box::new(TerminalView::new(
            console.output(),
            &config.server,
            &config.session.title,
            config.escapes,
        )),
        notifier: Box::new(TerminalNotifier::new(console.output(), permission)),
        sound: Box::new(BellSound::new(console.output(), config.escapes)),
    }
}

/// Renders the session as terminal lines.
pub struct TerminalView {
    out: Output,
    /// Server base URL, for image links
    server: String,
    /// Icon name shown while not blank
    icon_name: String,
    escapes: bool,
    /// Last typing label printed
    typing: Option<String>,
}

impl TerminalView {
    /// Create a view.
    ///
    /// # Arguments
    ///
    /// * `out` - Where lines are written
    /// * `server` - Server base URL; relative image paths are resolved against it
    /// * `icon_name` - Icon name restored when flashing stops
    /// * `escapes` - Whether OSC / clear-screen sequences may be written
    pub fn new(out: Output, server: &str, icon_name: &str, escapes: bool) -> Self {
        Self {
            out,
            server: server.trim_end_matches('/').to_string(),
            icon_name: icon_name.to_string(),
            escapes,
            typing: None,
        }
    }

    fn image_url(&self, body: &str) -> String {
        if body.starts_with("http://") || body.starts_with("https://") {
            body.to_string()
        } else if body.starts_with('/') {
            format!("{}{}", self.server, body)
        } else {
            format!("{}/{}", self.server, body)
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            tracing::debug!("Terminal write failed: {}", e);
        }
    }

    /// Write one line of possibly remote text; control characters are dropped.
    fn line(&mut self, text: &str) {
        self.write(&format!("{}\n", sanitize(text)));
    }

    fn osc(&mut self, code: u8, text: &str) {
        if self.escapes {
            self.write(&format!("{ESC}]{code};{}{BEL}", single_line(text)));
        }
    }
}

impl View for TerminalView {
    fn append_message(&mut self, message: &ChatMessage) {
        if message.is_system {
            self.line(&format!("[System] {}", message.body));
            return;
        }

        let author = if message.is_self {
            format!("{} (you)", message.author)
        } else {
            message.author.clone()
        };
        let body = match message.kind {
            MessageKind::Text => message.body.clone(),
            MessageKind::Image => format!("[Image] {}", self.image_url(&message.body)),
        };
        let indent = if message.is_self { "    " } else { "" };
        self.line(&format!(
            "{indent}{author} · {}\n{indent}  {body}",
            message.sent_at.display()
        ));
    }

    fn clear_messages(&mut self) {
        if self.escapes {
            self.write(&format!("{ESC}[2J{ESC}[H"));
        } else {
            self.line("----------------------------------------");
        }
    }

    fn show_members(&mut self, members: &[String]) {
        self.line(&format!(
            "Members ({}): {}",
            members.len(),
            members.join(", ")
        ));
    }

    fn show_typing(&mut self, label: Option<&str>) {
        let label = label.map(str::to_string);
        if label == self.typing {
            return;
        }
        if let Some(text) = &label {
            self.line(&format!("  {text}"));
        }
        self.typing = label;
    }

    fn show_connection(&mut self, connected: bool) {
        self.line(if connected { "Connected" } else { "Disconnected" });
    }

    fn set_title(&mut self, title: &str) {
        self.osc(2, title);
    }

    fn set_icon(&mut self, icon: IconState) {
        let name = match icon {
            IconState::Original => self.icon_name.clone(),
            IconState::Blank => String::new(),
        };
        self.osc(1, &name);
    }
}

/// OSC 9 desktop notifications.
pub struct TerminalNotifier {
    out: Output,
    permission: NotificationPermission,
}

impl TerminalNotifier {
    /// Create a notifier starting with `permission`.
    pub fn new(out: Output, permission: NotificationPermission) -> Self {
        Self { out, permission }
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) {
        if self.permission != NotificationPermission::Default {
            return;
        }
        self.permission = NotificationPermission::Granted;
        tracing::info!("Notification permission granted");
        if writeln!(self.out, "Notifications are now enabled!")
            .and_then(|_| self.out.flush())
            .is_err()
        {
            tracing::debug!("Terminal write failed");
        }
    }

    fn show(&mut self, notification: &DesktopNotification) {
        if self.permission != NotificationPermission::Granted {
            return;
        }
        let text = single_line(&format!("{}: {}", notification.title, notification.body));
        if let Err(e) = write!(self.out, "{ESC}]9;{text}{BEL}").and_then(|_| self.out.flush()) {
            tracing::debug!("Notification dropped: {}", e);
        }
    }
}

/// Terminal bell.
pub struct BellSound {
    out: Output,
    enabled: bool,
}

impl BellSound {
    /// Create a bell; a disabled bell reports itself unsupported.
    pub fn new(out: Output, enabled: bool) -> Self {
        Self { out, enabled }
    }
}

impl SoundPlayer for BellSound {
    fn play(&mut self) -> Result<(), PlatformError> {
        if !self.enabled {
            return Err(PlatformError::Unsupported("terminal bell"));
        }
        self.out.write_all(BEL.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Timestamp, Username};

    /// 書き込まれたバイト列を共有するライター
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn view(escapes: bool) -> (TerminalView, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let view = TerminalView::new(
            Box::new(buffer.clone()),
            "http://192.168.1.2:2333/",
            "LAN Chat",
            escapes,
        );
        (view, buffer)
    }

    #[test]
    fn test_renders_text_image_and_system_lines() {
        // テスト項目: テキスト・画像・システムメッセージが行として描画される
        // given (前提条件):
        let (mut view, buffer) = view(true);
        let me = Username::resolve("alice").unwrap();
        let text = ChatMessage::from_author(
            &me,
            "bob".into(),
            "hello".into(),
            MessageKind::Text,
            Timestamp::new("2025-01-01T10:00:00"),
        );
        let image = ChatMessage::from_author(
            &me,
            "alice".into(),
            "/static/uploads/1.png".into(),
            MessageKind::Image,
            Timestamp::new("2025-01-01T10:00:01"),
        );
        let system = ChatMessage::system("bob joined".into(), Timestamp::new("t"));

        // when (操作):
        view.append_message(&text);
        view.append_message(&image);
        view.append_message(&system);

        // then (期待する結果):
        let out = buffer.contents();
        assert!(out.contains("bob · 2025-01-01 10:00:00\n  hello\n"));
        assert!(out.contains("alice (you) · 2025-01-01 10:00:01"));
        assert!(out.contains("[Image] http://192.168.1.2:2333/static/uploads/1.png"));
        assert!(out.contains("[System] bob joined\n"));
    }

    #[test]
    fn test_remote_control_characters_are_dropped() {
        // テスト項目: サーバー由来の文字列に含まれる制御文字は端末に書き込まれない
        // given (前提条件):
        let (mut view, buffer) = view(true);
        let me = Username::resolve("alice").unwrap();
        let message = ChatMessage::from_author(
            &me,
            "bob\x1b[2J".into(),
            "hi\x1b]2;pwned\x07".into(),
            MessageKind::Text,
            Timestamp::new("2025-01-01T10:00:00"),
        );
        let system = ChatMessage::system("\u{9b}31mjoined".into(), Timestamp::new("t"));

        // when (操作):
        view.append_message(&message);
        view.append_message(&system);
        view.show_members(&["m\x1b[31m".to_string()]);
        view.show_typing(Some("x\x1b[Hy is typing..."));

        // then (期待する結果):
        let out = buffer.contents();
        assert!(!out.contains('\x1b'));
        assert!(!out.contains('\x07'));
        assert!(!out.contains('\u{9b}'));
        assert!(out.contains("bob[2J · 2025-01-01 10:00:00\n  hi]2;pwned\n"));
        assert!(out.contains("[System] 31mjoined\n"));
        assert!(out.contains("Members (1): m[31m\n"));
        assert!(out.contains("  x[Hy is typing...\n"));
    }

    #[test]
    fn test_sanitize_keeps_newlines_and_text() {
        // テスト項目: 改行と通常の文字は残し、それ以外の制御文字だけを除く
        assert_eq!(sanitize("a\nb\tc\x7fd\r"), "a\nbcd");
        assert_eq!(sanitize("こんにちは 🐱"), "こんにちは 🐱");
    }

    /// 受け取ったメッセージを記録するプリンタ
    #[derive(Clone, Default)]
    struct RecordingPrinter(Arc<Mutex<Vec<String>>>);

    impl ExternalPrinter for RecordingPrinter {
        fn print(&mut self, msg: String) -> rustyline::Result<()> {
            self.0.lock().unwrap().push(msg);
            Ok(())
        }
    }

    #[test]
    fn test_prompt_writer_prints_complete_lines_above_prompt() {
        // テスト項目: 完結した行はプリンタ経由、改行のない残りは端末へ直接書かれる
        // given (前提条件):
        let printer = RecordingPrinter::default();
        let shared: SharedPrinter = Arc::new(Mutex::new(Box::new(printer.clone())));
        let raw = SharedBuffer::default();
        let mut writer = PromptWriter::new(shared, raw.clone());

        // when (操作):
        write!(writer, "Members (1): a\nConnec").unwrap();
        write!(writer, "ted\n\x1b]2;LAN Chat\x07").unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();

        // then (期待する結果):
        assert_eq!(
            *printer.0.lock().unwrap(),
            vec!["Members (1): a\nConnected\n".to_string()]
        );
        assert_eq!(raw.contents(), "\x1b]2;LAN Chat\x07");
    }

    #[test]
    fn test_console_notice_goes_through_printer() {
        // テスト項目: プリンタがあるときは案内もプリンタ経由で表示される
        let printer = RecordingPrinter::default();
        let console = Console::new(Some(Box::new(printer.clone())));

        console.notice("Room set");

        assert_eq!(*printer.0.lock().unwrap(), vec!["* Room set\n".to_string()]);
        assert!(matches!(Console::new(None), Console::Stdout));
    }

    #[test]
    fn test_title_and_icon_escapes() {
        // テスト項目: タイトルは OSC 2、アイコンは OSC 1 で書き込まれる
        let (mut view, buffer) = view(true);

        view.set_title("(2) LAN Chat");
        view.set_icon(IconState::Blank);
        view.set_icon(IconState::Original);

        assert_eq!(
            buffer.contents(),
            "\x1b]2;(2) LAN Chat\x07\x1b]1;\x07\x1b]1;LAN Chat\x07"
        );
    }

    #[test]
    fn test_no_escapes_mode() {
        // テスト項目: エスケープ無効時はタイトル・アイコンを書き込まない
        let (mut view, buffer) = view(false);

        view.set_title("LAN Chat");
        view.set_icon(IconState::Blank);
        view.clear_messages();

        assert!(!buffer.contents().contains('\x1b'));
    }

    #[test]
    fn test_typing_label_printed_once() {
        // テスト項目: 同じ入力中ラベルは繰り返し表示しない
        let (mut view, buffer) = view(true);

        view.show_typing(Some("bob is typing..."));
        view.show_typing(Some("bob is typing..."));
        view.show_typing(None);
        view.show_typing(Some("bob is typing..."));

        assert_eq!(buffer.contents().matches("bob is typing...").count(), 2);
    }

    #[test]
    fn test_members_and_connection() {
        // テスト項目: メンバー一覧と接続状態が表示される
        let (mut view, buffer) = view(true);

        view.show_members(&["a".to_string(), "b".to_string()]);
        view.show_connection(true);
        view.show_connection(false);

        assert_eq!(
            buffer.contents(),
            "Members (2): a, b\nConnected\nDisconnected\n"
        );
    }

    #[test]
    fn test_notifier_request_grants_default_only() {
        // テスト項目: 未決定の権限だけが要求で許可される
        let buffer = SharedBuffer::default();
        let mut notifier =
            TerminalNotifier::new(Box::new(buffer.clone()), NotificationPermission::Default);

        notifier.request_permission();
        notifier.request_permission();

        assert_eq!(notifier.permission(), NotificationPermission::Granted);
        assert_eq!(buffer.contents(), "Notifications are now enabled!\n");

        let mut denied = TerminalNotifier::new(
            Box::new(SharedBuffer::default()),
            NotificationPermission::Denied,
        );
        denied.request_permission();
        assert_eq!(denied.permission(), NotificationPermission::Denied);
    }

    #[test]
    fn test_notifier_show_writes_osc9() {
        // テスト項目: 通知は OSC 9 で書き込まれ、許可がなければ何もしない
        let buffer = SharedBuffer::default();
        let mut granted =
            TerminalNotifier::new(Box::new(buffer.clone()), NotificationPermission::Granted);
        let notification = DesktopNotification {
            title: "New message from bob".into(),
            body: "hi\x07there\x1b[2J".into(),
        };

        granted.show(&notification);
        assert_eq!(
            buffer.contents(),
            "\x1b]9;New message from bob: hithere[2J\x07"
        );

        let silent = SharedBuffer::default();
        let mut denied =
            TerminalNotifier::new(Box::new(silent.clone()), NotificationPermission::Denied);
        denied.show(&notification);
        assert!(silent.contents().is_empty());
    }

    #[test]
    fn test_bell() {
        // テスト項目: ベルは BEL を書き込み、無効時は非対応エラーになる
        let buffer = SharedBuffer::default();
        let mut bell = BellSound::new(Box::new(buffer.clone()), true);
        bell.play().unwrap();
        assert_eq!(buffer.contents(), "\x07");

        let mut muted = BellSound::new(Box::new(SharedBuffer::default()), false);
        assert!(matches!(muted.play(), Err(PlatformError::Unsupported(_))));
    }
}
