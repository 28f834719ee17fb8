//! UseCase: チャットセッションの制御
//!
//! ## このモジュールの役割
//! - 接続のトグル（接続 / 退出）とトランスポートの世代管理
//! - 受信イベントの反映（メッセージ、メンバー、入力中ラベル）
//! - 送信操作（テキスト、画像、入力中通知）
//! - 非アクティブ時の通知（サウンド、未読数、デスクトップ通知、アイコン点滅）
//!
//! ## 設計
//! - 同期的な状態機械です。ランタイムループが受信イベント・ユーザー入力・
//!   タイマー期限を到着順に渡します。
//! - タイマーは期限として保持し、`next_deadline()` と `tick(now)` で駆動します。
//!   そのためテストでは実時間を待たずに時刻を進められます。
//! - 古い世代のトランスポートから届いたイベントは無視します。

use std::time::{Duration, Instant};

use crate::{
    domain::{
        Attachment, ChatMessage, Connector, DesktopNotification, IconState, InboundEvent,
        MemberList, MessageLog, MessageText, NotificationPermission, Notifier, OutboundEvent,
        Platform, RoomName, Session, SoundPlayer, Timestamp, Transport, TransportEnvelope,
        TransportEvent, TypingIndicator, Username, View,
    },
    error::ClientError,
};

use super::{
    attention::{Attention, FLASH_INTERVAL},
    dispatch::InboundDispatcher,
    typing::{TYPING_TIMEOUT, TypingDebouncer},
};

/// 既定のウィンドウタイトル
pub const DEFAULT_TITLE: &str = "LAN Chat";

/// セッションの設定値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// 未読がないときのタイトル
    pub title: String,
    /// 入力中通知を止めるまでの無入力期間
    pub typing_timeout: Duration,
    /// アイコン点滅の間隔
    pub flash_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            typing_timeout: TYPING_TIMEOUT,
            flash_interval: FLASH_INTERVAL,
        }
    }
}

/// チャットセッションのコントローラー
///
/// セッションの可変状態はすべてこの構造体のフィールドに置きます。
pub struct SessionController {
    settings: SessionSettings,
    view: Box<dyn View>,
    notifier: Box<dyn Notifier>,
    sound: Box<dyn SoundPlayer>,
    connector: Box<dyn Connector>,
    dispatcher: InboundDispatcher,
    /// ユーザー名入力欄の値
    username_field: String,
    /// ルーム名入力欄の値
    room_field: String,
    /// 送信前の入力内容
    draft: String,
    session: Option<Session>,
    transport: Option<Box<dyn Transport>>,
    /// 最後に開いたトランスポートの世代
    generation: u64,
    log: MessageLog,
    members: MemberList,
    typing: TypingIndicator,
    debouncer: TypingDebouncer,
    attention: Attention,
}

impl SessionController {
    /// 新しい SessionController を作成
    ///
    /// # Arguments
    ///
    /// * `settings` - タイトルとタイマーの設定
    /// * `platform` - ビュー・通知・サウンドのホスト実装
    /// * `connector` - トランスポートを開くコネクター
    pub fn new(
        settings: SessionSettings,
        platform: Platform,
        connector: Box<dyn Connector>,
    ) -> Self {
        let debouncer = TypingDebouncer::new(settings.typing_timeout);
        let attention = Attention::new(settings.flash_interval);
        let Platform {
            view,
            notifier,
            sound,
        } = platform;

        Self {
            settings,
            view,
            notifier,
            sound,
            connector,
            dispatcher: InboundDispatcher::new(),
            username_field: String::new(),
            room_field: String::new(),
            draft: String::new(),
            session: None,
            transport: None,
            generation: 0,
            log: MessageLog::default(),
            members: MemberList::default(),
            typing: TypingIndicator::default(),
            debouncer,
            attention,
        }
    }

    /// ユーザー名入力欄を更新（次の接続から有効）
    pub fn set_username(&mut self, raw: &str) {
        self.username_field = raw.to_string();
    }

    /// ルーム名入力欄を更新（次の接続から有効）
    pub fn set_room(&mut self, raw: &str) {
        self.room_field = raw.to_string();
    }

    /// 接続をトグル
    ///
    /// 接続中なら退出します。未接続なら入力欄の値で新しいトランスポートを開きます。
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 退出した、または接続を開始した
    /// * `Err(ClientError::InvalidField)` - ユーザー名またはルーム名が長すぎる
    pub fn connect(&mut self) -> Result<(), ClientError> {
        if self.is_connected() {
            self.disconnect();
            return Ok(());
        }

        let username = Username::resolve(&self.username_field)?;
        let room = RoomName::resolve(&self.room_field)?;

        self.ensure_notification_permission();

        // 接続待ちのトランスポートがあれば捨てる
        if let Some(mut old) = self.transport.take() {
            old.close();
        }

        self.generation += 1;
        tracing::info!(
            generation = self.generation,
            username = %username,
            room = %room,
            "Connecting"
        );
        self.transport = Some(self.connector.open(self.generation));
        self.session = Some(Session::new(username, room, self.generation));
        Ok(())
    }

    /// 明示的に退出
    ///
    /// `leave` を送ってからトランスポートを閉じます。
    pub fn disconnect(&mut self) {
        let was_connected = self.is_connected();
        if let Some(mut transport) = self.transport.take() {
            if was_connected {
                transport.emit(OutboundEvent::Leave);
            }
            transport.close();
            tracing::info!(generation = self.generation, "Left the room");
        }
        self.session = None;
        self.debouncer.cancel();
        self.attention.flasher_mut().stop();
        self.view.set_icon(IconState::Original);
        self.view.show_connection(false);
    }

    /// 終了時の後始末
    pub fn shutdown(&mut self) {
        if self.transport.is_some() {
            self.disconnect();
        }
    }

    /// 入力内容が編集された（Enter 以外）
    pub fn input_changed(&mut self, text: &str, now: Instant) {
        self.draft = text.to_string();
        if !self.is_connected() {
            return;
        }
        self.emit(OutboundEvent::Typing);
        self.debouncer.rearm(now);
    }

    /// Enter で入力内容を確定して送信
    pub fn submit(&mut self, text: &str) {
        self.draft = text.to_string();
        self.send();
    }

    /// 現在の入力内容を送信
    ///
    /// 未接続、または空白のみの入力なら何もしません。
    pub fn send(&mut self) {
        if !self.is_connected() {
            return;
        }
        let Ok(text) = MessageText::new(&self.draft) else {
            return;
        };
        self.emit(OutboundEvent::Message {
            text: text.into_string(),
        });
        self.draft.clear();
        self.emit(OutboundEvent::StopTyping);
        self.debouncer.cancel();
    }

    /// 画像を送信
    ///
    /// # Returns
    ///
    /// 送信した場合は `true`（未接続、または画像以外なら `false`）
    pub fn send_image(&mut self, attachment: Attachment) -> bool {
        if !self.is_connected() {
            return false;
        }
        if !attachment.is_image() {
            tracing::debug!(
                filename = attachment.filename(),
                media_type = attachment.media_type(),
                "Not an image; skipping"
            );
            return false;
        }
        let (filename, data) = attachment.into_parts();
        tracing::debug!(filename = %filename, bytes = data.len(), "Sending image");
        self.emit(OutboundEvent::Image { filename, data });
        true
    }

    /// 貼り付け: 最初の画像だけを送信
    pub fn paste(&mut self, attachments: Vec<Attachment>) -> usize {
        match attachments.into_iter().find(Attachment::is_image) {
            Some(image) => usize::from(self.send_image(image)),
            None => 0,
        }
    }

    /// ドロップ: すべての画像を送信
    pub fn drop_files(&mut self, attachments: Vec<Attachment>) -> usize {
        attachments
            .into_iter()
            .map(|attachment| self.send_image(attachment))
            .filter(|sent| *sent)
            .count()
    }

    /// ウィンドウの可視状態が変わった
    pub fn set_window_active(&mut self, active: bool) {
        if !active {
            self.attention.deactivate();
            return;
        }
        self.attention.activate();
        self.view.set_title(&self.settings.title);
        self.view.set_icon(IconState::Original);
    }

    /// トランスポートからのイベントを反映
    pub fn handle_transport(&mut self, envelope: TransportEnvelope, now: Instant) {
        if envelope.generation != self.generation || self.transport.is_none() {
            tracing::debug!(
                generation = envelope.generation,
                current = self.generation,
                "Ignoring event from stale transport"
            );
            return;
        }

        match envelope.event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Event { name, payload } => {
                match self.dispatcher.decode(&name, payload) {
                    Ok(event) => self.apply(event, now),
                    Err(e) => tracing::warn!("Ignoring inbound event: {}", e),
                }
            }
            TransportEvent::Disconnected => self.on_disconnected(),
        }
    }

    /// タイマー期限の処理
    pub fn tick(&mut self, now: Instant) {
        if self.debouncer.poll(now) && self.is_connected() {
            self.emit(OutboundEvent::StopTyping);
        }
        if let Some(icon) = self.attention.flasher_mut().poll(now) {
            self.view.set_icon(icon);
        }
    }

    /// 次にタイマーが発火する時刻
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debouncer.deadline(), self.attention.flasher().deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// 接続済みかどうか
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.connected)
    }

    /// 現在のセッション
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// 最後に開いたトランスポートの世代
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 表示中のメッセージ
    pub fn messages(&self) -> &[ChatMessage] {
        self.log.messages()
    }

    /// 表示中のメンバー一覧
    pub fn members(&self) -> &[String] {
        self.members.members()
    }

    /// 表示中の入力中ラベル
    pub fn typing_label(&self) -> Option<&str> {
        self.typing.label()
    }

    /// 未読数
    pub fn unread(&self) -> u32 {
        self.attention.unread()
    }

    /// 送信前の入力内容
    pub fn draft(&self) -> &str {
        &self.draft
    }

    fn on_connected(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.connected = true;
        let join = OutboundEvent::Join {
            username: session.username.as_str().to_string(),
            room: session.room.as_str().to_string(),
        };
        tracing::info!(generation = self.generation, "Connected");

        self.view.show_connection(true);
        self.log.clear();
        self.view.clear_messages();
        self.emit(join);
    }

    fn on_disconnected(&mut self) {
        tracing::info!(generation = self.generation, "Disconnected");
        self.session = None;
        self.transport = None;
        self.debouncer.cancel();
        self.view.show_connection(false);
    }

    fn apply(&mut self, event: InboundEvent, now: Instant) {
        match event {
            InboundEvent::Message {
                username,
                text,
                kind,
                timestamp,
            } => {
                let Some(session) = self.session.as_ref() else {
                    return;
                };
                let message = ChatMessage::from_author(
                    &session.username,
                    username,
                    text,
                    kind,
                    Timestamp::new(timestamp),
                );
                self.view.append_message(&message);
                let message = self.log.push(message).clone();
                if !self.attention.is_active() && message.wants_attention() {
                    self.alert(&message, now);
                }
            }
            InboundEvent::System { message, timestamp } => {
                let message = ChatMessage::system(message, Timestamp::new(timestamp));
                self.view.append_message(&message);
                self.log.push(message);
            }
            InboundEvent::Members(members) => {
                self.members.replace(members);
                self.view.show_members(self.members.members());
            }
            InboundEvent::Typing { username } => {
                self.typing.set(&username);
                self.view.show_typing(self.typing.label());
            }
            InboundEvent::StopTyping => {
                self.typing.clear();
                self.view.show_typing(None);
            }
        }
    }

    fn alert(&mut self, message: &ChatMessage, now: Instant) {
        if let Err(e) = self.sound.play() {
            tracing::debug!("Notification sound unavailable: {}", e);
        }

        let unread = self.attention.record_unread(now);
        self.view
            .set_title(&format!("({unread}) {}", self.settings.title));

        if self.notifier.permission() == NotificationPermission::Granted {
            self.notifier
                .show(&DesktopNotification::for_message(message));
        }
    }

    fn ensure_notification_permission(&mut self) {
        match self.notifier.permission() {
            NotificationPermission::Default => {
                tracing::debug!("Requesting notification permission");
                self.notifier.request_permission();
            }
            NotificationPermission::Granted => {}
            NotificationPermission::Denied => {
                tracing::info!("Notification permission denied");
            }
            NotificationPermission::Unsupported => {
                tracing::info!("Desktop notifications are not supported");
            }
        }
    }

    fn emit(&mut self, event: OutboundEvent) {
        if let Some(transport) = self.transport.as_mut() {
            transport.emit(event);
        }
    }
}
