//! UseCase: 非アクティブ時の未読数とアイコン点滅
//!
//! ウィンドウが非アクティブな間に届いたメッセージを数え、アイコンを点滅させます。
//! アクティブに戻ると未読数は 0 に戻り、点滅は止まります。

use std::time::{Duration, Instant};

use crate::domain::IconState;

/// 既定の点滅間隔
pub const FLASH_INTERVAL: Duration = Duration::from_millis(800);

/// アイコン点滅のインターバルタイマー
#[derive(Debug, Clone)]
pub struct Flasher {
    interval: Duration,
    next_toggle: Option<Instant>,
    icon: IconState,
}

impl Flasher {
    /// 新しい Flasher を作成
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_toggle: None,
            icon: IconState::Original,
        }
    }

    /// 点滅を開始（すでに点滅中なら何もしない）
    pub fn start(&mut self, now: Instant) {
        if self.next_toggle.is_some() {
            return;
        }
        self.next_toggle = Some(now + self.interval);
    }

    /// 点滅を停止し、アイコンを元に戻す
    pub fn stop(&mut self) {
        self.next_toggle = None;
        self.icon = IconState::Original;
    }

    /// 切り替え時刻を過ぎていれば、切り替え後のアイコンを返す
    pub fn poll(&mut self, now: Instant) -> Option<IconState> {
        let due = self.next_toggle?;
        if now < due {
            return None;
        }
        self.icon = self.icon.toggled();
        self.next_toggle = Some(now + self.interval);
        Some(self.icon)
    }

    /// 点滅中かどうか
    pub fn is_flashing(&self) -> bool {
        self.next_toggle.is_some()
    }

    /// 次の切り替え時刻
    pub fn deadline(&self) -> Option<Instant> {
        self.next_toggle
    }

    /// 現在のアイコン
    pub fn icon(&self) -> IconState {
        self.icon
    }
}

/// ウィンドウの可視状態と未読数
#[derive(Debug, Clone)]
pub struct Attention {
    window_active: bool,
    unread: u32,
    flasher: Flasher,
}

impl Attention {
    /// アクティブ・未読 0 の状態で作成
    pub fn new(flash_interval: Duration) -> Self {
        Self {
            window_active: true,
            unread: 0,
            flasher: Flasher::new(flash_interval),
        }
    }

    /// ウィンドウがアクティブかどうか
    pub fn is_active(&self) -> bool {
        self.window_active
    }

    /// 非アクティブにする
    pub fn deactivate(&mut self) {
        self.window_active = false;
    }

    /// アクティブにする: 未読数を 0 に戻し、点滅を止める
    pub fn activate(&mut self) {
        self.window_active = true;
        self.unread = 0;
        self.flasher.stop();
    }

    /// 未読を 1 件追加して点滅を開始し、新しい未読数を返す
    pub fn record_unread(&mut self, now: Instant) -> u32 {
        self.unread += 1;
        self.flasher.start(now);
        self.unread
    }

    /// 未読数
    pub fn unread(&self) -> u32 {
        self.unread
    }

    /// 点滅タイマー
    pub fn flasher(&self) -> &Flasher {
        &self.flasher
    }

    /// 点滅タイマー（可変）
    pub fn flasher_mut(&mut self) -> &mut Flasher {
        &mut self.flasher
    }
}

impl Default for Attention {
    fn default() -> Self {
        Self::new(FLASH_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flasher_alternates_icon() {
        // テスト項目: 点滅中はアイコンが間隔ごとに交互に切り替わる
        // given (前提条件):
        let start = Instant::now();
        let mut flasher = Flasher::new(FLASH_INTERVAL);
        flasher.start(start);

        // when / then:
        assert_eq!(flasher.poll(start + Duration::from_millis(799)), None);
        let first = start + FLASH_INTERVAL;
        assert_eq!(flasher.poll(first), Some(IconState::Blank));
        assert_eq!(flasher.poll(first + FLASH_INTERVAL), Some(IconState::Original));
    }

    #[test]
    fn test_flasher_start_twice_keeps_schedule() {
        // テスト項目: 点滅中に再度 start しても予定は変わらない
        let start = Instant::now();
        let mut flasher = Flasher::new(FLASH_INTERVAL);
        flasher.start(start);
        flasher.start(start + Duration::from_millis(500));

        assert_eq!(flasher.deadline(), Some(start + FLASH_INTERVAL));
    }

    #[test]
    fn test_flasher_stop_restores_icon() {
        // テスト項目: 停止するとアイコンが元に戻る
        let start = Instant::now();
        let mut flasher = Flasher::new(FLASH_INTERVAL);
        flasher.start(start);
        flasher.poll(start + FLASH_INTERVAL);
        assert_eq!(flasher.icon(), IconState::Blank);

        flasher.stop();

        assert_eq!(flasher.icon(), IconState::Original);
        assert!(!flasher.is_flashing());
        assert_eq!(flasher.poll(start + Duration::from_secs(10)), None);
    }

    #[test]
    fn test_attention_counts_and_resets() {
        // テスト項目: 未読数が数えられ、アクティブ化で 0 に戻る
        let now = Instant::now();
        let mut attention = Attention::default();
        attention.deactivate();

        assert_eq!(attention.record_unread(now), 1);
        assert_eq!(attention.record_unread(now), 2);
        assert!(attention.flasher().is_flashing());

        attention.activate();

        assert!(attention.is_active());
        assert_eq!(attention.unread(), 0);
        assert!(!attention.flasher().is_flashing());
    }
}
