//! UseCase: 入力中通知のデバウンス
//!
//! 編集のたびにタイマーを張り直し、一定時間編集がなければ一度だけ発火します。
//! 時刻は呼び出し側から渡されるため、実時間を待たずにテストできます。

use std::time::{Duration, Instant};

/// 既定の無入力期間
pub const TYPING_TIMEOUT: Duration = Duration::from_millis(1200);

/// 入力中通知のデバウンスタイマー（同時に保留できるのは 1 つだけ）
#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl TypingDebouncer {
    /// 新しい TypingDebouncer を作成
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// 保留中のタイマーを破棄してから張り直す
    pub fn rearm(&mut self, now: Instant) {
        self.cancel();
        self.deadline = Some(now + self.timeout);
    }

    /// 保留中のタイマーを破棄
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// 期限を過ぎていれば `true` を返してタイマーを消費する
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// 保留中のタイマーの期限
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(TYPING_TIMEOUT)
    }
}
