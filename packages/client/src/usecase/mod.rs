//! UseCase 層
//!
//! セッションの振る舞いを実装するレイヤー。
//! UI 層（ランタイムループ）から呼び出され、Domain 層の状態とポートを操作します。

pub mod attention;
pub mod dispatch;
pub mod session;
pub mod typing;

pub use attention::{Attention, Flasher};
pub use dispatch::InboundDispatcher;
pub use session::{SessionController, SessionSettings};
pub use typing::TypingDebouncer;
