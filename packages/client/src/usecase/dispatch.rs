//! UseCase: 受信イベントのディスパッチテーブル
//!
//! イベント名 → デコーダの対応表。ビューやトランスポートに依存しないため、
//! 単体でテストできます。

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    domain::InboundEvent,
    error::DispatchError,
    infrastructure::dto::event::{MembersDto, MessageDto, SystemDto, TypingDto},
};

type Decoder = fn(&str, Value) -> Result<InboundEvent, DispatchError>;

/// 受信イベントのディスパッチテーブル
pub struct InboundDispatcher {
    routes: HashMap<&'static str, Decoder>,
}

impl InboundDispatcher {
    /// サーバーが送る全イベントを登録したテーブルを作成
    pub fn new() -> Self {
        let mut routes: HashMap<&'static str, Decoder> = HashMap::new();
        routes.insert("message", decode_as::<MessageDto>);
        routes.insert("system", decode_as::<SystemDto>);
        routes.insert("members", decode_as::<MembersDto>);
        routes.insert("typing", decode_as::<TypingDto>);
        routes.insert("stop_typing", |_, _| Ok(InboundEvent::StopTyping));
        Self { routes }
    }

    /// 登録済みのイベント名
    pub fn event_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }

    /// イベントをデコード
    ///
    /// # Returns
    ///
    /// * `Ok(InboundEvent)` - デコード結果
    /// * `Err(DispatchError)` - 未登録のイベント名、またはペイロード不正
    pub fn decode(&self, name: &str, payload: Value) -> Result<InboundEvent, DispatchError> {
        let decoder = self
            .routes
            .get(name)
            .ok_or_else(|| DispatchError::UnknownEvent(name.to_string()))?;
        decoder(name, payload)
    }
}

impl Default for InboundDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_as<T>(name: &str, payload: Value) -> Result<InboundEvent, DispatchError>
where
    T: DeserializeOwned + Into<InboundEvent>,
{
    serde_json::from_value::<T>(payload)
        .map(Into::into)
        .map_err(|source| DispatchError::Malformed {
            event: name.to_string(),
            source,
        })
}
