//! Socket.IO v5 packets.
//!
//! Text form: `<type>[<attachments>-][<namespace>,][<ack id>][<json>]`.
//! The default namespace `/` is omitted on the wire.

use serde_json::{Map, Value};

use super::ProtocolError;

const DEFAULT_NAMESPACE: &str = "/";
const PLACEHOLDER_KEY: &str = "_placeholder";

/// Most binary frames a single packet may announce.
pub const MAX_ATTACHMENTS: usize = 16;

/// Socket.IO packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// `0`
    Connect,
    /// `1`
    Disconnect,
    /// `2`
    Event,
    /// `3`
    Ack,
    /// `4`
    ConnectError,
    /// `5`
    BinaryEvent,
    /// `6`
    BinaryAck,
}

impl PacketType {
    fn from_char(c: char) -> Result<Self, ProtocolError> {
        let kind = match c {
            '0' => Self::Connect,
            '1' => Self::Disconnect,
            '2' => Self::Event,
            '3' => Self::Ack,
            '4' => Self::ConnectError,
            '5' => Self::BinaryEvent,
            '6' => Self::BinaryAck,
            other => return Err(ProtocolError::UnknownPacketType(other)),
        };
        Ok(kind)
    }

    fn as_char(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }

    fn is_binary(self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

/// One Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Packet type.
    pub kind: PacketType,
    /// Namespace, `/` by default.
    pub namespace: String,
    /// Acknowledgement id.
    pub id: Option<u64>,
    /// JSON payload.
    pub data: Option<Value>,
    /// Number of binary frames that follow this packet.
    pub attachments: usize,
}

impl Packet {
    fn new(kind: PacketType, data: Option<Value>) -> Self {
        Self {
            kind,
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: None,
            data,
            attachments: 0,
        }
    }

    /// Connect to the default namespace.
    pub fn connect() -> Self {
        Self::new(PacketType::Connect, None)
    }

    /// Leave the default namespace.
    pub fn disconnect() -> Self {
        Self::new(PacketType::Disconnect, None)
    }

    /// A named event with JSON arguments.
    pub fn event(name: &str, args: Vec<Value>) -> Self {
        Self::new(PacketType::Event, Some(event_array(name, args)))
    }

    /// A named event whose arguments reference `attachments` binary frames
    /// through placeholders (see [`placeholder`]).
    pub fn binary_event(name: &str, args: Vec<Value>, attachments: usize) -> Self {
        let mut packet = Self::new(PacketType::BinaryEvent, Some(event_array(name, args)));
        packet.attachments = attachments;
        packet
    }

    /// Encode into the text form.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());
        if self.kind.is_binary() {
            out.push_str(&self.attachments.to_string());
            out.push('-');
        }
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Decode the text form.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = PacketType::from_char(chars.next().ok_or(ProtocolError::Empty)?)?;
        let mut rest = chars.as_str();

        let mut attachments = 0;
        if kind.is_binary() {
            let dash = rest.find('-').ok_or(ProtocolError::MissingAttachmentCount)?;
            let count = &rest[..dash];
            if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ProtocolError::MissingAttachmentCount);
            }
            attachments = count.parse()?;
            if attachments > MAX_ATTACHMENTS {
                return Err(ProtocolError::TooManyAttachments(attachments));
            }
            rest = &rest[dash + 1..];
        }

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            match rest.find(',') {
                Some(comma) => {
                    namespace = rest[..comma].to_string();
                    rest = &rest[comma + 1..];
                }
                None => {
                    namespace = rest.to_string();
                    rest = "";
                }
            }
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            Some(rest[..digits].parse()?)
        } else {
            None
        };
        rest = &rest[digits..];

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(Self {
            kind,
            namespace,
            id,
            data,
            attachments,
        })
    }

    /// Split an event packet into its name and arguments.
    pub fn into_event(self) -> Result<(String, Vec<Value>), ProtocolError> {
        let Some(Value::Array(mut items)) = self.data else {
            return Err(ProtocolError::MissingEventName);
        };
        if items.is_empty() {
            return Err(ProtocolError::MissingEventName);
        }
        let Value::String(name) = items.remove(0) else {
            return Err(ProtocolError::MissingEventName);
        };
        Ok((name, items))
    }
}

fn event_array(name: &str, args: Vec<Value>) -> Value {
    let mut items = Vec::with_capacity(args.len() + 1);
    items.push(Value::String(name.to_string()));
    items.extend(args);
    Value::Array(items)
}

/// Placeholder standing for the `num`-th binary attachment.
pub fn placeholder(num: usize) -> Value {
    let mut map = Map::new();
    map.insert(PLACEHOLDER_KEY.to_string(), Value::Bool(true));
    map.insert("num".to_string(), Value::from(num));
    Value::Object(map)
}

/// Collects the binary frames announced by a binary packet.
#[derive(Debug)]
pub struct BinaryAssembler {
    packet: Packet,
    buffers: Vec<Vec<u8>>,
}

impl BinaryAssembler {
    /// Start collecting for `packet`.
    pub fn new(packet: Packet) -> Self {
        Self {
            packet,
            buffers: Vec::new(),
        }
    }

    /// Add the next binary frame.
    pub fn push(&mut self, buffer: Vec<u8>) {
        self.buffers.push(buffer);
    }

    /// Whether every announced frame has arrived.
    pub fn is_complete(&self) -> bool {
        self.buffers.len() >= self.packet.attachments
    }

    /// The packet with each placeholder replaced by its bytes, as a JSON
    /// array of numbers.
    pub fn finish(mut self) -> Result<Packet, ProtocolError> {
        if let Some(data) = self.packet.data.as_mut() {
            fill_placeholders(data, &self.buffers)?;
        }
        self.packet.attachments = 0;
        self.packet.kind = match self.packet.kind {
            PacketType::BinaryAck => PacketType::Ack,
            _ => PacketType::Event,
        };
        Ok(self.packet)
    }
}

fn fill_placeholders(value: &mut Value, buffers: &[Vec<u8>]) -> Result<(), ProtocolError> {
    if let Some(num) = placeholder_index(value)? {
        let buffer = buffers.get(num).ok_or(ProtocolError::BadPlaceholder)?;
        *value = Value::Array(buffer.iter().map(|b| Value::from(*b)).collect());
        return Ok(());
    }
    match value {
        Value::Object(map) => {
            for item in map.values_mut() {
                fill_placeholders(item, buffers)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                fill_placeholders(item, buffers)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn placeholder_index(value: &Value) -> Result<Option<usize>, ProtocolError> {
    let Value::Object(map) = value else {
        return Ok(None);
    };
    if map.get(PLACEHOLDER_KEY) != Some(&Value::Bool(true)) {
        return Ok(None);
    }
    let num = map
        .get("num")
        .and_then(Value::as_u64)
        .ok_or(ProtocolError::BadPlaceholder)?;
    Ok(Some(num as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_connect_and_disconnect() {
        // テスト項目: 既定の名前空間では名前空間が省略される
        assert_eq!(Packet::connect().encode(), "0");
        assert_eq!(Packet::disconnect().encode(), "1");
    }

    #[test]
    fn test_encode_event() {
        // テスト項目: イベントは名前と引数の配列として送られる
        // when (操作):
        let packet = Packet::event("join", vec![json!({"username": "alice", "room": "dev"})]);

        // then (期待する結果):
        let encoded = packet.encode();
        assert!(encoded.starts_with(r#"2["join","#));
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.data, Some(json!(["join", {"username": "alice", "room": "dev"}])));
    }

    #[test]
    fn test_encode_binary_event_with_placeholder() {
        // テスト項目: 画像イベントは添付数と placeholder 付きで送られる
        // when (操作):
        let packet = Packet::binary_event(
            "image",
            vec![json!(["cat.png", placeholder(0)])],
            1,
        );

        // then (期待する結果):
        assert_eq!(
            packet.encode(),
            r#"51-["image",["cat.png",{"_placeholder":true,"num":0}]]"#
        );
    }

    #[test]
    fn test_decode_connect_reply_with_sid() {
        // テスト項目: サーバーの接続応答を解析できる
        let packet = Packet::decode(r#"0{"sid":"xyz"}"#).unwrap();

        assert_eq!(packet.kind, PacketType::Connect);
        assert_eq!(packet.namespace, "/");
        assert_eq!(packet.data, Some(json!({"sid": "xyz"})));
    }

    #[test]
    fn test_decode_namespace_and_ack_id() {
        // テスト項目: 名前空間と ack id を含むパケットを解析できる
        let packet = Packet::decode(r#"2/admin,13["members",{"members":[]}]"#).unwrap();

        assert_eq!(packet.namespace, "/admin");
        assert_eq!(packet.id, Some(13));
        let (name, args) = packet.into_event().unwrap();
        assert_eq!(name, "members");
        assert_eq!(args, vec![json!({"members": []})]);
    }

    #[test]
    fn test_decode_event_without_arguments() {
        // テスト項目: 引数のないイベントは空の引数リストになる
        let (name, args) = Packet::decode(r#"2["stop_typing"]"#)
            .unwrap()
            .into_event()
            .unwrap();

        assert_eq!(name, "stop_typing");
        assert!(args.is_empty());
    }

    #[test]
    fn test_decode_errors() {
        // テスト項目: 不正なパケットはエラーになる
        assert!(matches!(Packet::decode(""), Err(ProtocolError::Empty)));
        assert!(matches!(
            Packet::decode("7"),
            Err(ProtocolError::UnknownPacketType('7'))
        ));
        assert!(matches!(
            Packet::decode(r#"5["x"]"#),
            Err(ProtocolError::MissingAttachmentCount)
        ));
        assert!(matches!(
            Packet::decode(r#"517-["x"]"#),
            Err(ProtocolError::TooManyAttachments(17))
        ));
        assert!(matches!(
            Packet::decode(r#"2{"not":"an array"}"#).unwrap().into_event(),
            Err(ProtocolError::MissingEventName)
        ));
    }

    #[test]
    fn test_binary_assembler_fills_placeholders() {
        // テスト項目: バイナリフレームが placeholder の位置に埋め込まれる
        // given (前提条件):
        let packet =
            Packet::decode(r#"52-["files",{"a":{"_placeholder":true,"num":1},"b":[{"_placeholder":true,"num":0}]}]"#)
                .unwrap();
        assert_eq!(packet.attachments, 2);
        let mut assembler = BinaryAssembler::new(packet);

        // when (操作):
        assembler.push(vec![1]);
        assert!(!assembler.is_complete());
        assembler.push(vec![2, 3]);

        // then (期待する結果):
        assert!(assembler.is_complete());
        let packet = assembler.finish().unwrap();
        assert_eq!(packet.kind, PacketType::Event);
        assert_eq!(
            packet.data,
            Some(json!(["files", {"a": [2, 3], "b": [[1]]}]))
        );
    }

    #[test]
    fn test_binary_assembler_rejects_unknown_attachment() {
        // テスト項目: 存在しない添付番号はエラーになる
        let packet = Packet::decode(r#"51-["x",{"_placeholder":true,"num":4}]"#).unwrap();
        let mut assembler = BinaryAssembler::new(packet);
        assembler.push(vec![0]);

        assert!(matches!(assembler.finish(), Err(ProtocolError::BadPlaceholder)));
    }
}
