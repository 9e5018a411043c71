use serde::Serialize;
use serde_json::Value;

use crate::str::Str;

/// Semantic type of a protocol frame, one variant per wire opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Connection to a namespace.
    Connect,
    /// Disconnection from a namespace.
    Disconnect,
    /// Application event.
    Event,
    /// Acknowledgement of an event.
    Ack,
    /// Error raised by the peer.
    Error,
    /// Application event carrying binary attachments.
    BinaryEvent,
    /// Acknowledgement carrying binary attachments.
    BinaryAck,
}

impl PacketType {
    /// Whether this frame carries an event payload.
    pub fn is_event(self) -> bool {
        matches!(self, PacketType::Event | PacketType::BinaryEvent)
    }

    /// Whether this frame acknowledges a previously emitted event.
    pub fn is_ack(self) -> bool {
        matches!(self, PacketType::Ack | PacketType::BinaryAck)
    }
}

/// A decoded protocol frame.
///
/// For inbound frames the payload stays buffered inside the decoder until
/// the dispatcher knows the receiving handler's arity, so `data` is empty
/// until then. For event frames the first payload element is the event name.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Frame type.
    pub kind: PacketType,
    /// Acknowledgement correlation id. `None` when no ack was requested
    /// (the wire encodes this as `-1`).
    pub id: Option<i64>,
    /// Namespace the frame belongs to. The root namespace is `""`.
    pub nsp: Str,
    /// Payload values.
    pub data: Vec<Value>,
}

impl Packet {
    /// A CONNECT frame for the given namespace.
    pub fn connect(nsp: Str) -> Self {
        Self {
            kind: PacketType::Connect,
            id: None,
            nsp,
            data: Vec::new(),
        }
    }

    /// A DISCONNECT frame for the given namespace.
    pub fn disconnect(nsp: Str) -> Self {
        Self {
            kind: PacketType::Disconnect,
            id: None,
            nsp,
            data: Vec::new(),
        }
    }

    /// An EVENT frame. The event name becomes the first payload element.
    pub fn event(nsp: Str, event: &str, mut args: Vec<Value>) -> Self {
        let mut data = Vec::with_capacity(args.len() + 1);
        data.push(Value::String(event.to_owned()));
        data.append(&mut args);
        Self {
            kind: PacketType::Event,
            id: None,
            nsp,
            data,
        }
    }

    /// An ACK frame answering the event with the given correlation id.
    pub fn ack(nsp: Str, id: i64, data: Vec<Value>) -> Self {
        Self {
            kind: PacketType::Ack,
            id: Some(id),
            nsp,
            data,
        }
    }
}

/// Serialize an emit payload into its positional argument list.
///
/// A top level array (tuples included) spreads into one argument per
/// element, `()` maps to no arguments, anything else is a single argument.
pub(crate) fn to_args<T: ?Sized + Serialize>(data: &T) -> Result<Vec<Value>, serde_json::Error> {
    Ok(match serde_json::to_value(data)? {
        Value::Array(args) => args,
        Value::Null => Vec::new(),
        value => vec![value],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_prepends_name() {
        let p = Packet::event("/chat".into(), "msg", vec![json!(1), json!("a")]);
        assert_eq!(p.kind, PacketType::Event);
        assert_eq!(p.id, None);
        assert_eq!(p.data, vec![json!("msg"), json!(1), json!("a")]);
    }

    #[test]
    fn ack_carries_id() {
        let p = Packet::ack(Str::default(), 7, vec![json!("hi")]);
        assert!(p.kind.is_ack());
        assert_eq!(p.id, Some(7));
        assert_eq!(p.nsp, "");
    }

    #[test]
    fn args_spread_rules() {
        assert_eq!(to_args(&()).unwrap(), Vec::<Value>::new());
        assert_eq!(to_args("x").unwrap(), vec![json!("x")]);
        assert_eq!(to_args(&("a", 1)).unwrap(), vec![json!("a"), json!(1)]);
        assert_eq!(to_args(&json!({"k": 2})).unwrap(), vec![json!({"k": 2})]);
    }
}
