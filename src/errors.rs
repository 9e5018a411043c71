/// Error raised by the inbound half of the codec.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The transport was closed. This is the clean termination case of a
    /// connection loop.
    #[error("transport closed")]
    Closed,

    /// The transport failed while reading a frame.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The byte stream did not contain a valid frame.
    #[error("malformed packet: {0}")]
    Malformed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The payload could not be bound to the handler's argument slots.
    #[error("cannot bind payload: {0}")]
    Data(#[from] serde_json::Error),
}

/// Error raised by the outbound half of the codec.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The transport failed while writing a frame.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The frame could not be serialized.
    #[error("cannot serialize packet: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Error raised when a frame cannot be queued on a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// The outgoing frame queue is full.
    #[error("internal channel full")]
    InternalChannelFull,

    /// The connection is closed.
    #[error("socket closed")]
    Closed,
}

/// Error type for emit operations.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The emit payload could not be serialized.
    #[error("error serializing payload: {0:?}")]
    Serialize(#[from] serde_json::Error),

    /// The frame could not be queued on the connection.
    #[error("error sending data through the connection: {0:?}")]
    Socket(#[from] SocketError),
}

/// An opaque error raised by a broadcast adaptor implementation.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AdapterError(#[from] pub Box<dyn std::error::Error + Send + Sync>);

/// Error type for broadcast operations.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// Delivery failed for one or more member sockets.
    #[error("error sending data to member sockets: {0:?}")]
    Socket(Vec<SocketError>),

    /// The broadcast payload could not be serialized.
    #[error("error serializing payload: {0:?}")]
    Serialize(#[from] serde_json::Error),

    /// The adaptor rejected the operation.
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

impl From<Vec<SocketError>> for BroadcastError {
    fn from(value: Vec<SocketError>) -> Self {
        Self::Socket(value)
    }
}

/// Error produced while invoking a handler.
///
/// Only the `Decode` variant is fatal to the connection; the other variants
/// come from the handler itself and are logged by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A payload slot could not be deserialized into the declared argument
    /// type.
    #[error("cannot bind payload to handler argument: {0}")]
    Decode(#[source] serde_json::Error),

    /// The handler's return value could not be serialized into an ack
    /// payload.
    #[error("cannot serialize handler return value: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The error returned by the handler itself.
    #[error("{0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Top level error of a connection loop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An event frame's payload did not start with an event name.
    #[error("invalid event name")]
    InvalidEventName,

    /// A frame referenced a namespace this server never registered.
    ///
    /// The connection loop is lenient and falls back to the root namespace
    /// instead of raising this; the variant is kept for a strict mode.
    #[error("unknown namespace: {0}")]
    UnknownNamespace(String),

    /// Reading or binding a frame failed.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A frame could not be queued for writing.
    #[error("socket error: {0}")]
    Socket(#[from] SocketError),
}
