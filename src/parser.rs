//! The codec seam between the protocol core and the transport.
//!
//! A codec decodes frames in two steps: [`Decoder::decode`] yields the
//! frame header (type, correlation id, namespace) while the payload stays
//! buffered, and [`Decoder::decode_data`] later binds that payload into the
//! argument slots of whichever handler the dispatcher selected. This lets
//! the dispatcher size the slots from the handler's arity before any
//! payload value is materialised.

use std::future::Future;

use serde_json::Value;

use crate::errors::{DecodeError, EncodeError};
use crate::packet::Packet;
use crate::str::Str;

/// Inbound half of the packet codec.
pub trait Decoder: Send + 'static {
    /// Read the next frame header. The payload is kept buffered until
    /// [`decode_data`](Decoder::decode_data) is called; payload left
    /// unconsumed is discarded on the next `decode` call.
    ///
    /// Returns [`DecodeError::Closed`] once the transport is closed.
    fn decode(&mut self) -> impl Future<Output = Result<Packet, DecodeError>> + Send;

    /// Event name of the frame returned by the last `decode` call, read
    /// from the first payload element without consuming it.
    fn message(&mut self) -> Result<Str, DecodeError>;

    /// Bind the buffered payload of the current frame into `slots`, one
    /// value per slot in payload order. Slots beyond the payload width are
    /// left untouched; payload elements beyond `slots.len()` are discarded.
    fn decode_data(
        &mut self,
        slots: &mut [Value],
    ) -> impl Future<Output = Result<(), DecodeError>> + Send;

    /// Release any pending binary attachment stream of the current frame so
    /// an unconsumed frame cannot stall the transport.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Outbound half of the packet codec.
pub trait Encoder: Send + 'static {
    /// Encode one frame onto the transport.
    fn encode(&mut self, packet: Packet) -> impl Future<Output = Result<(), EncodeError>> + Send;

    /// Close the underlying transport. After this, the matching [`Decoder`]
    /// must yield [`DecodeError::Closed`].
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Decoder stand-in for locally synthesised frames, which never carry a
/// payload. Uninhabited: only ever used as `None::<&mut NeverDecoder>`.
pub(crate) enum NeverDecoder {}

impl Decoder for NeverDecoder {
    async fn decode(&mut self) -> Result<Packet, DecodeError> {
        match *self {}
    }

    fn message(&mut self) -> Result<Str, DecodeError> {
        match *self {}
    }

    async fn decode_data(&mut self, _slots: &mut [Value]) -> Result<(), DecodeError> {
        match *self {}
    }

    async fn close(&mut self) {
        match *self {}
    }
}
