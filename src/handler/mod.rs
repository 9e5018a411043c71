//! Typed wrappers around application callables.
//!
//! Handlers take the socket as their first argument, followed by up to
//! sixteen payload arguments deserialized from the frame. Event handlers
//! ([`MessageHandler`]) can be sync or async and their return value becomes
//! the acknowledgement payload; acknowledgement continuations
//! ([`AckHandler`]) are `FnOnce` and their return value is discarded.

pub mod ack;
pub mod message;

pub use ack::AckHandler;
pub use message::{IntoAckPayload, MessageHandler};

pub(crate) use ack::BoxedAckHandler;
pub(crate) use message::BoxedMessageHandler;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::HandlerError;

/// Marker types disambiguating the blanket handler impls.
pub(crate) mod private {
    pub struct SyncCall;
    pub struct AsyncCall;
    pub struct ValueReturn;
    pub struct ResultReturn;
}

/// Erases the concrete argument tuple of a handler so it can be stored in a
/// handler table.
pub(crate) struct MakeErasedHandler<H, T> {
    pub(crate) handler: H,
    type_: std::marker::PhantomData<fn() -> T>,
}

impl<H, T> MakeErasedHandler<H, T> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            type_: std::marker::PhantomData,
        }
    }
}

/// Deserialize one argument slot. Missing slots bind as `Null`, so handlers
/// with an arity greater than the payload width see zero values.
pub(crate) fn bind_arg<T: DeserializeOwned>(value: Option<Value>) -> Result<T, HandlerError> {
    serde_json::from_value(value.unwrap_or(Value::Null)).map_err(HandlerError::Decode)
}

macro_rules! arg_count {
    () => (0usize);
    ($head:ident $($tail:ident)*) => (1usize + crate::handler::arg_count!($($tail)*));
}

macro_rules! all_the_tuples {
    ($name:ident) => {
        $name!();
        $name!(T1);
        $name!(T1, T2);
        $name!(T1, T2, T3);
        $name!(T1, T2, T3, T4);
        $name!(T1, T2, T3, T4, T5);
        $name!(T1, T2, T3, T4, T5, T6);
        $name!(T1, T2, T3, T4, T5, T6, T7);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15);
        $name!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15, T16);
    };
}

pub(crate) use {all_the_tuples, arg_count};
