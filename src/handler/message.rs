//! [`MessageHandler`] trait and implementations, used to handle inbound
//! events.
//!
//! The trait is implemented for sync and async functions of the shape
//! `Fn(Arc<Socket>, A1, .., An) -> R` where every `Ai` deserializes from a
//! payload slot and `R` converts into the acknowledgement payload through
//! [`IntoAckPayload`]. Returning `Result` splits the error off: `Ok`
//! becomes the payload, `Err` surfaces as the dispatch error and is logged
//! without touching the connection.

use std::future::{ready, Future};
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::HandlerError;
use crate::socket::Socket;

use super::{all_the_tuples, arg_count, bind_arg, private, MakeErasedHandler};

/// Future returned by an erased handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Vec<Value>, HandlerError>> + Send>>;

/// A type erased [`MessageHandler`], cheap to clone out of a handler table
/// so invocation happens outside the table lock.
pub(crate) type BoxedMessageHandler = Arc<dyn ErasedMessageHandler>;

pub(crate) trait ErasedMessageHandler: Send + Sync + 'static {
    /// Number of payload slots the wrapped callable expects.
    fn arity(&self) -> usize;
    fn call(&self, s: Arc<Socket>, args: Vec<Value>) -> HandlerFuture;
}

/// Define a handler for an inbound event.
///
/// Implemented for sync and async functions with up to 16 payload
/// arguments; see the [module](self) doc.
pub trait MessageHandler<T>: Send + Sync + 'static {
    /// Number of payload arguments the handler declares.
    fn arity(&self) -> usize;

    /// Invoke the handler with pre-bound argument slots.
    fn call(&self, s: Arc<Socket>, args: Vec<Value>) -> HandlerFuture;

    #[doc(hidden)]
    fn phantom(&self) -> std::marker::PhantomData<T> {
        std::marker::PhantomData
    }
}

impl<H, T> MakeErasedHandler<H, T>
where
    H: MessageHandler<T>,
    T: Send + Sync + 'static,
{
    pub(crate) fn new_message(handler: H) -> BoxedMessageHandler {
        Arc::new(Self::new(handler))
    }
}

impl<H, T> ErasedMessageHandler for MakeErasedHandler<H, T>
where
    H: MessageHandler<T>,
    T: Send + Sync + 'static,
{
    #[inline(always)]
    fn arity(&self) -> usize {
        self.handler.arity()
    }

    #[inline(always)]
    fn call(&self, s: Arc<Socket>, args: Vec<Value>) -> HandlerFuture {
        self.handler.call(s, args)
    }
}

/// Conversion of a handler return value into acknowledgement payload values.
///
/// `()` and `None`-like values produce an empty payload, a top level array
/// or tuple spreads into one payload value per element, and `Result` splits
/// its `Err` off as the dispatch error.
pub trait IntoAckPayload<M>: Send + 'static {
    fn into_ack_payload(self) -> Result<Vec<Value>, HandlerError>;
}

impl<T: Serialize + Send + 'static> IntoAckPayload<private::ValueReturn> for T {
    fn into_ack_payload(self) -> Result<Vec<Value>, HandlerError> {
        match serde_json::to_value(&self) {
            Ok(Value::Null) => Ok(Vec::new()),
            Ok(Value::Array(values)) => Ok(values),
            Ok(value) => Ok(vec![value]),
            Err(e) => Err(HandlerError::Serialize(e)),
        }
    }
}

impl<T, M, E> IntoAckPayload<(private::ResultReturn, M)> for Result<T, E>
where
    T: IntoAckPayload<M>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_ack_payload(self) -> Result<Vec<Value>, HandlerError> {
        match self {
            Ok(value) => value.into_ack_payload(),
            Err(e) => Err(HandlerError::Handler(Box::new(e))),
        }
    }
}

macro_rules! impl_message_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, M, $($ty,)*> MessageHandler<(private::SyncCall, M, $($ty,)*)> for F
        where
            F: Fn(Arc<Socket>, $($ty,)*) -> R + Send + Sync + 'static,
            R: IntoAckPayload<M>,
            M: Send + Sync + 'static,
            $( $ty: DeserializeOwned + Send + Sync + 'static, )*
        {
            fn arity(&self) -> usize {
                arg_count!($($ty)*)
            }

            fn call(&self, s: Arc<Socket>, args: Vec<Value>) -> HandlerFuture {
                let mut args = args.into_iter();
                $(
                    let $ty = match bind_arg::<$ty>(args.next()) {
                        Ok(value) => value,
                        Err(e) => return Box::pin(ready(Err(e))),
                    };
                )*
                Box::pin(ready((self)(s, $($ty,)*).into_ack_payload()))
            }
        }
    };
}

macro_rules! impl_message_handler_async {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, M, $($ty,)*> MessageHandler<(private::AsyncCall, M, $($ty,)*)> for F
        where
            F: Fn(Arc<Socket>, $($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoAckPayload<M>,
            M: Send + Sync + 'static,
            $( $ty: DeserializeOwned + Send + Sync + 'static, )*
        {
            fn arity(&self) -> usize {
                arg_count!($($ty)*)
            }

            fn call(&self, s: Arc<Socket>, args: Vec<Value>) -> HandlerFuture {
                let mut args = args.into_iter();
                $(
                    let $ty = match bind_arg::<$ty>(args.next()) {
                        Ok(value) => value,
                        Err(e) => return Box::pin(ready(Err(e))),
                    };
                )*
                let fut = (self)(s, $($ty,)*);
                Box::pin(async move { fut.await.into_ack_payload() })
            }
        }
    };
}

all_the_tuples!(impl_message_handler);
all_the_tuples!(impl_message_handler_async);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ns::Namespace;
    use serde_json::json;

    fn erase<H, T>(handler: H) -> BoxedMessageHandler
    where
        H: MessageHandler<T>,
        T: Send + Sync + 'static,
    {
        MakeErasedHandler::new_message(handler)
    }

    fn dummy_socket() -> Arc<Socket> {
        let ns = Namespace::new("".into(), Arc::new(crate::adapter::LocalAdapter::default()));
        Socket::new_dummy(ns).0
    }

    #[tokio::test]
    async fn sync_handler_returns_payload() {
        let h = erase(|_: Arc<Socket>, name: String| format!("hi {name}"));
        assert_eq!(h.arity(), 1);
        let ret = h.call(dummy_socket(), vec![json!("alice")]).await.unwrap();
        assert_eq!(ret, vec![json!("hi alice")]);
    }

    #[tokio::test]
    async fn async_handler_spreads_tuple() {
        let h = erase(|_: Arc<Socket>, a: i64, b: i64| async move { (a + b, "ok") });
        assert_eq!(h.arity(), 2);
        let ret = h.call(dummy_socket(), vec![json!(1), json!(2)]).await.unwrap();
        assert_eq!(ret, vec![json!(3), json!("ok")]);
    }

    #[tokio::test]
    async fn missing_args_bind_as_null() {
        let h = erase(|_: Arc<Socket>, v: Option<String>| v.is_none());
        let ret = h.call(dummy_socket(), vec![Value::Null]).await.unwrap();
        assert_eq!(ret, vec![json!(true)]);
    }

    #[tokio::test]
    async fn result_err_is_split_off() {
        let h = erase(|_: Arc<Socket>| -> Result<String, std::io::Error> {
            Err(std::io::Error::other("boom"))
        });
        let err = h.call(dummy_socket(), vec![]).await.unwrap_err();
        assert!(matches!(err, HandlerError::Handler(_)));
    }

    #[tokio::test]
    async fn bad_argument_is_a_decode_error() {
        let h = erase(|_: Arc<Socket>, _: u32| ());
        let err = h.call(dummy_socket(), vec![json!("not a number")]).await.unwrap_err();
        assert!(matches!(err, HandlerError::Decode(_)));
    }
}
