//! [`AckHandler`] trait and implementations: the continuations resumed when
//! the peer acknowledges an emitted event.
//!
//! A continuation is an `FnOnce(Arc<Socket>, A1, .., An)`, sync or async,
//! where every `Ai` deserializes from an ack payload slot. It runs at most
//! once; its return value is discarded.

use std::future::{ready, Future};
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::HandlerError;
use crate::socket::Socket;

use super::{all_the_tuples, arg_count, bind_arg, private, MakeErasedHandler};

/// Future returned by an erased continuation invocation.
pub type AckFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// A type erased [`AckHandler`], stored in the per-connection ack table.
pub(crate) type BoxedAckHandler = Box<dyn ErasedAckHandler>;

pub(crate) trait ErasedAckHandler: Send + 'static {
    /// Number of payload slots the continuation expects.
    fn arity(&self) -> usize;
    fn call(self: Box<Self>, s: Arc<Socket>, args: Vec<Value>) -> AckFuture;
}

/// Define a continuation for an acknowledgement.
///
/// Implemented for sync and async `FnOnce` callables with up to 16 payload
/// arguments; see the [module](self) doc.
pub trait AckHandler<T>: Send + 'static {
    /// Number of payload arguments the continuation declares.
    fn arity(&self) -> usize;

    /// Consume the continuation with pre-bound argument slots.
    fn call(self, s: Arc<Socket>, args: Vec<Value>) -> AckFuture;

    #[doc(hidden)]
    fn phantom(&self) -> std::marker::PhantomData<T> {
        std::marker::PhantomData
    }
}

impl<H, T> MakeErasedHandler<H, T>
where
    H: AckHandler<T>,
    T: Send + 'static,
{
    pub(crate) fn new_ack(handler: H) -> BoxedAckHandler {
        Box::new(Self::new(handler))
    }
}

impl<H, T> ErasedAckHandler for MakeErasedHandler<H, T>
where
    H: AckHandler<T>,
    T: Send + 'static,
{
    #[inline(always)]
    fn arity(&self) -> usize {
        self.handler.arity()
    }

    #[inline(always)]
    fn call(self: Box<Self>, s: Arc<Socket>, args: Vec<Value>) -> AckFuture {
        self.handler.call(s, args)
    }
}

macro_rules! impl_ack_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, $($ty,)*> AckHandler<(private::SyncCall, $($ty,)*)> for F
        where
            F: FnOnce(Arc<Socket>, $($ty,)*) + Send + 'static,
            $( $ty: DeserializeOwned + Send + 'static, )*
        {
            fn arity(&self) -> usize {
                arg_count!($($ty)*)
            }

            fn call(self, s: Arc<Socket>, args: Vec<Value>) -> AckFuture {
                let mut args = args.into_iter();
                $(
                    let $ty = match bind_arg::<$ty>(args.next()) {
                        Ok(value) => value,
                        Err(e) => return Box::pin(ready(Err(e))),
                    };
                )*
                (self)(s, $($ty,)*);
                Box::pin(ready(Ok(())))
            }
        }
    };
}

macro_rules! impl_ack_handler_async {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, $($ty,)*> AckHandler<(private::AsyncCall, Fut, $($ty,)*)> for F
        where
            F: FnOnce(Arc<Socket>, $($ty,)*) -> Fut + Send + 'static,
            Fut: Future + Send + 'static,
            $( $ty: DeserializeOwned + Send + 'static, )*
        {
            fn arity(&self) -> usize {
                arg_count!($($ty)*)
            }

            fn call(self, s: Arc<Socket>, args: Vec<Value>) -> AckFuture {
                let mut args = args.into_iter();
                $(
                    let $ty = match bind_arg::<$ty>(args.next()) {
                        Ok(value) => value,
                        Err(e) => return Box::pin(ready(Err(e))),
                    };
                )*
                let fut = (self)(s, $($ty,)*);
                Box::pin(async move {
                    fut.await;
                    Ok(())
                })
            }
        }
    };
}

all_the_tuples!(impl_ack_handler);
all_the_tuples!(impl_ack_handler_async);
