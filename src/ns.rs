use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::adapter::BroadcastAdapter;
use crate::errors::BroadcastError;
use crate::handler::{BoxedMessageHandler, MakeErasedHandler, MessageHandler};
use crate::packet::to_args;
use crate::str::Str;

/// Reserved event names, synthesised from packet types and never decoded
/// from a payload.
pub(crate) const CONNECTION_EVENT: &str = "connection";
pub(crate) const DISCONNECTION_EVENT: &str = "disconnection";
pub(crate) const ERROR_EVENT: &str = "error";

/// A named logical channel multiplexed over every client connection.
///
/// A namespace owns the handler table shared by all of its socket views and
/// the broadcast adaptor that keeps room membership. The root namespace is
/// the empty path.
pub struct Namespace {
    /// Namespace path, `""` for the root namespace.
    pub path: Str,
    events: RwLock<HashMap<Cow<'static, str>, BoxedMessageHandler>>,
    pub(crate) adapter: Arc<dyn BroadcastAdapter>,
}

impl Namespace {
    pub(crate) fn new(path: Str, adapter: Arc<dyn BroadcastAdapter>) -> Arc<Self> {
        Arc::new(Self {
            path,
            events: RwLock::new(HashMap::new()),
            adapter,
        })
    }

    /// Register `handler` for `event` on this namespace's shared handler
    /// table. Registering twice for the same event replaces the previous
    /// handler; the change is visible to every connected socket.
    pub fn on<H, T>(&self, event: impl Into<Cow<'static, str>>, handler: H)
    where
        H: MessageHandler<T>,
        T: Send + Sync + 'static,
    {
        self.events
            .write()
            .unwrap()
            .insert(event.into(), MakeErasedHandler::new_message(handler));
    }

    /// Look up the handler for `event`. The lock covers the lookup only;
    /// the returned handle is invoked outside of it.
    pub(crate) fn get_handler(&self, event: &str) -> Option<BoxedMessageHandler> {
        self.events.read().unwrap().get(event).cloned()
    }

    /// Canonical, namespace-qualified room name as stored in the adaptor.
    pub(crate) fn room_name(&self, room: &str) -> String {
        format!("{}:{}", self.path, room)
    }

    /// Broadcast `event` to every member of `room`, with no sender
    /// excluded.
    pub fn broadcast_to<T: ?Sized + Serialize>(
        &self,
        room: &str,
        event: &str,
        data: &T,
    ) -> Result<(), BroadcastError> {
        let args = to_args(data)?;
        self.adapter.send(None, &self.room_name(room), event, args)?;
        Ok(())
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LocalAdapter;
    use crate::socket::Socket;
    use std::sync::Arc;

    #[test]
    fn room_names_are_namespace_qualified() {
        let ns = Namespace::new("/chat".into(), Arc::new(LocalAdapter::default()));
        assert_eq!(ns.room_name("a"), "/chat:a");
        let root = Namespace::new("".into(), Arc::new(LocalAdapter::default()));
        assert_eq!(root.room_name("a"), ":a");
    }

    #[test]
    fn registering_twice_replaces_the_handler() {
        let ns = Namespace::new("".into(), Arc::new(LocalAdapter::default()));
        ns.on("ev", |_: Arc<Socket>| {});
        ns.on("ev", |_: Arc<Socket>, _: i64| {});
        assert_eq!(ns.get_handler("ev").unwrap().arity(), 1);
        assert!(ns.get_handler("other").is_none());
    }
}
