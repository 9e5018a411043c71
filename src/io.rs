use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::adapter::{BroadcastAdapter, LocalAdapter};
use crate::client::Connection;
use crate::config::ServerConfig;
use crate::errors::BroadcastError;
use crate::handler::MessageHandler;
use crate::ns::Namespace;
use crate::parser::{Decoder, Encoder};
use crate::sid::Sid;
use crate::str::Str;

/// The namespace registry and entry point of the protocol core.
///
/// Namespaces are registered up front (or lazily through [`of`](Server::of));
/// each accepted transport connection then gets one socket view per
/// registered namespace. The root namespace `""` always exists.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use siomux::{Server, Socket};
///
/// let io = Server::new();
/// io.on("connection", |socket: Arc<Socket>| {
///     socket.on("hello", |_: Arc<Socket>, name: String| format!("hi {name}"));
/// });
/// io.of("/chat").on("connection", |socket: Arc<Socket>| {
///     socket.join("lobby").ok();
/// });
/// ```
pub struct Server {
    config: ServerConfig,
    nsps: RwLock<HashMap<Str, Arc<Namespace>>>,
}

impl Server {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let server = Self {
            config,
            nsps: RwLock::new(HashMap::new()),
        };
        server.of("");
        server
    }

    /// Get or create the namespace at `path`, backed by a [`LocalAdapter`].
    pub fn of(&self, path: impl Into<Str>) -> Arc<Namespace> {
        self.of_with_adapter(path, Arc::new(LocalAdapter::default()))
    }

    /// Get or create the namespace at `path` with the given broadcast
    /// adaptor. The adaptor only applies when the namespace does not exist
    /// yet.
    pub fn of_with_adapter(
        &self,
        path: impl Into<Str>,
        adapter: Arc<dyn BroadcastAdapter>,
    ) -> Arc<Namespace> {
        let path = path.into();
        self.nsps
            .write()
            .unwrap()
            .entry(path.clone())
            .or_insert_with(|| Namespace::new(path, adapter))
            .clone()
    }

    /// The namespace at `path`, if registered.
    pub fn get_ns(&self, path: &str) -> Option<Arc<Namespace>> {
        self.nsps.read().unwrap().get(path).cloned()
    }

    /// Register `handler` for `event` on the root namespace.
    pub fn on<H, T>(&self, event: impl Into<std::borrow::Cow<'static, str>>, handler: H)
    where
        H: MessageHandler<T>,
        T: Send + Sync + 'static,
    {
        self.of("").on(event, handler);
    }

    /// Broadcast `event` to every member of `room` on the root namespace.
    pub fn broadcast_to<T: ?Sized + Serialize>(
        &self,
        room: &str,
        event: &str,
        data: &T,
    ) -> Result<(), BroadcastError> {
        self.of("").broadcast_to(room, event, data)
    }

    /// Accept a transport connection.
    ///
    /// Takes the connection's session id, the metadata of the HTTP request
    /// that established it, and the two halves of its packet codec. The
    /// connection's writer task is spawned here, so this must be called
    /// from within a tokio runtime. The returned [`Connection`] must be
    /// [`run`](Connection::run) to start dispatching.
    pub fn accept<D: Decoder, E: Encoder>(
        &self,
        sid: Sid,
        req_parts: http::request::Parts,
        decoder: D,
        encoder: E,
    ) -> Connection<D> {
        tracing::debug!(%sid, "accepting connection");
        let namespaces = self.nsps.read().unwrap().values().cloned().collect();
        Connection::new(
            sid,
            req_parts,
            decoder,
            encoder,
            namespaces,
            self.config.buffer_size,
        )
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("nsps", &self.nsps.read().unwrap().keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_namespace_always_exists() {
        let io = Server::new();
        assert!(io.get_ns("").is_some());
        assert!(io.get_ns("/chat").is_none());
    }

    #[test]
    fn of_is_get_or_create() {
        let io = Server::new();
        let a = io.of("/chat");
        let b = io.of("/chat");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
