//! A [`Socket`] is the view of one accepted connection through one
//! namespace: it carries the namespace's handler table and adaptor, the
//! socket's room memberships and its connect/disconnect lifecycle, and it
//! is the value handed to every application handler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::ack::AckRegistry;
use crate::client::Core;
use crate::errors::{AdapterError, BroadcastError, DecodeError, Error, HandlerError, SendError, SocketError};
use crate::handler::{AckHandler, MakeErasedHandler, MessageHandler};
use crate::ns::{Namespace, CONNECTION_EVENT, DISCONNECTION_EVENT, ERROR_EVENT};
use crate::packet::{to_args, Packet, PacketType};
use crate::parser::{Decoder, NeverDecoder};
use crate::sid::Sid;
use crate::str::Str;

pub struct Socket {
    conn: Arc<Core>,
    pub(crate) ns: Arc<Namespace>,
    rooms: RwLock<HashSet<String>>,
    connected: AtomicBool,
    disconnected: AtomicBool,
}

impl Socket {
    pub(crate) fn new(conn: Arc<Core>, ns: Arc<Namespace>) -> Self {
        Self {
            conn,
            ns,
            rooms: RwLock::new(HashSet::new()),
            connected: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Session id of the underlying connection, shared by every namespace
    /// view of that connection.
    pub fn id(&self) -> Sid {
        self.conn.sid
    }

    /// Metadata of the HTTP request that established the connection.
    pub fn req_parts(&self) -> &http::request::Parts {
        &self.conn.req_parts
    }

    /// Path of the namespace this view belongs to, `""` for root.
    pub fn ns(&self) -> &str {
        &self.ns.path
    }

    /// Whether the namespace connect has been acknowledged and no
    /// disconnect has been signalled yet.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Register `handler` for `event` on this socket's namespace.
    ///
    /// The handler table is shared namespace state: the registration is
    /// visible to every socket of the namespace, not just this one.
    pub fn on<H, T>(&self, event: impl Into<std::borrow::Cow<'static, str>>, handler: H)
    where
        H: MessageHandler<T>,
        T: Send + Sync + 'static,
    {
        self.ns.on(event, handler);
    }

    /// Emit `event` to the peer on this namespace.
    ///
    /// `data` is serialized once; a top level array or tuple spreads into
    /// one payload argument per element, anything else is a single
    /// argument. Emitting the `"disconnect"` event also disconnects the
    /// socket afterwards.
    pub fn emit<T: ?Sized + Serialize>(
        self: &Arc<Self>,
        event: &str,
        data: &T,
    ) -> Result<(), SendError> {
        let args = to_args(data)?;
        self.conn
            .send(Packet::event(self.ns.path.clone(), event, args))?;
        if event == "disconnect" {
            self.disconnect()?;
        }
        Ok(())
    }

    /// Emit `event` and resume `continuation` when the peer acknowledges
    /// it.
    ///
    /// The continuation is installed in the connection's ack table under a
    /// freshly reserved id before the frame is queued, and runs exactly
    /// once when the matching ACK arrives. It is abandoned if the
    /// connection closes first.
    pub fn emit_with_ack<T, H, U>(
        self: &Arc<Self>,
        event: &str,
        data: &T,
        continuation: H,
    ) -> Result<(), SendError>
    where
        T: ?Sized + Serialize,
        H: AckHandler<U>,
        U: Send + 'static,
    {
        let args = to_args(data)?;
        let mut packet = Packet::event(self.ns.path.clone(), event, args);
        let id = self.acks().reserve();
        packet.id = Some(id);

        self.acks().insert(id, MakeErasedHandler::new_ack(continuation));
        if let Err(e) = self.conn.send(packet) {
            self.acks().remove(id);
            return Err(e.into());
        }
        Ok(())
    }

    /// Emit `event` with pre-encoded payload arguments. This is the
    /// delivery path used by broadcast adaptors.
    pub fn emit_raw(&self, event: &str, args: Vec<Value>) -> Result<(), SocketError> {
        self.conn
            .send(Packet::event(self.ns.path.clone(), event, args))
    }

    // Room actions

    /// Join `room`. The name stored in the adaptor is qualified with this
    /// namespace's path.
    pub fn join(self: &Arc<Self>, room: &str) -> Result<(), AdapterError> {
        let room = self.ns.room_name(room);
        self.ns.adapter.join(&room, self)?;
        self.rooms.write().unwrap().insert(room);
        Ok(())
    }

    /// Leave `room`.
    pub fn leave(self: &Arc<Self>, room: &str) -> Result<(), AdapterError> {
        let room = self.ns.room_name(room);
        self.ns.adapter.leave(&room, self)?;
        self.rooms.write().unwrap().remove(&room);
        Ok(())
    }

    /// Leave every room this socket is a member of, stopping on the first
    /// adaptor error.
    pub fn leave_all(self: &Arc<Self>) -> Result<(), AdapterError> {
        let rooms: Vec<String> = self.rooms.read().unwrap().iter().cloned().collect();
        for room in rooms {
            self.ns.adapter.leave(&room, self)?;
            self.rooms.write().unwrap().remove(&room);
        }
        Ok(())
    }

    /// Room names this socket has joined on this namespace, without the
    /// namespace qualifier.
    pub fn rooms(&self) -> Vec<String> {
        let prefix = format!("{}:", self.ns.path);
        self.rooms
            .read()
            .unwrap()
            .iter()
            .filter_map(|room| room.strip_prefix(&prefix).map(str::to_owned))
            .collect()
    }

    /// Broadcast `event` to every member of `room` except this socket.
    pub fn broadcast_to<T: ?Sized + Serialize>(
        self: &Arc<Self>,
        room: &str,
        event: &str,
        data: &T,
    ) -> Result<(), BroadcastError> {
        let args = to_args(data)?;
        self.ns
            .adapter
            .send(Some(self.as_ref()), &self.ns.room_name(room), event, args)?;
        Ok(())
    }

    /// Disconnect this socket.
    ///
    /// On a non-root namespace this sends a DISCONNECT frame for the
    /// namespace, leaves all rooms and marks the view disconnected while
    /// the transport stays open. On the root namespace it closes the
    /// underlying transport, which makes the connection loop exit and run
    /// its cleanup for every namespace.
    pub fn disconnect(self: &Arc<Self>) -> Result<(), SocketError> {
        if self.ns.path.is_empty() {
            self.conn.close();
            return Ok(());
        }
        self.conn.send(Packet::disconnect(self.ns.path.clone()))?;
        if let Err(e) = self.leave_all() {
            tracing::warn!(sid = %self.id(), ns = %self.ns.path, "error leaving rooms on disconnect: {e}");
        }
        self.set_disconnected();
        Ok(())
    }

    // Inbound dispatch

    /// Dispatch one inbound (or locally synthesised) frame on this view.
    ///
    /// Returns the handler's return values, which become the ACK payload
    /// when the frame requested one. Handler errors are logged here and do
    /// not surface; decode errors do and are fatal to the connection.
    pub(crate) async fn on_packet<D: Decoder>(
        self: &Arc<Self>,
        mut decoder: Option<&mut D>,
        packet: &Packet,
    ) -> Result<Vec<Value>, Error> {
        if self.disconnected.load(Ordering::SeqCst) {
            // A fresh connect revives the view; anything else is ignored.
            if packet.kind == PacketType::Connect {
                self.disconnected.store(false, Ordering::SeqCst);
            } else {
                return Ok(Vec::new());
            }
        }

        let event: Str = match packet.kind {
            PacketType::Connect => CONNECTION_EVENT.into(),
            PacketType::Disconnect => DISCONNECTION_EVENT.into(),
            PacketType::Error => ERROR_EVENT.into(),
            PacketType::Ack | PacketType::BinaryAck => {
                self.on_ack(decoder, packet).await?;
                return Ok(Vec::new());
            }
            PacketType::Event | PacketType::BinaryEvent => match decoder.as_deref_mut() {
                Some(decoder) => decoder.message().map_err(|_| Error::InvalidEventName)?,
                None => return Ok(Vec::new()),
            },
        };

        let Some(handler) = self.ns.get_handler(&event) else {
            // Unknown event: release the decoder's pending attachment
            // stream, otherwise an unconsumed binary payload stalls the
            // transport. Nothing else to do.
            if let Some(decoder) = decoder.as_deref_mut() {
                decoder.close().await;
            }
            return Ok(Vec::new());
        };

        let olen = handler.arity();
        let mut args = vec![Value::Null; olen];
        if olen > 0 {
            if let Some(decoder) = decoder.as_deref_mut() {
                args = self.bind_payload(decoder, args).await?;
            }
        }

        match handler.call(self.clone(), args).await {
            Ok(ret) => Ok(ret),
            Err(HandlerError::Decode(e)) => Err(Error::Decode(DecodeError::Data(e))),
            Err(e) => {
                tracing::warn!(sid = %self.id(), ns = %self.ns.path, event = %event, "handler error: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn bind_payload<D: Decoder>(
        &self,
        decoder: &mut D,
        mut args: Vec<Value>,
    ) -> Result<Vec<Value>, Error> {
        decoder.decode_data(&mut args).await.map_err(Error::Decode)?;
        Ok(args)
    }

    /// Resolve an inbound acknowledgement: take the continuation installed
    /// under the frame's id, bind the payload into its argument slots and
    /// run it. An unknown id is silently ignored.
    async fn on_ack<D: Decoder>(
        self: &Arc<Self>,
        decoder: Option<&mut D>,
        packet: &Packet,
    ) -> Result<(), Error> {
        let Some(id) = packet.id else {
            return Ok(());
        };
        let Some(continuation) = self.acks().remove(id) else {
            return Ok(());
        };

        let olen = continuation.arity();
        let mut args = vec![Value::Null; olen];
        if olen > 0 {
            if let Some(decoder) = decoder {
                args = self.bind_payload(decoder, args).await?;
            }
        }

        match continuation.call(self.clone(), args).await {
            Ok(()) => Ok(()),
            Err(HandlerError::Decode(e)) => Err(Error::Decode(DecodeError::Data(e))),
            Err(e) => {
                tracing::warn!(sid = %self.id(), ns = %self.ns.path, ack = id, "acknowledgement continuation error: {e}");
                Ok(())
            }
        }
    }

    /// Teardown path: leave every room, fire the local `"disconnection"`
    /// handler and mark the view disconnected. A view that already sent or
    /// received a DISCONNECT is left untouched.
    pub(crate) async fn close_local(self: &Arc<Self>) {
        if self.disconnected.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.leave_all() {
            tracing::warn!(sid = %self.id(), ns = %self.ns.path, "error leaving rooms during teardown: {e}");
        }
        let packet = Packet::disconnect(self.ns.path.clone());
        if let Err(e) = self.on_packet::<NeverDecoder>(None, &packet).await {
            tracing::warn!(sid = %self.id(), ns = %self.ns.path, "error dispatching local disconnect: {e}");
        }
        self.set_disconnected();
    }

    pub(crate) fn send_packet(&self, packet: Packet) -> Result<(), SocketError> {
        self.conn.send(packet)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn set_disconnected(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    pub(crate) fn disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn acks(&self) -> &AckRegistry {
        &self.conn.acks
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("sid", &self.id())
            .field("ns", &self.ns.path)
            .field("connected", &self.connected)
            .finish()
    }
}

impl PartialEq for Socket {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.ns.path == other.ns.path
    }
}

#[cfg(test)]
impl Socket {
    /// A socket wired to a live outgoing queue, for unit tests.
    pub(crate) fn new_dummy(
        ns: Arc<Namespace>,
    ) -> (Arc<Socket>, tokio::sync::mpsc::Receiver<Packet>) {
        let (core, rx) = Core::new_test();
        (Arc::new(Socket::new(core, ns)), rx)
    }
}
