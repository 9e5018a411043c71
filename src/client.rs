//! Per-connection machinery: the shared [`Core`], the writer task that
//! serialises all outgoing frames, and the [`Connection`] read loop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Notify;

use crate::ack::AckRegistry;
use crate::errors::{DecodeError, Error, SocketError};
use crate::ns::Namespace;
use crate::packet::{Packet, PacketType};
use crate::parser::{Decoder, Encoder, NeverDecoder};
use crate::sid::Sid;
use crate::socket::Socket;
use crate::str::Str;

/// State shared by every namespace view of one accepted connection.
pub(crate) struct Core {
    pub(crate) sid: Sid,
    pub(crate) req_parts: http::request::Parts,
    pub(crate) acks: AckRegistry,
    tx: mpsc::Sender<Packet>,
    closed: Arc<Notify>,
}

impl Core {
    /// Queue one frame for the writer task.
    pub(crate) fn send(&self, packet: Packet) -> Result<(), SocketError> {
        match self.tx.try_send(packet) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SocketError::InternalChannelFull),
            Err(TrySendError::Closed(_)) => Err(SocketError::Closed),
        }
    }

    /// Ask the writer task to close the underlying transport.
    pub(crate) fn close(&self) {
        self.closed.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn new_test() -> (Arc<Self>, mpsc::Receiver<Packet>) {
        let (tx, rx) = mpsc::channel(64);
        let req_parts = http::Request::builder().body(()).unwrap().into_parts().0;
        let core = Arc::new(Core {
            sid: Sid::new(),
            req_parts,
            acks: AckRegistry::new(),
            tx,
            closed: Arc::new(Notify::new()),
        });
        (core, rx)
    }
}

/// Single consumer of a connection's outgoing frame queue. Keeping all
/// encoding on one task means concurrent emitters can never interleave
/// bytes on the transport.
async fn write_loop<E: Encoder>(
    mut encoder: E,
    mut rx: mpsc::Receiver<Packet>,
    closed: Arc<Notify>,
    sid: Sid,
) {
    loop {
        tokio::select! {
            biased;
            _ = closed.notified() => break,
            packet = rx.recv() => match packet {
                Some(packet) => {
                    if let Err(e) = encoder.encode(packet).await {
                        tracing::debug!(%sid, "write failed, closing connection: {e}");
                        break;
                    }
                }
                None => break,
            },
        }
    }
    encoder.close().await;
    rx.close();
}

/// One accepted client.
///
/// Owns the decoder and one [`Socket`] view per namespace the server had
/// registered at accept time, drives the packet read/dispatch cycle and
/// runs teardown when the transport goes away.
pub struct Connection<D> {
    core: Arc<Core>,
    nsps: HashMap<Str, Arc<Socket>>,
    decoder: D,
}

impl<D: Decoder> Connection<D> {
    pub(crate) fn new<E: Encoder>(
        sid: Sid,
        req_parts: http::request::Parts,
        decoder: D,
        encoder: E,
        namespaces: Vec<Arc<Namespace>>,
        buffer_size: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        let closed = Arc::new(Notify::new());
        tokio::spawn(write_loop(encoder, rx, closed.clone(), sid));

        let core = Arc::new(Core {
            sid,
            req_parts,
            acks: AckRegistry::new(),
            tx,
            closed,
        });
        let nsps = namespaces
            .into_iter()
            .map(|ns| {
                let socket = Arc::new(Socket::new(core.clone(), ns.clone()));
                (ns.path.clone(), socket)
            })
            .collect();
        Self {
            core,
            nsps,
            decoder,
        }
    }

    /// Session id of this connection.
    pub fn id(&self) -> Sid {
        self.core.sid
    }

    /// The view of this connection through the namespace at `nsp`, if the
    /// server had it registered at accept time.
    pub fn socket(&self, nsp: &str) -> Option<Arc<Socket>> {
        self.nsps.get(nsp).cloned()
    }

    /// Drive the connection until the transport closes or a fatal error
    /// occurs, then run teardown. A clean transport close returns `Ok`.
    pub async fn run(mut self) -> Result<(), Error> {
        let res = self.process().await;
        self.teardown().await;
        match res {
            Err(Error::Decode(DecodeError::Closed)) => Ok(()),
            res => res,
        }
    }

    async fn process(&mut self) -> Result<(), Error> {
        // Greet the peer on the root namespace and fire its "connection"
        // handler locally; the peer never sends a root CONNECT itself.
        let root = self.view("");
        let connect = Packet::connect(Str::default());
        root.send_packet(connect.clone())?;
        root.set_connected(true);
        root.on_packet::<NeverDecoder>(None, &connect).await?;

        loop {
            let packet = self.decoder.decode().await.map_err(Error::Decode)?;
            tracing::trace!(sid = %self.core.sid, ?packet, "received packet");
            let sock = self.view(&packet.nsp);
            let ret = sock.on_packet(Some(&mut self.decoder), &packet).await?;

            match packet.kind {
                PacketType::Connect => {
                    // the flag must flip before the reply frame can reach
                    // the peer
                    sock.set_connected(true);
                    sock.send_packet(Packet::connect(sock.ns.path.clone()))?;
                }
                PacketType::Event | PacketType::BinaryEvent => {
                    if let Some(id) = packet.id {
                        sock.send_packet(Packet::ack(packet.nsp.clone(), id, ret))?;
                    }
                }
                PacketType::Disconnect => {
                    if let Err(e) = sock.leave_all() {
                        tracing::warn!(sid = %self.core.sid, ns = %sock.ns.path, "error leaving rooms on disconnect: {e}");
                    }
                    sock.set_disconnected();
                }
                _ => {}
            }
        }
    }

    /// Fire the local disconnect path for every view that has not already
    /// disconnected, abandon outstanding acknowledgements and release the
    /// writer task.
    async fn teardown(&mut self) {
        for sock in self.nsps.values() {
            if sock.disconnected() {
                continue;
            }
            sock.close_local().await;
        }
        let abandoned = self.core.acks.clear();
        if abandoned > 0 {
            tracing::debug!(sid = %self.core.sid, "abandoning {abandoned} pending acknowledgement(s)");
        }
        self.core.close();
    }

    /// The view for `path`, falling back to the root namespace when the
    /// path was never registered.
    fn view(&self, path: &str) -> Arc<Socket> {
        match self.nsps.get(path) {
            Some(sock) => sock.clone(),
            None => {
                tracing::debug!(sid = %self.core.sid, nsp = path, "unknown namespace, falling back to root");
                self.nsps
                    .get("")
                    .expect("the root namespace is registered at server construction")
                    .clone()
            }
        }
    }
}

impl<D> std::fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("sid", &self.core.sid)
            .field("nsps", &self.nsps.keys())
            .finish()
    }
}
