//! Broadcast adaptors keep room membership and fan broadcasts out to the
//! member sockets. The default [`LocalAdapter`] stores membership in
//! process memory; other implementations can back the same contract with an
//! external pub/sub system.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;

use crate::errors::{AdapterError, BroadcastError, SocketError};
use crate::sid::Sid;
use crate::socket::Socket;

/// Room membership store and broadcast fan-out.
///
/// Implementations must be safe for concurrent use: `join`, `leave` and
/// `send` can be called from any task. Room names handed to an adaptor are
/// always namespace-qualified (`"<namespace>:<room>"`), so one adaptor can
/// be shared by several namespaces without collisions.
pub trait BroadcastAdapter: Send + Sync + 'static {
    /// Add `socket` to `room`.
    fn join(&self, room: &str, socket: &Arc<Socket>) -> Result<(), AdapterError>;

    /// Remove `socket` from `room`. Leaving a room the socket is not a
    /// member of is not an error.
    fn leave(&self, room: &str, socket: &Arc<Socket>) -> Result<(), AdapterError>;

    /// Emit `event` with `args` to every member of `room`, skipping
    /// `except` when given.
    fn send(
        &self,
        except: Option<&Socket>,
        room: &str,
        event: &str,
        args: Vec<Value>,
    ) -> Result<(), AdapterError>;
}

/// The default adaptor: room membership in process memory.
///
/// Sockets are held weakly, so a connection that goes away without cleanly
/// leaving its rooms is pruned on the next broadcast touching them.
#[derive(Default)]
pub struct LocalAdapter {
    rooms: RwLock<HashMap<String, HashMap<Sid, Weak<Socket>>>>,
}

impl LocalAdapter {
    /// Session ids currently member of `room`.
    pub fn members(&self, room: &str) -> Vec<Sid> {
        self.rooms
            .read()
            .unwrap()
            .get(room)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl BroadcastAdapter for LocalAdapter {
    fn join(&self, room: &str, socket: &Arc<Socket>) -> Result<(), AdapterError> {
        self.rooms
            .write()
            .unwrap()
            .entry(room.to_owned())
            .or_default()
            .insert(socket.id(), Arc::downgrade(socket));
        Ok(())
    }

    fn leave(&self, room: &str, socket: &Arc<Socket>) -> Result<(), AdapterError> {
        if let Some(members) = self.rooms.write().unwrap().get_mut(room) {
            members.remove(&socket.id());
        }
        Ok(())
    }

    fn send(
        &self,
        except: Option<&Socket>,
        room: &str,
        event: &str,
        args: Vec<Value>,
    ) -> Result<(), AdapterError> {
        let (sockets, dead) = {
            let rooms = self.rooms.read().unwrap();
            let Some(members) = rooms.get(room) else {
                return Ok(());
            };
            let mut sockets = Vec::with_capacity(members.len());
            let mut dead = Vec::new();
            for (sid, socket) in members {
                match socket.upgrade() {
                    Some(socket) => {
                        if except.map_or(true, |e| e.id() != socket.id()) {
                            sockets.push(socket);
                        }
                    }
                    None => dead.push(*sid),
                }
            }
            (sockets, dead)
        };

        if !dead.is_empty() {
            if let Some(members) = self.rooms.write().unwrap().get_mut(room) {
                for sid in dead {
                    members.remove(&sid);
                }
            }
        }

        tracing::debug!(room, event, "broadcasting to {} socket(s)", sockets.len());
        let errs: Vec<SocketError> = sockets
            .iter()
            .filter_map(|socket| socket.emit_raw(event, args.clone()).err())
            .collect();
        if errs.is_empty() {
            Ok(())
        } else {
            Err(AdapterError(Box::new(BroadcastError::Socket(errs))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ns::Namespace;
    use crate::packet::PacketType;
    use serde_json::json;

    fn socket_in(ns: &Arc<Namespace>) -> (Arc<Socket>, tokio::sync::mpsc::Receiver<crate::packet::Packet>) {
        Socket::new_dummy(ns.clone())
    }

    #[tokio::test]
    async fn join_and_leave_track_membership() {
        let adapter = LocalAdapter::default();
        let ns = Namespace::new("/chat".into(), Arc::new(LocalAdapter::default()));
        let (s, _rx) = socket_in(&ns);

        adapter.join("/chat:a", &s).unwrap();
        assert_eq!(adapter.members("/chat:a"), vec![s.id()]);

        adapter.leave("/chat:a", &s).unwrap();
        assert!(adapter.members("/chat:a").is_empty());
        // leaving again is benign
        adapter.leave("/chat:a", &s).unwrap();
    }

    #[tokio::test]
    async fn send_skips_the_excluded_socket() {
        let adapter = LocalAdapter::default();
        let ns = Namespace::new("".into(), Arc::new(LocalAdapter::default()));
        let (a, mut rx_a) = socket_in(&ns);
        let (b, mut rx_b) = socket_in(&ns);

        adapter.join(":room", &a).unwrap();
        adapter.join(":room", &b).unwrap();
        adapter.send(Some(&a), ":room", "ping", vec![json!(1)]).unwrap();

        let p = rx_b.try_recv().unwrap();
        assert_eq!(p.kind, PacketType::Event);
        assert_eq!(p.data, vec![json!("ping"), json!(1)]);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_prunes_dropped_sockets() {
        let adapter = LocalAdapter::default();
        let ns = Namespace::new("".into(), Arc::new(LocalAdapter::default()));
        let (a, _rx_a) = socket_in(&ns);
        adapter.join(":room", &a).unwrap();

        let gone = a.id();
        drop(a);
        drop(_rx_a);
        adapter.send(None, ":room", "ping", vec![]).unwrap();
        assert!(!adapter.members(":room").contains(&gone));
    }
}
