//! # siomux
//!
//! The protocol core of a Socket.IO style server: one transport connection
//! carries many logical namespaces, each with its own handler table, room
//! memberships and connect/disconnect lifecycle.
//!
//! The crate deliberately stops at three seams, all expressed as traits:
//!
//! * the packet codec ([`Decoder`]/[`Encoder`]) that turns a framed byte
//!   stream into [`Packet`] values and back,
//! * the broadcast adaptor ([`adapter::BroadcastAdapter`]) that stores room
//!   membership and fans broadcasts out (the in-memory
//!   [`adapter::LocalAdapter`] is provided),
//! * the handler layer ([`handler::MessageHandler`]/[`handler::AckHandler`]),
//!   implemented for plain sync and async functions taking the socket plus
//!   any deserializable arguments.
//!
//! Wiring it up:
//!
//! ```
//! use std::sync::Arc;
//! use siomux::{Server, Socket};
//!
//! let io = Server::new();
//! io.on("connection", |socket: Arc<Socket>| {
//!     // return values become the acknowledgement payload
//!     socket.on("hello", |_: Arc<Socket>, name: String| format!("hi {name}"));
//! });
//! ```
//!
//! For each accepted transport connection, hand its codec halves to
//! [`Server::accept`] and drive the returned [`Connection`] with
//! [`Connection::run`]; everything else (namespace connects, event
//! dispatch, acknowledgements, room cleanup on close) happens inside the
//! loop.

pub mod adapter;
pub mod errors;
pub mod handler;

mod ack;
mod client;
mod config;
mod io;
mod ns;
mod packet;
mod parser;
mod sid;
mod socket;
mod str;

pub use client::Connection;
pub use config::{ServerConfig, ServerConfigBuilder};
pub use errors::{Error, SendError, SocketError};
pub use io::Server;
pub use ns::Namespace;
pub use packet::{Packet, PacketType};
pub use parser::{Decoder, Encoder};
pub use sid::Sid;
pub use socket::Socket;
pub use str::Str;
