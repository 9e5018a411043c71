
use std::sync::Arc;

use siomux::{Packet, PacketType, Server, Socket};
use tokio::sync::mpsc;

#[tokio::test]
async fn accepting_greets_and_fires_root_connection_handler() {
    let io = Server::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    io.on("connection", move |socket: Arc<Socket>| {
        tx.send((socket.id(), socket.rooms())).unwrap();
    });

    let (conn, mut peer) = fixture::connect(&io);
    let sid = conn.id();
    let handle = tokio::spawn(conn.run());

    let greet = peer.next().await;
    assert_eq!(greet.kind, PacketType::Connect);
    assert_eq!(greet.nsp, "");
    assert_eq!(greet.id, None);

    let (seen_sid, rooms) = fixture::recv(&mut rx).await;
    assert_eq!(seen_sid, sid);
    assert!(rooms.is_empty());
    assert!(rx.try_recv().is_err(), "connection handler ran more than once");

    peer.close();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn peer_connect_on_namespace_is_acknowledged() {
    let io = Server::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    io.of("/chat").on("connection", move |socket: Arc<Socket>| {
        tx.send(socket.ns().to_owned()).unwrap();
    });

    let (conn, mut peer) = fixture::connect(&io);
    let chat = conn.socket("/chat").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    assert!(!chat.connected());
    peer.send(Packet::connect("/chat".into()));

    let reply = peer.next().await;
    assert_eq!(reply.kind, PacketType::Connect);
    assert_eq!(reply.nsp, "/chat");
    assert_eq!(fixture::recv(&mut rx).await, "/chat");
    assert!(chat.connected());

    peer.close();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn connect_revives_a_disconnected_view() {
    let io = Server::new();
    io.of("/chat");

    let (conn, mut peer) = fixture::connect(&io);
    let chat = conn.socket("/chat").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    peer.send(Packet::connect("/chat".into()));
    let _reply = peer.next().await;
    peer.send(Packet::disconnect("/chat".into()));

    // reconnect over the same transport
    peer.send(Packet::connect("/chat".into()));
    let reply = peer.next().await;
    assert_eq!(reply.kind, PacketType::Connect);
    assert_eq!(reply.nsp, "/chat");
    assert!(chat.connected());

    peer.close();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn root_disconnect_closes_the_transport() {
    let io = Server::new();
    let (conn, mut peer) = fixture::connect(&io);
    let root = conn.socket("").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    root.disconnect().unwrap();

    // the transport closes, the loop exits cleanly and runs teardown
    handle.await.unwrap().unwrap();
    assert!(!root.connected());
}

#[tokio::test]
async fn teardown_marks_every_view_disconnected() {
    let io = Server::new();
    io.of("/a");
    io.of("/b");

    let (conn, mut peer) = fixture::connect(&io);
    let root = conn.socket("").unwrap();
    let a = conn.socket("/a").unwrap();
    let b = conn.socket("/b").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    peer.close();
    handle.await.unwrap().unwrap();

    assert!(!root.connected());
    assert!(!a.connected());
    assert!(!b.connected());
    assert!(root.rooms().is_empty());
}
