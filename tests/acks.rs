
use std::sync::Arc;

use serde_json::json;
use siomux::{Packet, PacketType, Server, Socket};
use tokio::sync::mpsc;

#[tokio::test]
async fn emit_with_ack_round_trip_resumes_the_continuation() {
    let io = Server::new();
    let (conn, mut peer) = fixture::connect(&io);
    let root = conn.socket("").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    root.emit_with_ack("ping", &42, move |_: Arc<Socket>, n: i64| {
        tx.send(n).unwrap();
    })
    .unwrap();

    let event = peer.next().await;
    assert_eq!(event.kind, PacketType::Event);
    assert_eq!(event.data, vec![json!("ping"), json!(42)]);
    let id = event.id.expect("an ack id is assigned");

    peer.send(Packet::ack("".into(), id, vec![json!(43)]));
    assert_eq!(fixture::recv(&mut rx).await, 43);

    peer.close();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn a_replayed_ack_does_not_resume_twice() {
    let io = Server::new();
    let (conn, mut peer) = fixture::connect(&io);
    let root = conn.socket("").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    root.emit_with_ack("ping", &(), move |_: Arc<Socket>, n: i64| {
        tx.send(n).unwrap();
    })
    .unwrap();
    let id = peer.next().await.id.unwrap();

    peer.send(Packet::ack("".into(), id, vec![json!(1)]));
    assert_eq!(fixture::recv(&mut rx).await, 1);

    // the entry was removed on first resolution; replaying is silent
    peer.send(Packet::ack("".into(), id, vec![json!(2)]));

    // sequence with another round trip so the replay has been processed
    let mut probe = Packet::event("".into(), "nobody-listens", vec![json!("x")]);
    probe.id = Some(99);
    peer.send(probe);
    assert_eq!(peer.next().await.id, Some(99));
    assert!(rx.try_recv().is_err(), "continuation resumed twice");

    peer.close();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn async_continuations_are_supported() {
    let io = Server::new();
    let (conn, mut peer) = fixture::connect(&io);
    let root = conn.socket("").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    root.emit_with_ack("sum", &(1, 2), move |_: Arc<Socket>, total: i64| async move {
        tx.send(total).unwrap();
    })
    .unwrap();

    let event = peer.next().await;
    assert_eq!(event.data, vec![json!("sum"), json!(1), json!(2)]);
    peer.send(Packet::ack("".into(), event.id.unwrap(), vec![json!(3)]));
    assert_eq!(fixture::recv(&mut rx).await, 3);

    peer.close();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn outstanding_continuations_are_abandoned_on_close() {
    let io = Server::new();
    let (conn, mut peer) = fixture::connect(&io);
    let root = conn.socket("").unwrap();
    let handle = tokio::spawn(conn.run());
    let _greet = peer.next().await;

    let (tx, mut rx) = mpsc::unbounded_channel::<i64>();
    root.emit_with_ack("ping", &(), move |_: Arc<Socket>, n: i64| {
        tx.send(n).unwrap();
    })
    .unwrap();
    let _event = peer.next().await;

    peer.close();
    handle.await.unwrap().unwrap();

    // the continuation was dropped, never invoked: its channel just closes
    assert_eq!(rx.recv().await, None);
}
