use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;

use crate::{Envelope, InProcessTransport, Received, Transport};

fn envelope(tag: u8) -> Envelope {
    Envelope::new(Bytes::from(vec![tag]), Vec::new())
}

fn payload_tag(received: Received) -> u8 {
    match received {
        Received::Envelope(envelope) => envelope.payload[0],
        other => panic!("expected envelope, got {other:?}"),
    }
}

#[tokio::test]
async fn entangled_pair_delivers_fifo_both_directions() {
    let transport = InProcessTransport::new();
    let (a, b) = transport.create_entangled();

    transport.post(a, envelope(1)).unwrap();
    transport.post(a, envelope(2)).unwrap();
    transport.post(b, envelope(9)).unwrap();

    assert_eq!(payload_tag(transport.recv(b).await.unwrap()), 1);
    assert_eq!(payload_tag(transport.recv(b).await.unwrap()), 2);
    assert_eq!(payload_tag(transport.recv(a).await.unwrap()), 9);
}

#[tokio::test]
async fn close_wakes_suspended_recv_with_closed() {
    let transport = std::sync::Arc::new(InProcessTransport::new());
    let (a, _b) = transport.create_entangled();

    let waiter = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.recv(a).await.unwrap() })
    };
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    transport.close(a);
    let received = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert!(matches!(received, Received::Closed));
}

#[tokio::test]
async fn own_close_suppresses_queued_envelopes() {
    let transport = InProcessTransport::new();
    let (a, b) = transport.create_entangled();

    transport.post(a, envelope(1)).unwrap();
    transport.close(b);
    assert!(matches!(transport.recv(b).await.unwrap(), Received::Closed));
}

#[tokio::test]
async fn peer_close_delivers_queued_envelopes_first() {
    let transport = InProcessTransport::new();
    let (a, b) = transport.create_entangled();

    transport.post(a, envelope(1)).unwrap();
    transport.post(a, envelope(2)).unwrap();
    transport.close(a);

    assert_eq!(payload_tag(transport.recv(b).await.unwrap()), 1);
    assert_eq!(payload_tag(transport.recv(b).await.unwrap()), 2);
    assert!(matches!(transport.recv(b).await.unwrap(), Received::Closed));
}

#[tokio::test(start_paused = true)]
async fn interrupt_without_waiter_is_discarded() {
    let transport = InProcessTransport::new();
    let (a, _b) = transport.create_entangled();

    // No receiver is suspended, so this wakeup must not be stored.
    transport.interrupt(a);
    assert!(timeout(Duration::from_millis(50), transport.recv(a)).await.is_err());
}

#[tokio::test]
async fn interrupt_wakes_suspended_recv() {
    let transport = std::sync::Arc::new(InProcessTransport::new());
    let (a, _b) = transport.create_entangled();

    let waiter = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.recv(a).await.unwrap() })
    };
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    transport.interrupt(a);
    let received = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert!(matches!(received, Received::Interrupted));
}

#[tokio::test]
async fn revoke_stands_down_old_receiver_and_keeps_data_for_new_owner() {
    let transport = std::sync::Arc::new(InProcessTransport::new());
    let (a, b) = transport.create_entangled();

    let old_owner = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.recv(b).await.unwrap() })
    };
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    transport.revoke(b);
    let received = timeout(Duration::from_secs(1), old_owner).await.unwrap().unwrap();
    assert!(matches!(received, Received::Interrupted));

    // The envelope posted after the handoff belongs to the new owner.
    transport.post(a, envelope(7)).unwrap();
    assert_eq!(payload_tag(transport.recv(b).await.unwrap()), 7);
}

#[tokio::test]
async fn post_to_closed_peer_is_dropped_not_an_error() {
    let transport = InProcessTransport::new();
    let (a, b) = transport.create_entangled();

    transport.close(b);
    transport.post(a, envelope(1)).unwrap();
    assert_eq!(transport.stats().posts_dropped, 1);
    assert_eq!(transport.stats().envelopes_posted, 0);
}

#[tokio::test]
async fn double_close_releases_pair_state() {
    let transport = InProcessTransport::new();
    let (a, b) = transport.create_entangled();

    transport.close(a);
    transport.close(a);
    transport.close(b);

    // Both ids are gone; further operations are benign no-ops.
    assert!(matches!(transport.recv(a).await.unwrap(), Received::Closed));
    assert!(transport.try_recv(b).unwrap().is_none());
}
