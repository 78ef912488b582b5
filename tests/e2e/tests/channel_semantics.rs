//! Cross-endpoint behavior through the public API only: entanglement,
//! ordering, buffer and port transfer, close semantics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use channel_e2e_tests::{collect_messages, eventually, next_event, test_context};
use message_channel::{
    ChannelError, DataCloneError, MessageChannel, MessagePort, TransferEntry,
};
use tokio::time::timeout;
use types::{structurally_equal, SharedBuffer, SharedMap, Value};

#[tokio::test]
async fn entanglement_delivers_both_directions_in_order() -> anyhow::Result<()> {
    let ctx = test_context();
    let channel = MessageChannel::new(&ctx);
    let mut from_one = collect_messages(&channel.port2);
    let mut from_two = collect_messages(&channel.port1);

    for i in 0..5 {
        channel.port1.post_message(&Value::Int(i))?;
        channel.port2.post_message(&Value::Int(100 + i))?;
    }
    for i in 0..5 {
        assert!(structurally_equal(&next_event(&mut from_one).await.data, &Value::Int(i)));
        assert!(structurally_equal(
            &next_event(&mut from_two).await.data,
            &Value::Int(100 + i)
        ));
    }
    assert!(ctx.transport.stats().envelopes_posted >= 10);
    Ok(())
}

#[tokio::test]
async fn buffer_transfer_moves_contents_and_detaches_source() -> anyhow::Result<()> {
    let ctx = test_context();
    let channel = MessageChannel::new(&ctx);
    let mut events = collect_messages(&channel.port2);

    let buffer = SharedBuffer::from_slice(b"ten bytes!");
    let map = SharedMap::new();
    map.insert("buf", Value::Buffer(buffer.clone()));

    channel
        .port1
        .post_message_with(&Value::Map(map), vec![TransferEntry::from(buffer.clone())])?;

    // Detached from the instant serialization captured it.
    assert!(buffer.is_detached());
    assert_eq!(buffer.len(), 0);

    let event = next_event(&mut events).await;
    let Value::Map(received) = &event.data else {
        panic!("expected map");
    };
    let Some(Value::Buffer(landed)) = received.get("buf") else {
        panic!("expected buffer");
    };
    assert_eq!(landed.snapshot().unwrap(), b"ten bytes!".to_vec());
    assert!(event.ports.is_empty());
    Ok(())
}

#[tokio::test]
async fn port_transfer_invalidates_source_and_rebinds_at_receiver() -> anyhow::Result<()> {
    let ctx = test_context();
    let main = MessageChannel::new(&ctx);
    let side = MessageChannel::new(&ctx);
    let (side_a, side_b) = side.into_ports();

    let mut main_events = collect_messages(&main.port2);

    // Ship side_a through the main channel.
    main.port1
        .post_message_with(&side_a.as_value(), vec![TransferEntry::from(side_a.clone())])?;

    // The local handle died during serialization, before delivery.
    assert!(side_a.is_closed());
    side_a.post_message(&Value::Int(0))?; // fire into the void
    side_a.close(); // no-op

    let event = next_event(&mut main_events).await;
    assert_eq!(event.ports.len(), 1);
    let transferred = &event.ports[0];
    assert!(!transferred.is_closed());

    // The value graph slot resolves to the same rebound port.
    let from_value = MessagePort::from_value(&event.data).unwrap();
    assert_eq!(from_value.identity(), transferred.identity());

    // Still entangled with side_b, in both directions.
    let mut via_transferred = collect_messages(transferred);
    let mut via_side_b = collect_messages(&side_b);
    side_b.post_message(&Value::Text("hello".into()))?;
    transferred.post_message(&Value::Text("back".into()))?;

    assert!(structurally_equal(
        &next_event(&mut via_transferred).await.data,
        &Value::Text("hello".into())
    ));
    assert!(structurally_equal(
        &next_event(&mut via_side_b).await.data,
        &Value::Text("back".into())
    ));
    Ok(())
}

#[tokio::test]
async fn mixed_transfer_list_keeps_descriptor_order_for_ports() -> anyhow::Result<()> {
    let ctx = test_context();
    let main = MessageChannel::new(&ctx);
    let extra1 = MessageChannel::new(&ctx);
    let extra2 = MessageChannel::new(&ctx);
    let mut events = collect_messages(&main.port2);

    let buffer = SharedBuffer::from_slice(&[1, 2]);
    let payload = SharedMap::new();
    payload.insert("first", extra1.port1.as_value());
    payload.insert("second", extra2.port1.as_value());
    payload.insert("bytes", Value::Buffer(buffer.clone()));

    main.port1.post_message_with(
        &Value::Map(payload),
        vec![
            TransferEntry::from(extra1.port1.clone()),
            TransferEntry::from(buffer),
            TransferEntry::from(extra2.port1.clone()),
        ],
    )?;

    let event = next_event(&mut events).await;
    // Buffers never appear in the ports list; port order follows the
    // transfer list.
    assert_eq!(event.ports.len(), 2);
    let Value::Map(received) = &event.data else {
        panic!("expected map");
    };
    let first = MessagePort::from_value(&received.get("first").unwrap()).unwrap();
    assert_eq!(first.identity(), event.ports[0].identity());
    let second = MessagePort::from_value(&received.get("second").unwrap()).unwrap();
    assert_eq!(second.identity(), event.ports[1].identity());
    Ok(())
}

#[tokio::test]
async fn self_transfer_is_rejected_and_harmless() {
    let ctx = test_context();
    let channel = MessageChannel::new(&ctx);

    let err = channel
        .port1
        .post_message_with(&Value::Null, vec![TransferEntry::from(channel.port1.clone())])
        .unwrap_err();
    assert_matches!(
        err,
        ChannelError::DataClone(DataCloneError::TransferSource)
    );
    assert!(!channel.port1.is_closed());
}

#[tokio::test]
async fn double_and_detached_transfers_fail_before_any_delivery() {
    let ctx = test_context();
    let channel = MessageChannel::new(&ctx);
    let mut events = collect_messages(&channel.port2);

    let buffer = SharedBuffer::from_slice(&[1]);
    let err = channel
        .port1
        .post_message_with(
            &Value::Null,
            vec![TransferEntry::from(buffer.clone()), TransferEntry::from(buffer.clone())],
        )
        .unwrap_err();
    assert_matches!(err, ChannelError::DataClone(DataCloneError::DuplicateTransfer));
    assert!(!buffer.is_detached());

    buffer.detach();
    let err = channel
        .port1
        .post_message_with(&Value::Null, vec![TransferEntry::from(buffer)])
        .unwrap_err();
    assert_matches!(err, ChannelError::DataClone(DataCloneError::AlreadyDetached));

    // Nothing reached the peer.
    assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());
}

#[tokio::test]
async fn close_semantics_end_to_end() -> anyhow::Result<()> {
    let ctx = test_context();
    let channel = MessageChannel::new(&ctx);

    let closes = Arc::new(AtomicUsize::new(0));
    {
        let closes = Arc::clone(&closes);
        channel.port2.set_on_close(move || {
            closes.fetch_add(1, Ordering::SeqCst);
        });
    }
    let mut events = collect_messages(&channel.port2);

    // Messages posted before the peer closes still arrive.
    channel.port1.post_message(&Value::Int(1))?;
    channel.port1.close();
    assert!(structurally_equal(&next_event(&mut events).await.data, &Value::Int(1)));

    eventually(|| !channel.port2.is_started()).await;
    channel.port2.close();
    channel.port2.close();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    Ok(())
}
