//! Deep-copy guarantees observed through the public surface: aliasing in
//! cloned graphs, and the isolation of posted values from later mutation
//! on the sending side.

use channel_e2e_tests::{collect_messages, next_event, test_context};
use message_channel::{structured_clone, MessageChannel, StructuredCloneOptions};
use types::{structurally_equal, SharedList, SharedMap, Value};

#[tokio::test]
async fn clone_preserves_aliasing_between_subtrees() {
    let ctx = test_context();
    let shared = SharedList::from_values([Value::Int(1)]);
    let map = SharedMap::new();
    map.insert("a", Value::List(shared.clone()));
    map.insert("b", Value::List(shared));

    let copy = structured_clone(&Value::Map(map), StructuredCloneOptions::default(), &ctx).unwrap();
    let Value::Map(copy) = copy else {
        panic!("expected map");
    };
    let (Some(Value::List(a)), Some(Value::List(b))) = (copy.get("a"), copy.get("b")) else {
        panic!("expected lists");
    };
    assert_eq!(a.identity(), b.identity());

    // One shared copy, so a write through either handle shows in both.
    a.push(Value::Int(2));
    assert_eq!(b.len(), 2);
}

#[tokio::test]
async fn posted_value_is_snapshotted_at_post_time() -> anyhow::Result<()> {
    let ctx = test_context();
    let channel = MessageChannel::new(&ctx);
    let mut events = collect_messages(&channel.port2);

    let map = SharedMap::new();
    map.insert("n", Value::Int(1));
    channel.port1.post_message(&Value::Map(map.clone()))?;

    // Mutations after post must not leak into the delivered copy.
    map.insert("n", Value::Int(999));

    let event = next_event(&mut events).await;
    let Value::Map(received) = &event.data else {
        panic!("expected map");
    };
    assert!(structurally_equal(&received.get("n").unwrap(), &Value::Int(1)));
    Ok(())
}
