//! Shared helpers for the end-to-end channel tests.

use std::time::Duration;

use message_channel::{ChannelContext, MessageEvent, MessagePort};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Installs a tracing subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_context() -> ChannelContext {
    init_tracing();
    ChannelContext::in_process()
}

/// Funnels a port's "message" events into a channel the test can await.
pub fn collect_messages(port: &MessagePort) -> mpsc::UnboundedReceiver<MessageEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    port.on_message(move |event| {
        let _ = tx.send(event);
    });
    rx
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<MessageEvent>) -> MessageEvent {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for message event")
        .expect("event stream ended")
}

/// Polls `cond` until it holds or a deadline passes.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
