//! Server push channel abstraction.

use crate::error::EnvError;
use crate::types::PushEnvelope;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Source of server-pushed payloads for one page.
///
/// # Delivery
///
/// Envelopes arrive in the order the server produced them, at most once each.
/// `recv` returns `None` once the channel is closed (page teardown).
#[async_trait]
pub trait PushChannel: Send + Sync + 'static {
    /// Receives the next pushed envelope.
    async fn recv(&self) -> Option<PushEnvelope>;
}

/// In-process push channel backed by a tokio mpsc queue.
pub struct ChannelPush {
    rx: Mutex<mpsc::UnboundedReceiver<PushEnvelope>>,
}

/// Sending half of a `ChannelPush`. Stamps sequence numbers on send.
#[derive(Clone)]
pub struct PushSender {
    tx: mpsc::UnboundedSender<PushEnvelope>,
    next_sequence: Arc<AtomicU64>,
}

impl ChannelPush {
    /// Creates a connected sender/channel pair.
    pub fn pair() -> (PushSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = PushSender {
            tx,
            next_sequence: Arc::new(AtomicU64::new(0)),
        };
        (sender, Self { rx: Mutex::new(rx) })
    }
}

impl PushSender {
    /// Queues an envelope for delivery.
    pub fn send(&self, mut envelope: PushEnvelope) -> Result<u64, EnvError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        envelope.sequence = sequence;
        self.tx.send(envelope).map_err(|_| EnvError::ChannelClosed)?;
        Ok(sequence)
    }

    /// Queues a JSON payload under the given event name.
    pub fn send_json(&self, event: &str, payload: Vec<u8>) -> Result<u64, EnvError> {
        self.send(PushEnvelope::new(event, payload))
    }
}

#[async_trait]
impl PushChannel for ChannelPush {
    async fn recv(&self) -> Option<PushEnvelope> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_preserves_order_and_sequences() {
        let (sender, channel) = ChannelPush::pair();
        sender.send_json("map:init", b"{}".to_vec()).unwrap();
        sender.send_json("map:drawWeatherUpdate", b"{}".to_vec()).unwrap();
        drop(sender);

        let first = channel.recv().await.unwrap();
        let second = channel.recv().await.unwrap();
        assert_eq!(first.event, "map:init");
        assert_eq!(first.sequence, 0);
        assert_eq!(second.event, "map:drawWeatherUpdate");
        assert_eq!(second.sequence, 1);
        assert!(channel.recv().await.is_none());
    }

    #[test]
    fn test_send_after_close_fails() {
        let (sender, channel) = ChannelPush::pair();
        drop(channel);
        let result = sender.send_json("map:init", Vec::new());
        assert!(matches!(result, Err(EnvError::ChannelClosed)));
    }
}
