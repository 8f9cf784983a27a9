//! Wire-level message bus
//!
//! The in-process realization of the sensor channel: a topic-keyed pub/sub
//! hub over `tokio::sync::broadcast`. Every subscriber observes every
//! message in publication order and filters by topic itself; publishing
//! never blocks and never fails, even with zero subscribers (best-effort
//! channel semantics, no delivery confirmation).
//!
//! Slow subscribers lag rather than applying back-pressure: once a receiver
//! falls more than the bus capacity behind, it skips to the oldest retained
//! message and is told how many it missed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A raw message on the sensor channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Topic the message was published under (case-sensitive)
    pub topic: String,
    /// Raw payload bytes; the channel imposes no encoding
    pub payload: Vec<u8>,
}

impl WireMessage {
    /// Construct a message for a topic
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8 text, if it is valid UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Topic-keyed pub/sub hub for wire messages
pub struct MessageBus {
    tx: broadcast::Sender<WireMessage>,
    capacity: usize,
}

impl MessageBus {
    /// Creates a new MessageBus with the given channel capacity
    ///
    /// Capacity is the number of messages retained for slow subscribers
    /// before they start lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future messages on all topics
    ///
    /// Messages published before subscription are not received. Receivers
    /// filter by `WireMessage::topic` themselves.
    pub fn subscribe(&self) -> broadcast::Receiver<WireMessage> {
        self.tx.subscribe()
    }

    /// Publish a message to all current subscribers
    ///
    /// Lossy by contract: a message published while nobody is subscribed is
    /// silently dropped, matching the channel's best-effort semantics.
    pub fn publish(&self, message: WireMessage) {
        let _ = self.tx.send(message);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_bus_new() {
        let bus = MessageBus::new(64);
        assert_eq!(bus.capacity(), 64);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = MessageBus::new(8);
        // Must not panic or error
        bus.publish(WireMessage::new("sensor/state", "1"));
    }

    #[test]
    fn test_subscriber_receives_in_publication_order() {
        let bus = MessageBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(WireMessage::new("sensor/state", "1"));
        bus.publish(WireMessage::new("sensor/tanah", r#"{"PH": 6.0}"#));
        bus.publish(WireMessage::new("sensor/state", "0"));

        assert_eq!(rx.try_recv().unwrap().topic, "sensor/state");
        assert_eq!(rx.try_recv().unwrap().topic, "sensor/tanah");
        let third = rx.try_recv().unwrap();
        assert_eq!(third.topic, "sensor/state");
        assert_eq!(third.payload_str(), Some("0"));
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn test_all_subscribers_see_every_message() {
        let bus = MessageBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(WireMessage::new("sensor/N", "41"));

        assert_eq!(rx1.try_recv().unwrap().payload_str(), Some("41"));
        assert_eq!(rx2.try_recv().unwrap().payload_str(), Some("41"));
    }

    #[test]
    fn test_late_subscriber_misses_earlier_messages() {
        let bus = MessageBus::new(16);
        bus.publish(WireMessage::new("sensor/state", "1"));

        let mut rx = bus.subscribe();
        bus.publish(WireMessage::new("sensor/state", "0"));

        assert_eq!(rx.try_recv().unwrap().payload_str(), Some("0"));
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn test_slow_subscriber_lags_instead_of_blocking() {
        let bus = MessageBus::new(2);
        let mut rx = bus.subscribe();

        for i in 0..5 {
            bus.publish(WireMessage::new("sensor/tanah", format!("{{\"N\": {}}}", i)));
        }

        // Receiver fell behind; first recv reports the lag
        match rx.try_recv() {
            Err(TryRecvError::Lagged(missed)) => assert_eq!(missed, 3),
            other => panic!("expected lag, got {:?}", other),
        }
        // Then delivery resumes from the oldest retained message
        assert_eq!(rx.try_recv().unwrap().payload_str(), Some(r#"{"N": 3}"#));
        assert_eq!(rx.try_recv().unwrap().payload_str(), Some(r#"{"N": 4}"#));
    }

    #[test]
    fn test_payload_str_on_binary_payload() {
        let msg = WireMessage::new("sensor/tanah", vec![0xFF, 0xFE]);
        assert_eq!(msg.payload_str(), None);
    }
}
