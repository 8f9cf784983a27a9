//! Session monitor events
//!
//! Typed events describing the session lifecycle, broadcast on an EventBus
//! for SSE transmission and diagnostics. Monitor events never touch the
//! sensor channel topics; they are a separate observation surface and
//! carry strictly more detail than the channel publishes.

use crate::model::SoilReading;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session lifecycle events
///
/// Events are broadcast via EventBus and serialized for SSE transmission
/// with an adjacent `type` tag for client-side filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A collection session opened
    ///
    /// Triggers:
    /// - SSE: show the session as active
    SessionStarted {
        /// Identifier of the new session
        session_id: Uuid,
        /// True when a start signal arrived mid-session (restart clears the buffer)
        restarted: bool,
        /// When the session opened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A telemetry reading was accepted into the session buffer
    ReadingBuffered {
        /// Session the reading belongs to
        session_id: Uuid,
        /// The reading as parsed from the wire
        reading: SoilReading,
        /// Buffer size including this reading
        buffered: usize,
        /// When the reading was buffered
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A session closed with data: averaged, classified, and published
    ///
    /// Triggers:
    /// - SSE: show the recommendation
    SessionCompleted {
        /// Identifier of the closed session
        session_id: Uuid,
        /// Element-wise mean over the session's readings
        average: SoilReading,
        /// Number of readings that contributed to the average
        sample_count: usize,
        /// Label returned by the classifier
        label: String,
        /// When aggregation finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A session closed with an empty buffer: nothing to average, nothing published
    SessionEmpty {
        /// Identifier of the closed session
        session_id: Uuid,
        /// When the session closed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Classification failed for a closed session; no channel publishes occurred
    ///
    /// The session itself has already settled back to idle; the next
    /// session is unaffected.
    ClassificationFailed {
        /// Identifier of the closed session
        session_id: Uuid,
        /// Human-readable failure description
        error: String,
        /// When the failure was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SessionEvent::SessionStarted { .. } => "SessionStarted",
            SessionEvent::ReadingBuffered { .. } => "ReadingBuffered",
            SessionEvent::SessionCompleted { .. } => "SessionCompleted",
            SessionEvent::SessionEmpty { .. } => "SessionEmpty",
            SessionEvent::ClassificationFailed { .. } => "ClassificationFailed",
        }
    }
}

/// Broadcast bus for session monitor events
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Capacity is the number of events buffered before slow subscribers
    /// start dropping old events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// Monitor events are advisory; it is acceptable for no component to be
    /// subscribed at emission time.
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
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

    fn sample_started() -> SessionEvent {
        SessionEvent::SessionStarted {
            session_id: Uuid::new_v4(),
            restarted: false,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_requires_subscriber() {
        let bus = EventBus::new(10);
        assert!(bus.emit(sample_started()).is_err());

        let _rx = bus.subscribe();
        assert_eq!(bus.emit(sample_started()).unwrap(), 1);
    }

    #[test]
    fn test_eventbus_emit_lossy_without_subscribers() {
        let bus = EventBus::new(2);
        // Should not panic even with nobody listening and the channel tiny
        for _ in 0..10 {
            bus.emit_lossy(sample_started());
        }
    }

    #[test]
    fn test_eventbus_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit_lossy(SessionEvent::SessionEmpty {
            session_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        });

        assert_eq!(rx1.try_recv().unwrap().event_type(), "SessionEmpty");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "SessionEmpty");
    }

    #[test]
    fn test_event_type_method() {
        let session_id = Uuid::new_v4();
        let timestamp = chrono::Utc::now();
        let events = vec![
            (
                SessionEvent::SessionStarted {
                    session_id,
                    restarted: true,
                    timestamp,
                },
                "SessionStarted",
            ),
            (
                SessionEvent::ReadingBuffered {
                    session_id,
                    reading: SoilReading::new(6.5, 42.0, 18.0, 12.0),
                    buffered: 2,
                    timestamp,
                },
                "ReadingBuffered",
            ),
            (
                SessionEvent::SessionCompleted {
                    session_id,
                    average: SoilReading::new(6.25, 41.0, 19.0, 11.0),
                    sample_count: 2,
                    label: "rice".to_string(),
                    timestamp,
                },
                "SessionCompleted",
            ),
            (
                SessionEvent::SessionEmpty {
                    session_id,
                    timestamp,
                },
                "SessionEmpty",
            ),
            (
                SessionEvent::ClassificationFailed {
                    session_id,
                    error: "scaler mismatch".to_string(),
                    timestamp,
                },
                "ClassificationFailed",
            ),
        ];

        for (event, expected_type) in events {
            assert_eq!(event.event_type(), expected_type);
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SessionEvent::SessionCompleted {
            session_id: Uuid::new_v4(),
            average: SoilReading::new(6.25, 41.0, 19.0, 11.0),
            sample_count: 2,
            label: "maize".to_string(),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"SessionCompleted\""));
        assert!(json.contains("\"label\":\"maize\""));
        assert!(json.contains("\"sample_count\":2"));

        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        match back {
            SessionEvent::SessionCompleted { average, .. } => {
                assert_eq!(average, SoilReading::new(6.25, 41.0, 19.0, 11.0));
            }
            _ => panic!("wrong event type deserialized"),
        }
    }
}
