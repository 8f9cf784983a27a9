//! Message router
//!
//! Maps an inbound (topic, payload) wire message to a typed event for the
//! session state machine. Parsing is fail-soft by contract: a malformed
//! payload is logged and dropped, never changes session state, and never
//! halts subsequent message processing. Unrecognized topics pass through
//! silently since the bus carries this daemon's own outbound publishes too.

use soilsense_common::bus::WireMessage;
use soilsense_common::{SessionControl, SoilReading, TopicMap};
use tracing::{debug, warn};

/// A typed inbound event for the session state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundEvent {
    /// Session start/stop control signal
    Control(SessionControl),
    /// One telemetry reading
    Telemetry(SoilReading),
}

/// Stateless dispatcher from wire messages to session events
pub struct MessageRouter {
    topics: TopicMap,
}

impl MessageRouter {
    pub fn new(topics: TopicMap) -> Self {
        Self { topics }
    }

    /// Route a wire message to a session event
    ///
    /// Returns `None` when the message carries no event: unrecognized
    /// topics (debug-level, expected traffic) and unparseable payloads
    /// on recognized topics (warn-level, dropped).
    pub fn route(&self, message: &WireMessage) -> Option<InboundEvent> {
        if message.topic == self.topics.control {
            match SessionControl::from_wire(&message.payload) {
                Ok(control) => Some(InboundEvent::Control(control)),
                Err(e) => {
                    warn!("Dropping control message: {}", e);
                    None
                }
            }
        } else if message.topic == self.topics.telemetry {
            match SoilReading::from_wire(&message.payload) {
                Ok(reading) => Some(InboundEvent::Telemetry(reading)),
                Err(e) => {
                    warn!("Dropping telemetry message: {}", e);
                    None
                }
            }
        } else {
            debug!("Ignoring message on topic {:?}", message.topic);
            None
        }
    }
}
