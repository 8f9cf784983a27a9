//! Session state machine
//!
//! Owns the collection window and the reading buffer. `Session::apply` is
//! a pure transition with respect to the outside world: it mutates only the
//! session itself and describes everything else as returned effects, which
//! the service loop executes. That keeps the core testable without a live
//! channel or classifier.
//!
//! One session at a time. A start signal always opens a fresh window and
//! clears the buffer, even mid-session (a restart equals a new session).
//! A stop signal while idle is a guarded no-op.

use crate::router::InboundEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soilsense_common::{SessionControl, SoilReading};
use tracing::{debug, info};
use uuid::Uuid;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No session active; telemetry is discarded
    Idle,
    /// A session is active; telemetry is buffered
    Collecting,
}

/// Side effects requested by a session transition
///
/// Effects carry everything the executor needs so it never has to reach
/// back into the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// A collection window opened (or reopened mid-session)
    Opened { session_id: Uuid, restarted: bool },

    /// A reading entered the buffer
    Buffered {
        session_id: Uuid,
        reading: SoilReading,
        count: usize,
    },

    /// The window closed with data: average, classify, publish
    Closed {
        session_id: Uuid,
        average: SoilReading,
        sample_count: usize,
    },

    /// The window closed with an empty buffer; nothing to publish
    ClosedEmpty { session_id: Uuid },
}

/// An active collection window
struct Window {
    session_id: Uuid,
    started_at: DateTime<Utc>,
}

/// The session state machine
///
/// Exclusively owned by the service consumption loop; nothing else mutates
/// it. The buffer is non-empty only while a window is open.
pub struct Session {
    window: Option<Window>,
    buffer: Vec<SoilReading>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            window: None,
            buffer: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.window.is_some() {
            Phase::Collecting
        } else {
            Phase::Idle
        }
    }

    /// Identifier of the active window, if any
    pub fn session_id(&self) -> Option<Uuid> {
        self.window.as_ref().map(|w| w.session_id)
    }

    /// When the active window opened, if any
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.window.as_ref().map(|w| w.started_at)
    }

    /// Number of readings buffered in the active window
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Apply one inbound event and return the effects to execute
    ///
    /// Events must be applied in delivery order; the machine is
    /// non-reentrant by ownership.
    pub fn apply(&mut self, event: InboundEvent) -> Vec<SessionEffect> {
        match event {
            InboundEvent::Control(SessionControl::Start) => self.open(),
            InboundEvent::Control(SessionControl::Stop) => self.close(),
            InboundEvent::Telemetry(reading) => self.buffer_reading(reading),
        }
    }

    /// Start signal: open a fresh window, clearing any buffered readings
    fn open(&mut self) -> Vec<SessionEffect> {
        let restarted = self.window.is_some();
        let session_id = Uuid::new_v4();

        self.buffer.clear();
        self.window = Some(Window {
            session_id,
            started_at: Utc::now(),
        });

        if restarted {
            info!("Session {} started (restart, buffer cleared)", session_id);
        } else {
            info!("Session {} started", session_id);
        }
        vec![SessionEffect::Opened {
            session_id,
            restarted,
        }]
    }

    /// Stop signal: close the window and drain the buffer
    fn close(&mut self) -> Vec<SessionEffect> {
        let Some(window) = self.window.take() else {
            debug!("Stop signal while idle; ignoring");
            return Vec::new();
        };

        let readings = std::mem::take(&mut self.buffer);
        match SoilReading::mean(&readings) {
            Some(average) => {
                info!(
                    "Session {} closed with {} readings",
                    window.session_id,
                    readings.len()
                );
                vec![SessionEffect::Closed {
                    session_id: window.session_id,
                    average,
                    sample_count: readings.len(),
                }]
            }
            None => {
                info!("Session {} closed: no data to process", window.session_id);
                vec![SessionEffect::ClosedEmpty {
                    session_id: window.session_id,
                }]
            }
        }
    }

    /// Telemetry: buffer while collecting, discard while idle
    fn buffer_reading(&mut self, reading: SoilReading) -> Vec<SessionEffect> {
        let Some(window) = &self.window else {
            debug!("Discarding telemetry while idle");
            return Vec::new();
        };

        self.buffer.push(reading);
        debug!(
            "Session {}: buffered reading {} of window",
            window.session_id,
            self.buffer.len()
        );
        vec![SessionEffect::Buffered {
            session_id: window.session_id,
            reading,
            count: self.buffer.len(),
        }]
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> InboundEvent {
        InboundEvent::Control(SessionControl::Start)
    }

    fn stop() -> InboundEvent {
        InboundEvent::Control(SessionControl::Stop)
    }

    fn telemetry(ph: f64, n: f64, p: f64, k: f64) -> InboundEvent {
        InboundEvent::Telemetry(SoilReading::new(ph, n, p, k))
    }

    #[test]
    fn test_initial_state_is_idle() {
        let session = Session::new();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.buffered(), 0);
        assert!(session.session_id().is_none());
        assert!(session.started_at().is_none());
    }

    #[test]
    fn test_start_opens_a_window() {
        let mut session = Session::new();
        let effects = session.apply(start());

        assert_eq!(session.phase(), Phase::Collecting);
        assert!(session.session_id().is_some());
        assert!(session.started_at().is_some());
        match effects.as_slice() {
            [SessionEffect::Opened {
                session_id,
                restarted,
            }] => {
                assert_eq!(Some(*session_id), session.session_id());
                assert!(!restarted);
            }
            other => panic!("expected Opened, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_while_idle_is_a_no_op() {
        let mut session = Session::new();
        let effects = session.apply(stop());
        assert!(effects.is_empty());
        assert_eq!(session.phase(), Phase::Idle);

        // Still a no-op after a completed session
        session.apply(start());
        session.apply(telemetry(6.0, 40.0, 20.0, 10.0));
        session.apply(stop());
        let effects = session.apply(stop());
        assert!(effects.is_empty());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_telemetry_while_idle_is_discarded() {
        let mut session = Session::new();
        let effects = session.apply(telemetry(9.9, 99.0, 99.0, 99.0));
        assert!(effects.is_empty());
        assert_eq!(session.buffered(), 0);

        // A later session must not see the discarded reading
        session.apply(start());
        session.apply(telemetry(6.0, 40.0, 20.0, 10.0));
        let effects = session.apply(stop());
        match effects.as_slice() {
            [SessionEffect::Closed {
                average,
                sample_count,
                ..
            }] => {
                assert_eq!(*sample_count, 1);
                assert_eq!(*average, SoilReading::new(6.0, 40.0, 20.0, 10.0));
            }
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[test]
    fn test_telemetry_while_collecting_is_buffered() {
        let mut session = Session::new();
        session.apply(start());
        let id = session.session_id();

        let effects = session.apply(telemetry(6.0, 40.0, 20.0, 10.0));
        match effects.as_slice() {
            [SessionEffect::Buffered {
                session_id,
                reading,
                count,
            }] => {
                assert_eq!(Some(*session_id), id);
                assert_eq!(*reading, SoilReading::new(6.0, 40.0, 20.0, 10.0));
                assert_eq!(*count, 1);
            }
            other => panic!("expected Buffered, got {:?}", other),
        }

        session.apply(telemetry(6.5, 42.0, 18.0, 12.0));
        assert_eq!(session.buffered(), 2);
    }

    #[test]
    fn test_restart_clears_buffer_and_changes_identity() {
        let mut session = Session::new();
        session.apply(start());
        let first_id = session.session_id();
        session.apply(telemetry(9.0, 90.0, 90.0, 90.0));
        assert_eq!(session.buffered(), 1);

        let effects = session.apply(start());
        assert_eq!(session.buffered(), 0, "restart must clear the buffer");
        assert_ne!(session.session_id(), first_id, "restart opens a new window");
        match effects.as_slice() {
            [SessionEffect::Opened { restarted, .. }] => assert!(restarted),
            other => panic!("expected Opened, got {:?}", other),
        }

        // Only post-restart readings contribute to the average
        session.apply(telemetry(6.0, 40.0, 20.0, 10.0));
        let effects = session.apply(stop());
        match effects.as_slice() {
            [SessionEffect::Closed {
                average,
                sample_count,
                ..
            }] => {
                assert_eq!(*sample_count, 1);
                assert_eq!(*average, SoilReading::new(6.0, 40.0, 20.0, 10.0));
            }
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_session_closes_without_data() {
        let mut session = Session::new();
        session.apply(start());
        let id = session.session_id();

        let effects = session.apply(stop());
        match effects.as_slice() {
            [SessionEffect::ClosedEmpty { session_id }] => {
                assert_eq!(Some(*session_id), id);
            }
            other => panic!("expected ClosedEmpty, got {:?}", other),
        }
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.session_id().is_none());
    }

    #[test]
    fn test_close_averages_buffered_readings() {
        let mut session = Session::new();
        session.apply(start());
        session.apply(telemetry(6.0, 40.0, 20.0, 10.0));
        session.apply(telemetry(6.5, 42.0, 18.0, 12.0));

        let effects = session.apply(stop());
        match effects.as_slice() {
            [SessionEffect::Closed {
                average,
                sample_count,
                ..
            }] => {
                assert_eq!(*sample_count, 2);
                assert_eq!(*average, SoilReading::new(6.25, 41.0, 19.0, 11.0));
            }
            other => panic!("expected Closed, got {:?}", other),
        }
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut session = Session::new();

        session.apply(start());
        session.apply(telemetry(4.0, 10.0, 10.0, 10.0));
        session.apply(stop());

        session.apply(start());
        session.apply(telemetry(8.0, 80.0, 80.0, 80.0));
        let effects = session.apply(stop());

        match effects.as_slice() {
            [SessionEffect::Closed {
                average,
                sample_count,
                ..
            }] => {
                assert_eq!(*sample_count, 1, "first session must not leak readings");
                assert_eq!(*average, SoilReading::new(8.0, 80.0, 80.0, 80.0));
            }
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[test]
    fn test_mean_over_many_readings() {
        let mut session = Session::new();
        session.apply(start());
        for i in 1..=10 {
            let x = i as f64;
            session.apply(telemetry(x, 2.0 * x, 3.0 * x, 4.0 * x));
        }

        let effects = session.apply(stop());
        match effects.as_slice() {
            [SessionEffect::Closed {
                average,
                sample_count,
                ..
            }] => {
                assert_eq!(*sample_count, 10);
                // mean of 1..=10 is 5.5
                assert!((average.ph - 5.5).abs() < 1e-9);
                assert!((average.nitrogen - 11.0).abs() < 1e-9);
                assert!((average.phosphorus - 16.5).abs() < 1e-9);
                assert!((average.potassium - 22.0).abs() < 1e-9);
            }
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Phase::Idle).unwrap(), "\"idle\"");
        assert_eq!(
            serde_json::to_string(&Phase::Collecting).unwrap(),
            "\"collecting\""
        );
    }
}
