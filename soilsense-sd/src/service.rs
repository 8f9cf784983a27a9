//! Session service
//!
//! Subscribes to the message bus and drives the session state machine from
//! a single consumption task, so inbound handling is serialized in delivery
//! order and the session is never touched concurrently. Effects returned by
//! the machine are executed inline before the next message is consumed:
//! aggregation, classification, and the five outbound publishes all happen
//! between two inbound messages.
//!
//! The service also maintains a `SessionStatus` snapshot for the HTTP
//! surface. Only the consumption task writes it; handlers read.

use crate::classify::Recommender;
use crate::error::Result;
use crate::router::MessageRouter;
use crate::session::{Phase, Session, SessionEffect};
use chrono::{DateTime, Utc};
use serde::Serialize;
use soilsense_common::bus::{MessageBus, WireMessage};
use soilsense_common::events::{EventBus, SessionEvent};
use soilsense_common::{SoilReading, TopicMap};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result of the most recently completed session
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub average: SoilReading,
    pub sample_count: usize,
    pub label: String,
    pub completed_at: DateTime<Utc>,
}

/// Snapshot of the session state for the HTTP surface
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub buffered: usize,
    pub last_outcome: Option<SessionOutcome>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            session_id: None,
            started_at: None,
            buffered: 0,
            last_outcome: None,
        }
    }
}

/// Drives the session state machine from the message bus
pub struct SessionService {
    bus: Arc<MessageBus>,
    events: Arc<EventBus>,
    recommender: Arc<dyn Recommender>,
    router: MessageRouter,
    topics: TopicMap,
    status: Arc<RwLock<SessionStatus>>,
}

impl SessionService {
    pub fn new(
        bus: Arc<MessageBus>,
        events: Arc<EventBus>,
        recommender: Arc<dyn Recommender>,
        topics: TopicMap,
    ) -> Self {
        Self {
            bus,
            events,
            recommender,
            router: MessageRouter::new(topics.clone()),
            topics,
            status: Arc::new(RwLock::new(SessionStatus::default())),
        }
    }

    /// Shared handle to the status snapshot, for the HTTP context
    pub fn status(&self) -> Arc<RwLock<SessionStatus>> {
        Arc::clone(&self.status)
    }

    /// Start the consumption loop
    ///
    /// The bus subscription is created here, before the task is spawned,
    /// so every message published after `start` returns is observed.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let rx = self.bus.subscribe();
        let service = self.clone_handles();
        info!("Session service consuming from the message bus");
        tokio::spawn(async move {
            service.consume_loop(rx).await;
            info!("Session service loop exited");
        })
    }

    fn clone_handles(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
            events: Arc::clone(&self.events),
            recommender: Arc::clone(&self.recommender),
            router: MessageRouter::new(self.topics.clone()),
            topics: self.topics.clone(),
            status: Arc::clone(&self.status),
        }
    }

    /// Single consumer of inbound messages; owns the session exclusively
    async fn consume_loop(&self, mut rx: broadcast::Receiver<WireMessage>) {
        let mut session = Session::new();
        loop {
            match rx.recv().await {
                Ok(message) => self.handle_message(&mut session, message).await,
                Err(RecvError::Lagged(missed)) => {
                    warn!(
                        "Consumption loop lagged behind the bus; {} messages lost",
                        missed
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn handle_message(&self, session: &mut Session, message: WireMessage) {
        let Some(event) = self.router.route(&message) else {
            return;
        };

        let effects = session.apply(event);

        // Snapshot the post-transition state before executing effects, so
        // anything observing an effect sees the state that produced it
        {
            let mut status = self.status.write().await;
            status.phase = session.phase();
            status.session_id = session.session_id();
            status.started_at = session.started_at();
            status.buffered = session.buffered();
        }

        for effect in effects {
            self.execute(effect).await;
        }
    }

    async fn execute(&self, effect: SessionEffect) {
        let timestamp = Utc::now();
        match effect {
            SessionEffect::Opened {
                session_id,
                restarted,
            } => {
                self.events.emit_lossy(SessionEvent::SessionStarted {
                    session_id,
                    restarted,
                    timestamp,
                });
            }

            SessionEffect::Buffered {
                session_id,
                reading,
                count,
            } => {
                self.events.emit_lossy(SessionEvent::ReadingBuffered {
                    session_id,
                    reading,
                    buffered: count,
                    timestamp,
                });
            }

            SessionEffect::ClosedEmpty { session_id } => {
                self.events.emit_lossy(SessionEvent::SessionEmpty {
                    session_id,
                    timestamp,
                });
            }

            SessionEffect::Closed {
                session_id,
                average,
                sample_count,
            } => match self.recommend(average) {
                Ok(label) => {
                    self.publish_outcome(average, &label);
                    info!(
                        "Session {}: averaged {} readings, recommending {:?}",
                        session_id, sample_count, label
                    );
                    self.status.write().await.last_outcome = Some(SessionOutcome {
                        session_id,
                        average,
                        sample_count,
                        label: label.clone(),
                        completed_at: timestamp,
                    });
                    self.events.emit_lossy(SessionEvent::SessionCompleted {
                        session_id,
                        average,
                        sample_count,
                        label,
                        timestamp,
                    });
                }
                Err(e) => {
                    // Aggregation aborts; the session has already settled
                    // to idle and the next session is unaffected
                    error!(
                        "Session {}: classification failed, publishing nothing: {}",
                        session_id, e
                    );
                    self.events.emit_lossy(SessionEvent::ClassificationFailed {
                        session_id,
                        error: e.to_string(),
                        timestamp,
                    });
                }
            },
        }
    }

    fn recommend(&self, average: SoilReading) -> Result<String> {
        let scaled = self.recommender.scale(average)?;
        self.recommender.classify(scaled)
    }

    /// Five independent best-effort publishes; order mirrors the original
    /// dispatch (N, P, K, pH, label)
    fn publish_outcome(&self, average: SoilReading, label: &str) {
        self.bus.publish(WireMessage::new(
            self.topics.nitrogen.as_str(),
            average.nitrogen.to_string(),
        ));
        self.bus.publish(WireMessage::new(
            self.topics.phosphorus.as_str(),
            average.phosphorus.to_string(),
        ));
        self.bus.publish(WireMessage::new(
            self.topics.potassium.as_str(),
            average.potassium.to_string(),
        ));
        self.bus.publish(WireMessage::new(
            self.topics.ph.as_str(),
            average.ph.to_string(),
        ));
        self.bus
            .publish(WireMessage::new(self.topics.prediction.as_str(), label));
    }
}
