//! # SoilSense Session Daemon Library (soilsense-sd)
//!
//! Turns a stream of irregular soil telemetry and start/stop control
//! signals into exactly one crop recommendation per session.
//!
//! **Pipeline:** wire messages arrive on the MessageBus, the router turns
//! them into typed events, the session state machine buffers readings while
//! a session is active, and on session close the averaged reading is scaled,
//! classified, and republished as five independent channel messages.
//!
//! **Surface:** an axum HTTP adapter exposes the channel (publish +
//! SSE subscribe), the session snapshot, and the monitor event stream.

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod router;
pub mod service;
pub mod session;

pub use error::{Error, Result};
