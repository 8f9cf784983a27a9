//! # SoilSense Common Library
//!
//! Shared code for the SoilSense services including:
//! - Soil reading model and wire-format parsing
//! - Channel topic names (TopicMap)
//! - Wire-level message bus (MessageBus)
//! - Session monitor events (SessionEvent enum + EventBus)
//! - Common error types

pub mod bus;
pub mod error;
pub mod events;
pub mod model;
pub mod topics;

pub use error::{Error, Result};
pub use model::{SessionControl, SoilReading};
pub use topics::TopicMap;
