//! HTTP/SSE surface for the session daemon
//!
//! Exposes the sensor channel to external processes (publish + SSE
//! subscribe), the session status snapshot, and the monitor event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, AppContext};
