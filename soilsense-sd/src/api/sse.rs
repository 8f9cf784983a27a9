//! Server-Sent Events (SSE) broadcasters
//!
//! Streams session monitor events and raw channel topics to connected
//! clients. Both endpoints ride the broadcast buses: a slow client lags
//! and loses messages rather than slowing the pipeline down.

use crate::api::server::AppContext;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::borrow::Cow;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// One channel message as delivered to SSE subscribers
#[derive(Serialize)]
struct TopicFrame<'a> {
    topic: &'a str,
    /// Payload as text; non-UTF-8 bytes are replaced
    payload: Cow<'a, str>,
}

/// GET /events - monitor event stream
///
/// Each session event becomes one SSE event named by its type, with the
/// JSON form as data.
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE monitor client connected");

    // Subscribe to the monitor broadcast
    let rx = ctx.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                Err(e) => {
                    warn!("Failed to serialize session event: {}", e);
                    None
                }
            },
            Err(e) => {
                // BroadcastStream error (lagged or closed)
                warn!("SSE monitor stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(keep_alive())
}

/// GET /subscribe/{topic} - channel topic stream
///
/// Each bus message on the requested topic becomes one SSE event carrying
/// a JSON `TopicFrame`. Messages on other topics are skipped.
pub async fn topic_stream(
    State(ctx): State<AppContext>,
    Path(topic): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE subscriber for topic {:?}", topic);

    let mut rx = ctx.bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(message) if message.topic == topic => {
                    let frame = TopicFrame {
                        topic: &message.topic,
                        payload: String::from_utf8_lossy(&message.payload),
                    };
                    match Event::default().json_data(&frame) {
                        Ok(event) => yield Ok(event),
                        Err(e) => warn!("Failed to serialize topic frame: {}", e),
                    }
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(
                        "SSE subscriber for {:?} lagged; {} messages lost",
                        topic, missed
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(keep_alive())
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}
