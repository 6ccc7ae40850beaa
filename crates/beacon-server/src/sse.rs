//! Server-sent events handler for the live status stream

use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use beacon_sentinel::HealthSnapshot;
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// SSE handler: health snapshots as they are published
///
/// The current snapshot goes out immediately on connect, so a client
/// never waits a full probe cycle to learn the present state. After
/// that, one event per published snapshot. A subscriber that falls
/// behind loses the dropped frames and keeps receiving; only the most
/// recent state matters.
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = state.health.read().await.clone();
    tracing::debug!(
        "SSE subscriber connected ({} already listening)",
        state.status.subscriber_count()
    );

    let updates =
        BroadcastStream::new(state.status.subscribe()).filter_map(|update| async move {
            match update {
                Ok(snapshot) => Some(snapshot_event(&snapshot)),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::debug!("SSE subscriber lagged, {} snapshots dropped", missed);
                    None
                }
            }
        });

    let stream = stream::once(async move { snapshot_event(&initial) }).chain(updates);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Serialize a snapshot into one SSE frame
fn snapshot_event(snapshot: &HealthSnapshot) -> Result<Event, Infallible> {
    let data = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    Ok(Event::default().data(data))
}
