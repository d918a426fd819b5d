use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use futures::{Stream, StreamExt};
use tracing::error;

use crate::api_state::ApiState;

/// Streams the full job list as a `snapshot` event now and after every change.
pub async fn video_events(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let snapshots = state.pipeline.observe();

    let sse_stream = async_stream::stream! {
        let mut snapshots = std::pin::pin!(snapshots);
        while let Some(jobs) = snapshots.next().await {
            match Event::default().event("snapshot").json_data(&jobs) {
                Ok(event) => yield Ok::<_, Infallible>(event),
                Err(e) => error!("Failed to encode job snapshot: {:?}", e),
            }
        }
    };

    Sse::new(sse_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive-ping"),
    )
}
