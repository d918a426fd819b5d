use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    events::video_events,
    liveness::live,
    readiness::ready,
    videos::{download_video, get_video, list_videos, submit_custom, submit_trends},
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probes for k8s/systemd
    let health = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let videos = Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/trends", post(submit_trends))
        .route("/videos/custom", post(submit_custom))
        .route("/videos/events", get(video_events))
        .route("/videos/{id}", get(get_video))
        .route("/videos/{id}/download", get(download_video));

    health.merge(videos)
}
