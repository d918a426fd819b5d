use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use common::{
    error::AppError,
    storage::types::{
        job::{Job, JobStatus},
        trend::{CustomTopic, WorkflowSettings},
    },
};
use serde_json::json;
use tracing::info;
use video_pipeline::SubmissionOutcome;

use crate::{api_state::ApiState, error::ApiError};

/// Discovers trending topics and queues up to `maxVideos` of them.
///
/// Without a body the configured default count and filters are used.
pub async fn submit_trends(
    State(state): State<ApiState>,
    body: Option<Json<WorkflowSettings>>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = body.map_or_else(
        || WorkflowSettings {
            max_videos: state.pipeline.config().default_max_videos,
            ..Default::default()
        },
        |Json(settings)| settings,
    );

    let outcome = state.pipeline.discover_and_submit(&settings).await?;
    let status = match &outcome {
        SubmissionOutcome::Queued { job_ids } => {
            info!(queued = job_ids.len(), "trend batch accepted");
            StatusCode::ACCEPTED
        }
        SubmissionOutcome::NoCandidates => StatusCode::OK,
    };

    Ok((status, Json(outcome)))
}

pub async fn submit_custom(
    State(state): State<ApiState>,
    Json(topic): Json<CustomTopic>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id = state
        .pipeline
        .submit_single(&topic.topic, &topic.description)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "queued", "job_id": job_id })),
    ))
}

pub async fn list_videos(State(state): State<ApiState>) -> Json<Vec<Job>> {
    Json(state.pipeline.snapshot())
}

pub async fn get_video(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(find_job(&state, &id)?))
}

pub async fn download_video(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = find_job(&state, &id)?;
    let location = match (&job.status, job.artifact_ref) {
        (JobStatus::Completed, Some(location)) => location,
        _ => {
            return Err(AppError::NotFound(format!(
                "video for job {id} is not ready ({})",
                job.status.display_label()
            ))
            .into())
        }
    };

    let video = state
        .pipeline
        .storage()
        .get(&location)
        .await
        .map_err(AppError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{id}.mp4\""),
            ),
        ],
        video,
    ))
}

fn find_job(state: &ApiState, id: &str) -> Result<Job, AppError> {
    state
        .pipeline
        .store()
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("video job {id}")))
}
