use std::sync::Arc;

use common::{
    error::AppError,
    storage::types::{
        job::Stage,
        trend::{Trend, WorkflowSettings},
    },
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::VideoPipeline;

/// Result of asking the pipeline to take on a batch of candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Queued { job_ids: Vec<String> },
    NoCandidates,
}

impl VideoPipeline {
    /// Creates a job for each of the first `max_count` candidates and queues them
    /// for generation in order.
    pub fn submit_batch(
        self: &Arc<Self>,
        candidates: Vec<Trend>,
        max_count: usize,
    ) -> Result<SubmissionOutcome, AppError> {
        if max_count == 0 {
            return Err(AppError::Validation(
                "max_count must be at least 1".into(),
            ));
        }
        if candidates.is_empty() {
            info!("no candidates to submit");
            return Ok(SubmissionOutcome::NoCandidates);
        }

        let offered = candidates.len();
        let job_ids: Vec<String> = candidates
            .into_iter()
            .take(max_count)
            .map(|candidate| self.store.create(candidate))
            .collect();
        for job_id in &job_ids {
            self.enqueue(Stage::Generate, job_id.clone());
        }

        info!(offered, queued = job_ids.len(), "submitted batch");
        self.trigger(Stage::Generate);
        Ok(SubmissionOutcome::Queued { job_ids })
    }

    /// Queues a single user-supplied topic and returns its job id.
    pub fn submit_single(
        self: &Arc<Self>,
        topic: &str,
        description: &str,
    ) -> Result<String, AppError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::Validation("topic must not be empty".into()));
        }

        let job_id = self.store.create(Trend::custom(topic, description.trim()));
        self.enqueue(Stage::Generate, job_id.clone());
        info!(job_id = %job_id, topic, "submitted custom topic");
        self.trigger(Stage::Generate);
        Ok(job_id)
    }

    /// Asks the discovery service for candidates and submits up to
    /// `settings.max_videos` of them.
    ///
    /// A `max_videos` of zero falls back to the configured default. A discovery
    /// failure creates no jobs and is returned to the caller.
    #[instrument(skip_all, fields(geo = %settings.geo, max_videos = settings.max_videos))]
    pub async fn discover_and_submit(
        self: &Arc<Self>,
        settings: &WorkflowSettings,
    ) -> Result<SubmissionOutcome, AppError> {
        let mut settings = settings.clone();
        if settings.max_videos == 0 {
            settings.max_videos = self.config.default_max_videos.max(1);
        }

        let candidates = self
            .services
            .discover_candidates(&settings)
            .await
            .inspect_err(|err| warn!(error = %err, "trend discovery failed"))?;

        self.submit_batch(candidates, settings.max_videos)
    }
}
