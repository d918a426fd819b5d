#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod pipeline;
pub mod utils;

use std::sync::Arc;

use common::{error::AppError, storage::store::StorageManager, utils::config::AppConfig};
pub use pipeline::{
    DefaultPipelineServices, PipelineConfig, PipelineServices, PipelineTuning, RetryPolicy,
    SubmissionOutcome, VideoPipeline,
};
use tracing::info;
use utils::studio_client::StudioClient;

/// Wires the HTTP-backed services and artifact storage described by `config`.
pub async fn build_pipeline(config: &AppConfig) -> Result<Arc<VideoPipeline>, AppError> {
    let client = StudioClient::new(&config.studio_api_url)?;
    let storage = StorageManager::new(config).await?;
    let pipeline_config = PipelineConfig::from_app_config(config);

    info!(
        studio_api_url = %config.studio_api_url,
        max_attempts = pipeline_config.tuning.max_attempts,
        retry_delay_ms = u64::try_from(pipeline_config.tuning.retry_delay.as_millis()).unwrap_or(u64::MAX),
        attempt_timeout_secs = ?config.attempt_timeout_secs,
        "video pipeline configured"
    );

    Ok(VideoPipeline::new(
        Arc::new(DefaultPipelineServices::new(client)),
        storage,
        pipeline_config,
    ))
}
