use std::sync::Arc;

use common::{error::AppError, utils::config::AppConfig};
use video_pipeline::{build_pipeline, VideoPipeline};

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<VideoPipeline>,
}

impl ApiState {
    pub async fn new(config: &AppConfig) -> Result<Self, AppError> {
        let pipeline = build_pipeline(config).await?;

        Ok(Self { pipeline })
    }
}
