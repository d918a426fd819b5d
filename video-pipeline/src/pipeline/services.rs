use async_trait::async_trait;
use bytes::Bytes;
use common::{
    error::AppError,
    storage::types::{
        media::{GeneratedContent, SubtitleTrack},
        trend::{Trend, WorkflowSettings},
    },
};

use crate::utils::studio_client::StudioClient;

/// Remote capabilities the pipeline depends on. Every call may fail transiently.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn discover_candidates(&self, settings: &WorkflowSettings)
        -> Result<Vec<Trend>, AppError>;

    async fn generate_content(&self, input: &Trend) -> Result<GeneratedContent, AppError>;

    async fn resolve_voice(&self) -> Result<String, AppError>;

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Bytes, AppError>;

    async fn align_subtitles(&self, text: &str, audio: &Bytes) -> Result<SubtitleTrack, AppError>;

    async fn render_video(&self, audio: &Bytes, subtitles: &SubtitleTrack)
        -> Result<Bytes, AppError>;
}

pub struct DefaultPipelineServices {
    client: StudioClient,
}

impl DefaultPipelineServices {
    pub fn new(client: StudioClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn discover_candidates(
        &self,
        settings: &WorkflowSettings,
    ) -> Result<Vec<Trend>, AppError> {
        self.client.scrape_trends(settings).await
    }

    async fn generate_content(&self, input: &Trend) -> Result<GeneratedContent, AppError> {
        self.client.generate_content(input).await
    }

    async fn resolve_voice(&self) -> Result<String, AppError> {
        self.client.speaker_id().await
    }

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Bytes, AppError> {
        self.client.text_to_speech(text, voice).await
    }

    async fn align_subtitles(&self, text: &str, audio: &Bytes) -> Result<SubtitleTrack, AppError> {
        self.client.align_subtitles(text, audio).await
    }

    async fn render_video(
        &self,
        audio: &Bytes,
        subtitles: &SubtitleTrack,
    ) -> Result<Bytes, AppError> {
        self.client.burn_video(audio, subtitles).await
    }
}
