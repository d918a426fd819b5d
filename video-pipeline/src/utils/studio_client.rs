use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use common::{
    error::AppError,
    storage::types::{
        media::{GeneratedContent, SubtitleTrack},
        trend::{Trend, WorkflowSettings},
    },
};
use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// HTTP client for the studio backend that scrapes trends and produces media.
#[derive(Clone, Debug)]
pub struct StudioClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct SpeakerIdResponse {
    #[serde(rename = "speakerId")]
    speaker_id: String,
}

#[derive(Serialize)]
struct AlignRequest<'a> {
    text: &'a str,
    audio: String,
}

#[derive(Serialize)]
struct BurnRequest<'a> {
    audio: String,
    subtitles: &'a str,
}

impl StudioClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| AppError::Validation(format!("invalid studio api url {base_url}: {e}")))?;
        // Url::join replaces the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InternalError(format!("invalid endpoint {path}: {e}")))
    }

    pub async fn scrape_trends(&self, settings: &WorkflowSettings) -> Result<Vec<Trend>, AppError> {
        let response = self
            .http
            .post(self.endpoint("scrape")?)
            .json(settings)
            .send()
            .await?;
        let trends: Vec<Trend> = check_status("scrape", response).await?.json().await?;
        debug!(count = trends.len(), "scraped trend candidates");
        Ok(trends)
    }

    pub async fn generate_content(&self, trend: &Trend) -> Result<GeneratedContent, AppError> {
        let response = self
            .http
            .post(self.endpoint("generate")?)
            .json(trend)
            .send()
            .await?;
        Ok(check_status("generate", response).await?.json().await?)
    }

    pub async fn speaker_id(&self) -> Result<String, AppError> {
        let response = self
            .http
            .get(self.endpoint("coquiSpeakerId")?)
            .send()
            .await?;
        let body: SpeakerIdResponse = check_status("coquiSpeakerId", response).await?.json().await?;
        Ok(body.speaker_id)
    }

    pub async fn text_to_speech(&self, text: &str, speaker_id: &str) -> Result<Bytes, AppError> {
        let response = self
            .http
            .get(self.endpoint("tts")?)
            .query(&[("text", text), ("speaker_id", speaker_id)])
            .send()
            .await?;
        Ok(check_status("tts", response).await?.bytes().await?)
    }

    pub async fn align_subtitles(&self, text: &str, audio: &Bytes) -> Result<SubtitleTrack, AppError> {
        let request = AlignRequest {
            text,
            audio: STANDARD.encode(audio),
        };
        let response = self
            .http
            .post(self.endpoint("align")?)
            .json(&request)
            .send()
            .await?;
        Ok(check_status("align", response).await?.json().await?)
    }

    pub async fn burn_video(&self, audio: &Bytes, subtitles: &SubtitleTrack) -> Result<Bytes, AppError> {
        let request = BurnRequest {
            audio: STANDARD.encode(audio),
            subtitles: &subtitles.srt,
        };
        let response = self
            .http
            .post(self.endpoint("burn")?)
            .json(&request)
            .send()
            .await?;
        Ok(check_status("burn", response).await?.bytes().await?)
    }
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::RemoteService(format!(
        "{endpoint} returned {status}: {}",
        body.trim()
    )))
}
