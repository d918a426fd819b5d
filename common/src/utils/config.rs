use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_studio_api_url")]
    pub studio_api_url: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound for a single remote call. Unset means attempts may run indefinitely.
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
    #[serde(default = "default_max_videos")]
    pub default_max_videos: usize,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            studio_api_url: default_studio_api_url(),
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            storage: default_storage_kind(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            attempt_timeout_secs: None,
            default_max_videos: default_max_videos(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_studio_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_http_port() -> u16 {
    3000
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_max_videos() -> usize {
    5
}

fn default_event_buffer() -> usize {
    256
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
