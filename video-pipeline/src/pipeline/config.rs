use std::time::Duration;

use common::utils::config::AppConfig;

#[derive(Debug, Clone)]
pub struct PipelineTuning {
    /// Attempts per stage operation, the first try included.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub attempt_timeout: Option<Duration>,
    pub event_buffer: usize,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            attempt_timeout: None,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub tuning: PipelineTuning,
    pub default_max_videos: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tuning: PipelineTuning::default(),
            default_max_videos: 5,
        }
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: PipelineTuning {
                max_attempts: config.max_attempts.max(1),
                retry_delay: Duration::from_millis(config.retry_delay_ms),
                attempt_timeout: config.attempt_timeout_secs.map(Duration::from_secs),
                event_buffer: config.event_buffer,
            },
            default_max_videos: config.default_max_videos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_maps_onto_tuning() {
        let app = AppConfig {
            max_attempts: 0,
            retry_delay_ms: 250,
            attempt_timeout_secs: Some(30),
            ..Default::default()
        };

        let config = PipelineConfig::from_app_config(&app);

        assert_eq!(config.tuning.max_attempts, 1);
        assert_eq!(config.tuning.retry_delay, Duration::from_millis(250));
        assert_eq!(config.tuning.attempt_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.default_max_videos, 5);
    }
}
