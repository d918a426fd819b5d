use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Script produced by the generation service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedContent {
    pub title: String,
    pub description: String,
    pub body: String,
}

/// Narration audio. Snapshots only expose its size; the payload stays in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SynthesizedAudio {
    #[serde(skip)]
    pub data: Bytes,
    pub byte_len: usize,
}

impl SynthesizedAudio {
    pub fn new(data: Bytes) -> Self {
        let byte_len = data.len();
        Self { data, byte_len }
    }
}

/// Subtitles aligned to the narration, in SRT format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub srt: String,
}
