use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use state_machines::state_machine;
use uuid::Uuid;

use crate::error::AppError;

use super::{
    media::{GeneratedContent, SubtitleTrack, SynthesizedAudio},
    trend::Trend,
};

/// Progress shown for a freshly submitted job.
pub const INITIAL_PROGRESS: u8 = 5;
pub const MAX_PROGRESS: u8 = 100;

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[default]
    Queued,
    Generating,
    Synthesizing,
    Aligning,
    Rendering,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Generating => "Generating",
            JobStatus::Synthesizing => "Synthesizing",
            JobStatus::Aligning => "Aligning",
            JobStatus::Rendering => "Rendering",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Generating => "Generating script",
            JobStatus::Synthesizing => "Synthesizing voice",
            JobStatus::Aligning => "Aligning subtitles",
            JobStatus::Rendering => "Rendering video",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

/// One of the four ordered processing steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generate,
    Synthesize,
    Align,
    Render,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Generate, Stage::Synthesize, Stage::Align, Stage::Render];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Generate => "generate",
            Stage::Synthesize => "synthesize",
            Stage::Align => "align",
            Stage::Render => "render",
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Generate => Some(Stage::Synthesize),
            Stage::Synthesize => Some(Stage::Align),
            Stage::Align => Some(Stage::Render),
            Stage::Render => None,
        }
    }

    /// Status shown while the stage's worker holds the job.
    pub fn active_status(self) -> JobStatus {
        match self {
            Stage::Generate => JobStatus::Generating,
            Stage::Synthesize => JobStatus::Synthesizing,
            Stage::Align => JobStatus::Aligning,
            Stage::Render => JobStatus::Rendering,
        }
    }

    /// Status a job carries once this stage succeeded.
    pub fn completed_status(self) -> JobStatus {
        self.next()
            .map_or(JobStatus::Completed, Stage::active_status)
    }

    pub fn entry_progress(self) -> u8 {
        match self {
            Stage::Generate => 10,
            Stage::Synthesize => 50,
            Stage::Align => 70,
            Stage::Render => 90,
        }
    }

    pub fn exit_progress(self) -> u8 {
        match self {
            Stage::Generate => 30,
            Stage::Synthesize => 60,
            Stage::Align => 80,
            Stage::Render => MAX_PROGRESS,
        }
    }

    pub fn operation_label(self) -> &'static str {
        match self {
            Stage::Generate => "Content generation",
            Stage::Synthesize => "Speech synthesis",
            Stage::Align => "Subtitle alignment",
            Stage::Render => "Video rendering",
        }
    }

    pub fn retry_message(self) -> &'static str {
        match self {
            Stage::Generate => "Retrying content generation...",
            Stage::Synthesize => "Retrying TTS generation...",
            Stage::Align => "Retrying subtitle alignment...",
            Stage::Render => "Retrying video rendering...",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-terminal failure recorded while a stage still has attempts left.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageNotice {
    pub stage: Stage,
    pub attempt: u32,
    pub max_attempts: u32,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl StageNotice {
    pub fn new(stage: Stage, attempt: u32, max_attempts: u32) -> Self {
        Self {
            stage,
            attempt,
            max_attempts,
            message: format!(
                "{} (attempt {attempt}/{max_attempts})",
                stage.retry_message()
            ),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum JobTransition {
    StartGenerating,
    FinishGenerating,
    FinishSynthesizing,
    FinishAligning,
    FinishRendering,
    Fail,
}

impl JobTransition {
    fn as_str(self) -> &'static str {
        match self {
            JobTransition::StartGenerating => "start_generating",
            JobTransition::FinishGenerating => "finish_generating",
            JobTransition::FinishSynthesizing => "finish_synthesizing",
            JobTransition::FinishAligning => "finish_aligning",
            JobTransition::FinishRendering => "finish_rendering",
            JobTransition::Fail => "fail",
        }
    }

    fn towards(target: JobStatus) -> Option<Self> {
        match target {
            JobStatus::Generating => Some(JobTransition::StartGenerating),
            JobStatus::Synthesizing => Some(JobTransition::FinishGenerating),
            JobStatus::Aligning => Some(JobTransition::FinishSynthesizing),
            JobStatus::Rendering => Some(JobTransition::FinishAligning),
            JobStatus::Completed => Some(JobTransition::FinishRendering),
            JobStatus::Failed => Some(JobTransition::Fail),
            JobStatus::Queued => None,
        }
    }
}

mod lifecycle {
    use super::state_machine;

    state_machine! {
        name: JobLifecycleMachine,
        initial: Queued,
        states: [Queued, Generating, Synthesizing, Aligning, Rendering, Completed, Failed],
        events {
            start_generating {
                transition: { from: Queued, to: Generating }
            }
            finish_generating {
                transition: { from: Generating, to: Synthesizing }
            }
            finish_synthesizing {
                transition: { from: Synthesizing, to: Aligning }
            }
            finish_aligning {
                transition: { from: Aligning, to: Rendering }
            }
            finish_rendering {
                transition: { from: Rendering, to: Completed }
            }
            fail {
                transition: { from: Generating, to: Failed }
                transition: { from: Synthesizing, to: Failed }
                transition: { from: Aligning, to: Failed }
                transition: { from: Rendering, to: Failed }
            }
        }
    }

    pub(super) fn queued() -> JobLifecycleMachine<(), Queued> {
        JobLifecycleMachine::new(())
    }

    pub(super) fn generating() -> Option<JobLifecycleMachine<(), Generating>> {
        queued().start_generating().ok()
    }

    pub(super) fn synthesizing() -> Option<JobLifecycleMachine<(), Synthesizing>> {
        generating()?.finish_generating().ok()
    }

    pub(super) fn aligning() -> Option<JobLifecycleMachine<(), Aligning>> {
        synthesizing()?.finish_synthesizing().ok()
    }

    pub(super) fn rendering() -> Option<JobLifecycleMachine<(), Rendering>> {
        aligning()?.finish_aligning().ok()
    }
}

fn invalid_transition(status: JobStatus, target: JobStatus) -> AppError {
    let event = JobTransition::towards(target).map_or("none", JobTransition::as_str);
    AppError::Validation(format!(
        "Invalid job transition: {} -> {} ({event})",
        status.as_str(),
        target.as_str()
    ))
}

fn compute_next_status(status: JobStatus, target: JobStatus) -> Result<JobStatus, AppError> {
    use lifecycle::{aligning, generating, queued, rendering, synthesizing};

    let accepted = match (status, JobTransition::towards(target)) {
        (JobStatus::Queued, Some(JobTransition::StartGenerating)) => {
            queued().start_generating().is_ok()
        }
        (JobStatus::Generating, Some(JobTransition::FinishGenerating)) => {
            generating().is_some_and(|m| m.finish_generating().is_ok())
        }
        (JobStatus::Synthesizing, Some(JobTransition::FinishSynthesizing)) => {
            synthesizing().is_some_and(|m| m.finish_synthesizing().is_ok())
        }
        (JobStatus::Aligning, Some(JobTransition::FinishAligning)) => {
            aligning().is_some_and(|m| m.finish_aligning().is_ok())
        }
        (JobStatus::Rendering, Some(JobTransition::FinishRendering)) => {
            rendering().is_some_and(|m| m.finish_rendering().is_ok())
        }
        (JobStatus::Generating, Some(JobTransition::Fail)) => {
            generating().is_some_and(|m| m.fail().is_ok())
        }
        (JobStatus::Synthesizing, Some(JobTransition::Fail)) => {
            synthesizing().is_some_and(|m| m.fail().is_ok())
        }
        (JobStatus::Aligning, Some(JobTransition::Fail)) => {
            aligning().is_some_and(|m| m.fail().is_ok())
        }
        (JobStatus::Rendering, Some(JobTransition::Fail)) => {
            rendering().is_some_and(|m| m.fail().is_ok())
        }
        _ => false,
    };

    if accepted {
        Ok(target)
    } else {
        Err(invalid_transition(status, target))
    }
}

/// Fields a stage worker merges into a job snapshot. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub generated_content: Option<GeneratedContent>,
    pub synthesized_audio: Option<SynthesizedAudio>,
    pub subtitle_track: Option<SubtitleTrack>,
    pub artifact_ref: Option<String>,
    pub error_message: Option<String>,
    pub active_stage: Option<Option<Stage>>,
    pub notice: Option<StageNotice>,
}

/// One unit of video production work, tracked from submission to completion or failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub input: Trend,
    pub generated_content: Option<GeneratedContent>,
    pub synthesized_audio: Option<SynthesizedAudio>,
    pub subtitle_track: Option<SubtitleTrack>,
    pub artifact_ref: Option<String>,
    pub status: JobStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub active_stage: Option<Stage>,
    pub notices: Vec<StageNotice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(input: Trend) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            input,
            generated_content: None,
            synthesized_audio: None,
            subtitle_track: None,
            artifact_ref: None,
            status: JobStatus::Queued,
            progress: INITIAL_PROGRESS,
            error_message: None,
            active_stage: None,
            notices: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `patch` into the job.
    ///
    /// The patch is validated as a whole before anything is written: an illegal
    /// status transition, a second write of a derived field, or an error message
    /// on a job that is not failing rejects it and leaves the job unchanged.
    /// Progress never moves backwards; lower values are ignored.
    pub fn apply(&mut self, patch: JobPatch) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "Job {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }

        let next_status = match patch.status {
            Some(target) if target != self.status => compute_next_status(self.status, target)?,
            _ => self.status,
        };

        if patch.error_message.is_some() && next_status != JobStatus::Failed {
            return Err(AppError::Validation(
                "error message is only recorded for failed jobs".into(),
            ));
        }

        write_once("generated_content", &self.generated_content, &patch.generated_content)?;
        write_once("synthesized_audio", &self.synthesized_audio, &patch.synthesized_audio)?;
        write_once("subtitle_track", &self.subtitle_track, &patch.subtitle_track)?;
        write_once("artifact_ref", &self.artifact_ref, &patch.artifact_ref)?;

        self.status = next_status;
        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress.min(MAX_PROGRESS));
        }
        if patch.generated_content.is_some() {
            self.generated_content = patch.generated_content;
        }
        if patch.synthesized_audio.is_some() {
            self.synthesized_audio = patch.synthesized_audio;
        }
        if patch.subtitle_track.is_some() {
            self.subtitle_track = patch.subtitle_track;
        }
        if patch.artifact_ref.is_some() {
            self.artifact_ref = patch.artifact_ref;
        }
        if patch.error_message.is_some() {
            self.error_message = patch.error_message;
        }
        if let Some(active_stage) = patch.active_stage {
            self.active_stage = active_stage;
        }
        if let Some(notice) = patch.notice {
            self.notices.push(notice);
        }
        self.updated_at = Utc::now();

        Ok(())
    }
}

fn write_once<T>(field: &str, current: &Option<T>, incoming: &Option<T>) -> Result<(), AppError> {
    if current.is_some() && incoming.is_some() {
        return Err(AppError::Validation(format!(
            "{field} has already been written"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(Trend::new("Northern lights", "500K+", "Solar storm tonight"))
    }

    fn status(status: JobStatus) -> JobPatch {
        JobPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_job_defaults() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, INITIAL_PROGRESS);
        assert!(job.generated_content.is_none());
        assert!(job.error_message.is_none());
        assert!(job.notices.is_empty());
        assert!(job.active_stage.is_none());
        assert!(!job.id.is_empty());
    }

    #[test]
    fn test_full_trajectory_is_accepted() {
        let mut job = job();
        for next in [
            JobStatus::Generating,
            JobStatus::Synthesizing,
            JobStatus::Aligning,
            JobStatus::Rendering,
            JobStatus::Completed,
        ] {
            job.apply(status(next)).expect("forward transition");
            assert_eq!(job.status, next);
        }
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_re_entering_current_status_is_not_a_transition() {
        let mut job = job();
        job.apply(status(JobStatus::Generating)).expect("start");
        job.apply(status(JobStatus::Synthesizing)).expect("generated");
        job.apply(JobPatch {
            status: Some(JobStatus::Synthesizing),
            progress: Some(Stage::Synthesize.entry_progress()),
            active_stage: Some(Some(Stage::Synthesize)),
            ..Default::default()
        })
        .expect("synthesize worker picks the job up");
        assert_eq!(job.progress, 50);
        assert_eq!(job.active_stage, Some(Stage::Synthesize));
    }

    #[test]
    fn test_skipping_stages_is_rejected() {
        let mut job = job();
        let err = job
            .apply(status(JobStatus::Aligning))
            .expect_err("cannot jump ahead");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn test_failure_requires_an_in_progress_stage() {
        let mut job = job();
        assert!(job.apply(status(JobStatus::Failed)).is_err());

        job.apply(status(JobStatus::Generating)).expect("start");
        job.apply(JobPatch {
            status: Some(JobStatus::Failed),
            error_message: Some("Content generation failed after 3 attempts".into()),
            ..Default::default()
        })
        .expect("fail from generating");
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn test_terminal_jobs_reject_further_patches() {
        let mut job = job();
        job.apply(status(JobStatus::Generating)).expect("start");
        job.apply(JobPatch {
            status: Some(JobStatus::Failed),
            error_message: Some("boom".into()),
            ..Default::default()
        })
        .expect("fail");

        let err = job
            .apply(status(JobStatus::Synthesizing))
            .expect_err("failed jobs never move on");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn test_derived_fields_are_written_once() {
        let mut job = job();
        let content = GeneratedContent {
            title: "t".into(),
            description: "d".into(),
            body: "b".into(),
        };
        job.apply(JobPatch {
            generated_content: Some(content.clone()),
            ..Default::default()
        })
        .expect("first write");

        let err = job
            .apply(JobPatch {
                generated_content: Some(GeneratedContent {
                    body: "other".into(),
                    ..content.clone()
                }),
                progress: Some(90),
                ..Default::default()
            })
            .expect_err("second write");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(job.generated_content, Some(content));
        assert_eq!(job.progress, INITIAL_PROGRESS, "rejected patch must not leak");
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = job();
        job.apply(JobPatch {
            progress: Some(30),
            ..Default::default()
        })
        .expect("advance");
        job.apply(JobPatch {
            progress: Some(10),
            ..Default::default()
        })
        .expect("stale progress is ignored");
        assert_eq!(job.progress, 30);

        job.apply(JobPatch {
            progress: Some(250),
            ..Default::default()
        })
        .expect("clamped");
        assert_eq!(job.progress, MAX_PROGRESS);
    }

    #[test]
    fn test_error_message_needs_failed_status() {
        let mut job = job();
        job.apply(status(JobStatus::Generating)).expect("start");
        let err = job
            .apply(JobPatch {
                error_message: Some("transient".into()),
                ..Default::default()
            })
            .expect_err("not failing");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_stage_progress_table() {
        let values: Vec<(u8, u8)> = Stage::ALL
            .iter()
            .map(|s| (s.entry_progress(), s.exit_progress()))
            .collect();
        assert_eq!(values, vec![(10, 30), (50, 60), (70, 80), (90, 100)]);
        assert_eq!(Stage::Render.completed_status(), JobStatus::Completed);
        assert_eq!(Stage::Generate.completed_status(), JobStatus::Synthesizing);
    }

    #[test]
    fn test_notice_message_includes_attempt_count() {
        let notice = StageNotice::new(Stage::Render, 2, 3);
        assert_eq!(notice.message, "Retrying video rendering... (attempt 2/3)");
    }
}
