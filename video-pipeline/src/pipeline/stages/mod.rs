use common::{
    error::AppError,
    storage::{
        store::video_location,
        types::{
            job::{Job, JobPatch, JobStatus, Stage, StageNotice},
            media::{GeneratedContent, SubtitleTrack, SynthesizedAudio},
        },
    },
};
use tracing::{debug, error, info, instrument, warn};

use super::VideoPipeline;

/// What a stage produced for its job.
enum StageOutput {
    Generated(GeneratedContent),
    Synthesized(SynthesizedAudio),
    Aligned(SubtitleTrack),
    Rendered(String),
}

impl StageOutput {
    fn into_patch(self, stage: Stage) -> JobPatch {
        let mut patch = JobPatch {
            status: Some(stage.completed_status()),
            progress: Some(stage.exit_progress()),
            active_stage: Some(None),
            ..Default::default()
        };
        match self {
            StageOutput::Generated(content) => patch.generated_content = Some(content),
            StageOutput::Synthesized(audio) => patch.synthesized_audio = Some(audio),
            StageOutput::Aligned(track) => patch.subtitle_track = Some(track),
            StageOutput::Rendered(location) => patch.artifact_ref = Some(location),
        }
        patch
    }
}

/// Runs `stage` for one job and records the outcome.
///
/// Returns the stage the job should be queued for next, or `None` when the job
/// completed, failed, or could not be processed at all.
#[instrument(skip_all, fields(job_id = %job_id, stage = %stage))]
pub(super) async fn run_stage(
    pipeline: &VideoPipeline,
    stage: Stage,
    job_id: &str,
) -> Option<Stage> {
    let started = JobPatch {
        status: Some(stage.active_status()),
        progress: Some(stage.entry_progress()),
        active_stage: Some(Some(stage)),
        ..Default::default()
    };
    if let Err(err) = pipeline.store.update(job_id, started) {
        error!(error = %err, "could not start stage; dropping job from the pipeline");
        return None;
    }
    let Some(job) = pipeline.store.get(job_id) else {
        warn!("job disappeared before processing");
        return None;
    };

    let policy = &pipeline.retry_policy;
    let job = &job;
    let result = policy
        .run(
            || async move { perform(pipeline, stage, job).await },
            |attempt, err| {
                warn!(attempt, max_attempts = policy.max_attempts, error = %err, "stage attempt failed; retrying");
                let notice = JobPatch {
                    notice: Some(StageNotice::new(stage, attempt, policy.max_attempts)),
                    ..Default::default()
                };
                if let Err(err) = pipeline.store.update(job_id, notice) {
                    debug!(error = %err, "could not record retry notice");
                }
            },
        )
        .await;

    match result {
        Ok(output) => complete(pipeline, stage, job_id, output),
        Err(err) => {
            fail(pipeline, stage, job_id, &err);
            None
        }
    }
}

async fn perform(
    pipeline: &VideoPipeline,
    stage: Stage,
    job: &Job,
) -> Result<StageOutput, AppError> {
    match stage {
        Stage::Generate => {
            let content = pipeline.services.generate_content(&job.input).await?;
            debug!(title = %content.title, body_chars = content.body.chars().count(), "content generated");
            Ok(StageOutput::Generated(content))
        }
        Stage::Synthesize => {
            let content = require(job.generated_content.as_ref(), "generated content")?;
            let voice = pipeline.voice_identity().await?;
            let audio = pipeline
                .services
                .synthesize_speech(&content.body, &voice)
                .await?;
            debug!(bytes = audio.len(), "speech synthesized");
            Ok(StageOutput::Synthesized(SynthesizedAudio::new(audio)))
        }
        Stage::Align => {
            let content = require(job.generated_content.as_ref(), "generated content")?;
            let audio = require(job.synthesized_audio.as_ref(), "synthesized audio")?;
            let track = pipeline
                .services
                .align_subtitles(&content.body, &audio.data)
                .await?;
            Ok(StageOutput::Aligned(track))
        }
        Stage::Render => {
            let audio = require(job.synthesized_audio.as_ref(), "synthesized audio")?;
            let track = require(job.subtitle_track.as_ref(), "subtitle track")?;
            let video = pipeline.services.render_video(&audio.data, track).await?;
            let location = video_location(&job.id);
            let bytes = video.len();
            pipeline.storage.put(&location, video).await?;
            debug!(location = %location, bytes, "video stored");
            Ok(StageOutput::Rendered(location))
        }
    }
}

fn require<'a, T>(value: Option<&'a T>, what: &str) -> Result<&'a T, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("job has no {what}")))
}

fn complete(
    pipeline: &VideoPipeline,
    stage: Stage,
    job_id: &str,
    output: StageOutput,
) -> Option<Stage> {
    if let Err(err) = pipeline.store.update(job_id, output.into_patch(stage)) {
        error!(error = %err, "could not record stage result");
        return None;
    }

    let next = stage.next();
    if next.is_none() {
        info!("video completed");
    } else {
        debug!(next = ?next, "stage completed");
    }
    next
}

fn fail(pipeline: &VideoPipeline, stage: Stage, job_id: &str, err: &AppError) {
    let message = if err.is_transient() {
        format!(
            "{} failed after {} attempts: {err}",
            stage.operation_label(),
            pipeline.retry_policy.max_attempts
        )
    } else {
        format!("{} failed: {err}", stage.operation_label())
    };
    warn!(error = %err, "stage failed; marking job failed");
    mark_failed(pipeline, job_id, message);
}

/// Records a stage whose worker panicked mid-job. The worker keeps draining.
pub(super) fn fail_panicked(pipeline: &VideoPipeline, stage: Stage, job_id: &str) {
    error!(job_id = %job_id, stage = %stage, "stage worker panicked; marking job failed");
    mark_failed(
        pipeline,
        job_id,
        format!("{} failed: worker panicked", stage.operation_label()),
    );
}

fn mark_failed(pipeline: &VideoPipeline, job_id: &str, message: String) {
    let patch = JobPatch {
        status: Some(JobStatus::Failed),
        error_message: Some(message),
        active_stage: Some(None),
        ..Default::default()
    };
    if let Err(err) = pipeline.store.update(job_id, patch) {
        error!(error = %err, "could not record job failure");
    }
}
