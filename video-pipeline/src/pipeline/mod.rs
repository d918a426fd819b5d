mod config;
mod queue;
mod retry;
mod services;
mod stages;
mod submission;

pub use config::{PipelineConfig, PipelineTuning};
pub use queue::StageQueue;
pub use retry::RetryPolicy;
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};
pub use submission::SubmissionOutcome;

use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::{
    error::AppError,
    storage::{
        job_store::JobStore,
        store::StorageManager,
        types::job::{Job, Stage},
    },
};
use futures::{FutureExt, Stream};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// One stage's queue plus the flag that keeps at most one worker draining it.
struct StageLane {
    queue: StageQueue,
    active: AtomicBool,
}

impl StageLane {
    fn new(stage: Stage) -> Self {
        Self {
            queue: StageQueue::new(stage),
            active: AtomicBool::new(false),
        }
    }

    fn try_acquire(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Releases a lane when dropped, so an unwinding worker never leaves it held.
struct LaneGuard<'a>(&'a StageLane);

impl Drop for LaneGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

struct StageLanes {
    generate: StageLane,
    synthesize: StageLane,
    align: StageLane,
    render: StageLane,
}

impl StageLanes {
    fn new() -> Self {
        Self {
            generate: StageLane::new(Stage::Generate),
            synthesize: StageLane::new(Stage::Synthesize),
            align: StageLane::new(Stage::Align),
            render: StageLane::new(Stage::Render),
        }
    }

    fn get(&self, stage: Stage) -> &StageLane {
        match stage {
            Stage::Generate => &self.generate,
            Stage::Synthesize => &self.synthesize,
            Stage::Align => &self.align,
            Stage::Render => &self.render,
        }
    }
}

/// Coordinates jobs through generate, synthesize, align and render.
///
/// Each stage is drained by at most one worker at a time, so up to four jobs
/// make progress concurrently, one per stage.
#[allow(clippy::module_name_repetitions)]
pub struct VideoPipeline {
    store: Arc<JobStore>,
    services: Arc<dyn PipelineServices>,
    storage: StorageManager,
    config: PipelineConfig,
    retry_policy: RetryPolicy,
    lanes: StageLanes,
    voice: OnceCell<String>,
}

impl VideoPipeline {
    pub fn new(
        services: Arc<dyn PipelineServices>,
        storage: StorageManager,
        config: PipelineConfig,
    ) -> Arc<Self> {
        let store = Arc::new(JobStore::new(config.tuning.event_buffer));
        Self::with_store(store, services, storage, config)
    }

    pub fn with_store(
        store: Arc<JobStore>,
        services: Arc<dyn PipelineServices>,
        storage: StorageManager,
        config: PipelineConfig,
    ) -> Arc<Self> {
        let retry_policy = RetryPolicy::from_tuning(&config.tuning);
        Arc::new(Self {
            store,
            services,
            storage,
            config,
            retry_policy,
            lanes: StageLanes::new(),
            voice: OnceCell::new(),
        })
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.store.snapshot()
    }

    /// Full job list now and after every change. Ends when the pipeline is dropped.
    pub fn observe(&self) -> impl Stream<Item = Vec<Job>> + Send + 'static {
        let mut rx = self.store.watch();
        async_stream::stream! {
            let initial = rx.borrow_and_update().clone();
            yield initial;
            while rx.changed().await.is_ok() {
                let jobs = rx.borrow_and_update().clone();
                yield jobs;
            }
        }
    }

    /// Ids waiting in `stage`'s queue, head first.
    pub fn queued_jobs(&self, stage: Stage) -> Vec<String> {
        self.lanes.get(stage).queue.job_ids()
    }

    pub fn is_stage_active(&self, stage: Stage) -> bool {
        self.lanes.get(stage).active.load(Ordering::Acquire)
    }

    /// Starts a worker for `stage` unless its queue is empty or one is already running.
    ///
    /// Returns whether a worker was started.
    pub fn trigger(self: &Arc<Self>, stage: Stage) -> bool {
        let lane = self.lanes.get(stage);
        if lane.queue.is_empty() || !lane.try_acquire() {
            return false;
        }

        debug!(stage = %stage, queued = lane.queue.len(), "starting stage worker");
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.drain(stage).await });
        true
    }

    pub(crate) fn enqueue(&self, stage: Stage, job_id: String) {
        self.lanes.get(stage).queue.enqueue(job_id);
    }

    async fn drain(self: Arc<Self>, stage: Stage) {
        let lane = self.lanes.get(stage);
        loop {
            {
                let _held = LaneGuard(lane);
                while let Some(job_id) = lane.queue.dequeue() {
                    let outcome = AssertUnwindSafe(stages::run_stage(&self, stage, &job_id))
                        .catch_unwind()
                        .await;
                    match outcome {
                        Ok(Some(next)) => {
                            self.enqueue(next, job_id);
                            self.trigger(next);
                        }
                        Ok(None) => {}
                        Err(_) => stages::fail_panicked(&self, stage, &job_id),
                    }
                }
            }

            // A job may have been queued between the last dequeue and the release.
            if lane.queue.is_empty() || !lane.try_acquire() {
                break;
            }
        }
        debug!(stage = %stage, "stage worker idle");
    }

    /// Voice used for every synthesis in this pipeline's lifetime, resolved on first use.
    pub(crate) async fn voice_identity(&self) -> Result<String, AppError> {
        self.voice
            .get_or_try_init(|| async {
                let voice = self.services.resolve_voice().await?;
                info!(voice = %voice, "resolved narration voice");
                Ok::<_, AppError>(voice)
            })
            .await
            .cloned()
    }
}
