use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::{
    error::AppError,
    storage::types::{
        job::{Job, JobPatch},
        trend::Trend,
    },
};

pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Authoritative, observable collection of every job's current snapshot.
///
/// Writes go through a `watch` channel so readers always see a consistent list
/// in insertion order. Every applied change is also published on a `broadcast`
/// channel, in the same order it was applied, for observers that need the full
/// history rather than the latest state.
pub struct JobStore {
    jobs: watch::Sender<Vec<Job>>,
    updates: broadcast::Sender<Job>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl JobStore {
    pub fn new(event_buffer: usize) -> Self {
        let (jobs, _) = watch::channel(Vec::new());
        let (updates, _) = broadcast::channel(event_buffer.max(1));
        Self { jobs, updates }
    }

    /// Allocates a queued job for `input` and returns its id. Observers see it immediately.
    pub fn create(&self, input: Trend) -> String {
        let job = Job::new(input);
        let id = job.id.clone();
        self.jobs.send_modify(|jobs| {
            let _ = self.updates.send(job.clone());
            jobs.push(job);
        });
        id
    }

    /// Merges `patch` into the job with `id`.
    ///
    /// Unknown ids are a no-op: jobs are never removed while the store lives.
    /// A patch that would break a job invariant is rejected and nothing changes.
    pub fn update(&self, id: &str, patch: JobPatch) -> Result<(), AppError> {
        let mut outcome = Ok(());
        let mut found = false;
        self.jobs.send_if_modified(|jobs| {
            let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
                return false;
            };
            found = true;
            match job.apply(patch) {
                Ok(()) => {
                    let _ = self.updates.send(job.clone());
                    true
                }
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            }
        });

        if !found {
            debug!(job_id = %id, "ignoring update for unknown job");
        }
        outcome
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.borrow().iter().find(|job| job.id == id).cloned()
    }

    /// Point-in-time copy of all jobs in insertion order.
    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }

    /// Every applied change, one job snapshot per update.
    pub fn subscribe(&self) -> broadcast::Receiver<Job> {
        self.updates.subscribe()
    }

    /// Latest full snapshot, notified on change.
    pub fn watch(&self) -> watch::Receiver<Vec<Job>> {
        self.jobs.subscribe()
    }

    /// Waits until the job list satisfies `predicate` and returns that snapshot.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<Vec<Job>, AppError>
    where
        F: FnMut(&[Job]) -> bool,
    {
        let mut rx = self.jobs.subscribe();
        let jobs = rx
            .wait_for(|jobs| predicate(jobs))
            .await
            .map_err(|e| AppError::InternalError(format!("job store closed: {e}")))?;
        Ok(jobs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::job::{JobStatus, INITIAL_PROGRESS};

    fn trend(name: &str) -> Trend {
        Trend::new(name, "100K+", "breakdown")
    }

    #[test]
    fn test_create_is_visible_immediately() {
        let store = JobStore::default();
        let mut updates = store.subscribe();

        let id = store.create(trend("solar eclipse"));

        let job = store.get(&id).expect("job stored");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, INITIAL_PROGRESS);
        assert_eq!(updates.try_recv().expect("creation published").id, id);
    }

    #[test]
    fn test_snapshot_keeps_insertion_order() {
        let store = JobStore::default();
        let ids: Vec<String> = ["a", "b", "c"].into_iter().map(|n| store.create(trend(n))).collect();

        let snapshot_ids: Vec<String> = store.snapshot().into_iter().map(|job| job.id).collect();
        assert_eq!(snapshot_ids, ids);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let store = JobStore::default();
        store.create(trend("a"));
        let before = store.snapshot();

        store
            .update(
                "missing",
                JobPatch {
                    status: Some(JobStatus::Generating),
                    ..Default::default()
                },
            )
            .expect("unknown ids are ignored");

        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_rejected_patch_is_not_published() {
        let store = JobStore::default();
        let id = store.create(trend("a"));
        let mut updates = store.subscribe();

        let result = store.update(
            &id,
            JobPatch {
                status: Some(JobStatus::Completed),
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(updates.try_recv().is_err());
        assert_eq!(store.get(&id).expect("job").status, JobStatus::Queued);
    }

    #[test]
    fn test_snapshot_is_detached_from_later_updates() {
        let store = JobStore::default();
        let id = store.create(trend("a"));
        let snapshot = store.snapshot();

        store
            .update(
                &id,
                JobPatch {
                    status: Some(JobStatus::Generating),
                    progress: Some(10),
                    ..Default::default()
                },
            )
            .expect("update");

        assert_eq!(snapshot[0].status, JobStatus::Queued);
        assert_eq!(store.get(&id).expect("job").progress, 10);
    }

    #[tokio::test]
    async fn test_wait_for_resolves_on_matching_update() {
        let store = std::sync::Arc::new(JobStore::default());
        let id = store.create(trend("a"));

        let waiter = {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .wait_for(|jobs| jobs.iter().all(|job| job.status == JobStatus::Generating))
                    .await
            })
        };

        store
            .update(
                &id,
                JobPatch {
                    status: Some(JobStatus::Generating),
                    ..Default::default()
                },
            )
            .expect("update");

        let jobs = waiter.await.expect("join").expect("wait");
        assert_eq!(jobs[0].status, JobStatus::Generating);
    }
}
