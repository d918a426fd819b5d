use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use common::storage::types::job::Stage;

/// FIFO of job ids waiting for one stage.
///
/// Held only for push/pop, never across an await.
#[derive(Debug)]
pub struct StageQueue {
    stage: Stage,
    jobs: Mutex<VecDeque<String>>,
}

impl StageQueue {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enqueue(&self, job_id: String) {
        self.lock().push_back(job_id);
    }

    pub fn dequeue(&self) -> Option<String> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.lock().iter().any(|id| id == job_id)
    }

    /// Queued ids, head first.
    pub fn job_ids(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
