use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};

use super::{JobQueue, QueueError, ReservedJob};

const RESERVE_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Default)]
struct Inner {
    ready: HashMap<String, VecDeque<String>>,
    processing: HashMap<String, Vec<String>>,
}

/// 内存队列实现
///
/// 测试用。与 Redis 实现一样走 预定 -> 确认 两段式出队，
/// 未确认的任务通过 requeue_stale 回到队列。
#[derive(Default)]
pub struct MemoryJobQueue {
    inner: Mutex<Inner>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_reserve(&self, queue: &str) -> Option<ReservedJob> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        let payload = inner.ready.get_mut(queue)?.pop_front()?;
        inner
            .processing
            .entry(queue.to_string())
            .or_default()
            .push(payload.clone());
        Some(ReservedJob { payload })
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        inner
            .ready
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    async fn reserve(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<ReservedJob>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(job) = self.try_reserve(queue) {
                return Ok(Some(job));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(RESERVE_POLL_INTERVAL).await;
        }
    }

    async fn ack(&self, queue: &str, job: &ReservedJob) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        if let Some(processing) = inner.processing.get_mut(queue) {
            if let Some(pos) = processing.iter().position(|p| p == &job.payload) {
                processing.remove(pos);
            }
        }
        Ok(())
    }

    async fn requeue_stale(&self, queue: &str) -> Result<usize, QueueError> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        let stale = inner
            .processing
            .get_mut(queue)
            .map(std::mem::take)
            .unwrap_or_default();
        let moved = stale.len();
        let ready = inner.ready.entry(queue.to_string()).or_default();
        for payload in stale {
            ready.push_back(payload);
        }
        Ok(moved)
    }

    async fn pending(&self, queue: &str) -> Result<usize, QueueError> {
        let inner = self.inner.lock().expect("queue lock poisoned");
        Ok(inner.ready.get(queue).map_or(0, VecDeque::len))
    }
}
