use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use tokio::time::{Instant, sleep};

use super::{JobQueue, QueueError, ReservedJob};

/// 取任务的轮询间隔
const RESERVE_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn processing_key(queue: &str) -> String {
    format!("{}:processing", queue)
}

/// Redis 列表队列实现
///
/// 经典可靠队列：RPOPLPUSH 把任务原子移入 processing 列表，
/// LREM 确认出队。进程崩溃后任务留在 processing 列表里，
/// 下次启动由 requeue_stale 捞回，实现至少一次投递。
#[derive(Clone)]
pub struct RedisJobQueue {
    client: Arc<RedisClient>,
}

impl RedisJobQueue {
    pub fn new(client: Arc<RedisClient>) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let _: i64 = conn
            .lpush(queue, payload)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn reserve(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<ReservedJob>, QueueError> {
        let mut conn = self.connection().await?;
        let processing = processing_key(queue);
        let deadline = Instant::now() + timeout;

        loop {
            let payload: Option<String> = conn
                .rpoplpush(queue, &processing)
                .await
                .map_err(|e| QueueError::Backend(e.to_string()))?;

            if let Some(payload) = payload {
                return Ok(Some(ReservedJob { payload }));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(RESERVE_POLL_INTERVAL.min(deadline - Instant::now())).await;
        }
    }

    async fn ack(&self, queue: &str, job: &ReservedJob) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let _: i64 = conn
            .lrem(processing_key(queue), 1, &job.payload)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn requeue_stale(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.connection().await?;
        let processing = processing_key(queue);
        let mut moved = 0;
        // 也会捞回其他存活 worker 正在处理的任务，由重复处理容忍性兜底
        loop {
            let payload: Option<String> = conn
                .rpoplpush(&processing, queue)
                .await
                .map_err(|e| QueueError::Backend(e.to_string()))?;
            if payload.is_none() {
                return Ok(moved);
            }
            moved += 1;
        }
    }

    async fn pending(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.connection().await?;
        let len: usize = conn
            .llen(queue)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        Ok(len)
    }
}
