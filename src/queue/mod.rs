// 任务队列模块
// 至少一次投递的异步任务队列，feed 扇出走这里

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryJobQueue;
pub use self::redis::RedisJobQueue;

/// feed 扇出任务所在的队列名
pub const FEED_QUEUE: &str = "queue:feed";

/// feed 扇出任务载荷
///
/// 粉丝集合在入队时快照，之后的关注变化不影响本次扇出。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutJob {
    pub job_id: String,
    pub post_id: String,
    pub author_id: String,
    pub follower_ids: Vec<String>,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend error: {0}")]
    Backend(String),
    #[error("queue operation timed out")]
    Timeout,
}

/// 已取出待确认的任务
///
/// 确认前崩溃或超时会导致重投，消费方必须容忍重复处理。
#[derive(Debug, Clone)]
pub struct ReservedJob {
    pub payload: String,
}

/// 任务队列抽象
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<(), QueueError>;

    /// 取一个任务，最多等待 timeout；队列为空返回 None
    ///
    /// 取出的任务处于"处理中"状态，直到 ack 才真正出队。
    async fn reserve(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<ReservedJob>, QueueError>;

    /// 确认任务完成
    async fn ack(&self, queue: &str, job: &ReservedJob) -> Result<(), QueueError>;

    /// 把滞留在处理中状态的任务移回队列，返回移动数量
    ///
    /// 在 worker 启动时调用，回收上一个进程崩溃留下的任务。
    async fn requeue_stale(&self, queue: &str) -> Result<usize, QueueError>;

    /// 待处理任务数
    async fn pending(&self, queue: &str) -> Result<usize, QueueError>;
}
