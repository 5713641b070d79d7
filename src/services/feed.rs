use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;

use crate::cache::keys::feed_keys;
use crate::cache::{CacheError, CacheStore};
use crate::error::ServiceError;
use crate::queue::{FEED_QUEUE, FanoutJob, JobQueue, ReservedJob};
use crate::services::follow::FollowGraph;
use crate::store::{PostEntity, SocialStore};

fn upstream(e: CacheError) -> ServiceError {
    ServiceError::UpstreamUnavailable(e.to_string())
}

/// 本次 feed 读取实际使用的策略
///
/// 推模型（缓存窗口）和拉模型（回源查询）是同一个读接口背后的
/// 两种协作策略，按缓存命中状态选择。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    /// 缓存列表窗口命中
    Cache,
    /// 回源主存储重建
    Store,
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<PostEntity>,
    pub page: u32,
    pub page_size: u32,
    pub source: FeedSource,
}

/// feed 读路径
///
/// 缓存只当作最近内容窗口用，不当作完整分页索引：窗口外的页
/// 永远回源。回源重建只在第一页做，避免深分页刷掉热数据。
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn SocialStore>,
    cache: Arc<dyn CacheStore>,
    follows: FollowGraph,
    feed_capacity: usize,
    feed_expire_secs: u64,
}

impl FeedService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        cache: Arc<dyn CacheStore>,
        follows: FollowGraph,
        feed_capacity: usize,
        feed_expire_secs: u64,
    ) -> Self {
        Self {
            store,
            cache,
            follows,
            feed_capacity,
            feed_expire_secs,
        }
    }

    pub async fn get_feed(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<FeedPage, ServiceError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);
        let start = (page as usize - 1) * page_size as usize;
        let end = start + page_size as usize - 1;

        // 请求窗口落在缓存覆盖范围内才看缓存
        if end < self.feed_capacity {
            match self
                .cache
                .range(&feed_keys::feed_key(user_id), start as isize, end as isize)
                .await
            {
                Ok(ids) if !ids.is_empty() => {
                    let posts = self.resolve_ids(&ids).await?;
                    return Ok(FeedPage {
                        posts,
                        page,
                        page_size,
                        source: FeedSource::Cache,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        "feed cache read failed for {}, falling back to store: {}",
                        user_id,
                        e
                    );
                }
            }
        }

        // 回源：关注集合内的帖子按时间倒序分页
        let followees = self.follows.following_of(user_id).await?;
        let posts = if followees.is_empty() {
            Vec::new()
        } else {
            self.store
                .posts_by_authors(&followees, start as i64, page_size as i64)
                .await?
        };

        // 只有第一页的结果值得回填成缓存窗口
        if page == 1 && !posts.is_empty() {
            self.repopulate(user_id, &posts).await;
        }

        Ok(FeedPage {
            posts,
            page,
            page_size,
            source: FeedSource::Store,
        })
    }

    /// 把缓存里的帖子ID解析成帖子记录
    ///
    /// 保持列表顺序；已删除的帖子ID静默丢弃，不报错。
    async fn resolve_ids(&self, ids: &[String]) -> Result<Vec<PostEntity>, ServiceError> {
        let fetched = self.store.posts_by_ids(ids).await?;
        let mut by_id: HashMap<String, PostEntity> = fetched
            .into_iter()
            .map(|p| (p.post_id.clone(), p))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// 用回源结果重建缓存窗口，失败只记日志
    async fn repopulate(&self, user_id: &str, posts: &[PostEntity]) {
        let key = feed_keys::feed_key(user_id);
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!("feed repopulate skipped for {}: {}", user_id, e);
            return;
        }
        // 从旧到新压入，表头落最新一条
        for post in posts.iter().rev() {
            if let Err(e) = self.cache.push_front(&key, &post.post_id).await {
                tracing::warn!("feed repopulate aborted for {}: {}", user_id, e);
                return;
            }
        }
        let _ = self
            .cache
            .trim(&key, 0, self.feed_capacity as isize - 1)
            .await;
        let _ = self.cache.expire(&key, self.feed_expire_secs).await;
        tracing::debug!("feed cache repopulated for {}", user_id);
    }
}

/// feed 扇出 worker
///
/// 消费扇出任务，把新帖子ID压进每个粉丝的 feed 列表并裁剪。
/// 至少一次投递：处理一半崩溃会重投整个任务，压入前先去重，
/// 重复执行不产生重复条目。
#[derive(Clone)]
pub struct FanoutWorker {
    store: Arc<dyn SocialStore>,
    cache: Arc<dyn CacheStore>,
    queue: Arc<dyn JobQueue>,
    feed_capacity: usize,
    feed_expire_secs: u64,
    poll_timeout: Duration,
}

impl FanoutWorker {
    pub fn new(
        store: Arc<dyn SocialStore>,
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn JobQueue>,
        feed_capacity: usize,
        feed_expire_secs: u64,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            queue,
            feed_capacity,
            feed_expire_secs,
            poll_timeout,
        }
    }

    /// 常驻消费循环
    pub async fn run(self) {
        // 回收上一个进程崩溃留下的任务
        match self.queue.requeue_stale(FEED_QUEUE).await {
            Ok(0) => {}
            Ok(n) => tracing::info!("requeued {} stale fanout jobs", n),
            Err(e) => tracing::warn!("stale fanout job recovery failed: {}", e),
        }

        loop {
            match self.queue.reserve(FEED_QUEUE, self.poll_timeout).await {
                Ok(Some(reserved)) => {
                    self.handle(&reserved).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("fanout queue reserve failed: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// 同步清空队列，测试和优雅停机用
    pub async fn drain(&self) -> Result<usize, ServiceError> {
        let mut handled = 0;
        loop {
            let reserved = self
                .queue
                .reserve(FEED_QUEUE, Duration::ZERO)
                .await
                .map_err(|e| ServiceError::UpstreamUnavailable(e.to_string()))?;
            match reserved {
                Some(reserved) => {
                    self.handle(&reserved).await;
                    handled += 1;
                }
                None => return Ok(handled),
            }
        }
    }

    async fn handle(&self, reserved: &ReservedJob) {
        let job = match serde_json::from_str::<FanoutJob>(&reserved.payload) {
            Ok(job) => job,
            Err(e) => {
                // 坏载荷重投也没救，确认掉避免毒丸循环
                tracing::warn!("discarding malformed fanout payload: {}", e);
                let _ = self.queue.ack(FEED_QUEUE, reserved).await;
                return;
            }
        };

        match self.process(&job).await {
            Ok(()) => {
                if let Err(e) = self.queue.ack(FEED_QUEUE, reserved).await {
                    // 确认失败会导致重投，靠幂等压入兜底
                    tracing::warn!("fanout job {} ack failed: {}", job.job_id, e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "fanout job {} failed, left for redelivery: {}",
                    job.job_id,
                    e
                );
            }
        }
    }

    /// 执行一个扇出任务
    pub async fn process(&self, job: &FanoutJob) -> Result<(), ServiceError> {
        // 入队到处理之间帖子可能已被删除，直接算成功
        if self.store.find_post(&job.post_id).await?.is_none() {
            tracing::debug!(
                "post {} deleted before fanout, job {} is a no-op",
                job.post_id,
                job.job_id
            );
            return Ok(());
        }

        let results = join_all(
            job.follower_ids
                .iter()
                .map(|follower_id| self.push_to_follower(follower_id, &job.post_id)),
        )
        .await;

        for result in results {
            result?;
        }

        tracing::debug!(
            "fanout job {} delivered post {} to {} feeds",
            job.job_id,
            job.post_id,
            job.follower_ids.len()
        );
        Ok(())
    }

    async fn push_to_follower(
        &self,
        follower_id: &str,
        post_id: &str,
    ) -> Result<(), ServiceError> {
        let key = feed_keys::feed_key(follower_id);
        // 先去重再压入，重投任务不会产生重复条目
        self.cache
            .remove_from_list(&key, post_id)
            .await
            .map_err(upstream)?;
        self.cache.push_front(&key, post_id).await.map_err(upstream)?;
        self.cache
            .trim(&key, 0, self.feed_capacity as isize - 1)
            .await
            .map_err(upstream)?;
        self.cache
            .expire(&key, self.feed_expire_secs)
            .await
            .map_err(upstream)?;
        Ok(())
    }
}
