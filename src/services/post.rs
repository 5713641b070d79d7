use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::cache::keys::post_keys;
use crate::error::ServiceError;
use crate::queue::{FEED_QUEUE, FanoutJob, JobQueue};
use crate::services::follow::FollowGraph;
use crate::services::repository::ReadThrough;
use crate::store::{CommentEntity, NewPost, PostChanges, PostEntity, SocialStore};

/// 分页列表缓存过期时间，单位秒。列表变化快，只缓存很短时间
const LISTING_CACHE_EXPIRE: u64 = 120;

/// 带嵌入关系的帖子详情，整体作为一个缓存条目
///
/// 评论或点赞变化时由互动服务失效整条缓存。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: PostEntity,
    pub comments: Vec<CommentEntity>,
    pub likes_count: i64,
}

/// 创建帖子的结果
///
/// `fanout_queued` 为 false 表示扇出任务没有入队（队列不可用等），
/// 帖子本身已持久化，feed 会在回源读取时补上。
#[derive(Debug, Serialize)]
pub struct CreatedPost {
    pub post: PostEntity,
    pub fanout_queued: bool,
}

/// 帖子服务
///
/// 写路径：落库、同步失效缓存、投递扇出任务（不等扇出完成）。
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn SocialStore>,
    queue: Arc<dyn JobQueue>,
    follows: FollowGraph,
    repo: ReadThrough,
}

impl PostService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn JobQueue>,
        follows: FollowGraph,
        ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            queue,
            follows,
            repo: ReadThrough::new(cache, ttl_secs),
        }
    }

    /// 创建帖子并投递扇出任务
    ///
    /// 队列不可用只降级不失败：主存储写入成功就算创建成功，
    /// 调用方通过 fanout_queued 知道 feed 传播是否已排队。
    pub async fn create(
        &self,
        author_id: &str,
        title: String,
        content: String,
        image: Option<String>,
    ) -> Result<CreatedPost, ServiceError> {
        let post = self
            .store
            .insert_post(NewPost {
                post_id: Uuid::new_v4().to_string(),
                user_id: author_id.to_string(),
                title,
                content,
                image,
            })
            .await?;

        let fanout_queued = self.enqueue_fanout(&post).await;
        Ok(CreatedPost { post, fanout_queued })
    }

    async fn enqueue_fanout(&self, post: &PostEntity) -> bool {
        // 入队时快照粉丝集合
        let follower_ids = match self.follows.followers_of(&post.user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    "failed to load followers of {}, fanout for post {} deferred: {}",
                    post.user_id,
                    post.post_id,
                    e
                );
                return false;
            }
        };

        let job = FanoutJob {
            job_id: Uuid::new_v4().to_string(),
            post_id: post.post_id.clone(),
            author_id: post.user_id.clone(),
            follower_ids,
        };
        let payload = match serde_json::to_string(&job) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("failed to serialize fanout job: {}", e);
                return false;
            }
        };

        match self.queue.enqueue(FEED_QUEUE, &payload).await {
            Ok(()) => {
                tracing::debug!(
                    "fanout job {} enqueued for post {} ({} followers)",
                    job.job_id,
                    job.post_id,
                    job.follower_ids.len()
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    "fanout enqueue failed, post {} will propagate on feed rebuild: {}",
                    post.post_id,
                    e
                );
                false
            }
        }
    }

    /// 帖子详情（含评论和点赞数），旁路缓存
    pub async fn get_detail(&self, post_id: &str) -> Result<Option<PostDetail>, ServiceError> {
        let store = self.store.clone();
        let pid = post_id.to_string();
        self.repo
            .get_or_load(&post_keys::post_key(post_id), async move {
                let Some(post) = store.find_post(&pid).await? else {
                    return Ok(None);
                };
                let comments = store.comments_for_post(&pid).await?;
                let likes_count = store.count_likes(&pid).await?;
                Ok(Some(PostDetail {
                    post,
                    comments,
                    likes_count,
                }))
            })
            .await
    }

    /// 不走缓存的裸帖子记录，归属检查和 worker 用
    pub async fn get_raw(&self, post_id: &str) -> Result<Option<PostEntity>, ServiceError> {
        self.store.find_post(post_id).await
    }

    pub async fn update(
        &self,
        post_id: &str,
        changes: PostChanges,
    ) -> Result<PostEntity, ServiceError> {
        let updated = self
            .store
            .update_post(post_id, changes)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.repo
            .invalidate(&post_keys::post_key(post_id))
            .await;
        Ok(updated)
    }

    /// 删除帖子
    ///
    /// feed 缓存里残留的帖子ID不在这里清理，读路径解析时会丢弃
    /// 悬挂ID，TTL 做最终兜底。
    pub async fn delete(&self, post_id: &str) -> Result<(), ServiceError> {
        if !self.store.delete_post(post_id).await? {
            return Err(ServiceError::NotFound);
        }
        self.repo
            .invalidate(&post_keys::post_key(post_id))
            .await;
        self.repo
            .invalidate(&post_keys::post_likes_key(post_id))
            .await;
        Ok(())
    }

    /// 公开帖子列表，短 TTL 分页缓存
    pub async fn list_page(&self, page: u32, limit: u32) -> Result<Vec<PostEntity>, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page as i64 - 1) * limit as i64;

        let store = self.store.clone();
        let posts = self
            .repo
            .get_or_load_ttl(
                &post_keys::post_page_key(page, limit),
                LISTING_CACHE_EXPIRE,
                async move { store.list_posts(offset, limit as i64).await.map(Some) },
            )
            .await?;
        Ok(posts.unwrap_or_default())
    }

    /// 某作者的帖子分页，直查主存储
    pub async fn by_author(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<PostEntity>, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page as i64 - 1) * limit as i64;
        self.store
            .posts_by_author(user_id, offset, limit as i64)
            .await
    }
}
