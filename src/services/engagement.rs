use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::cache::keys::post_keys;
use crate::error::ServiceError;
use crate::services::repository::ReadThrough;
use crate::store::{CommentEntity, NewComment, SocialStore};

/// 点赞结果
#[derive(Debug, Clone, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: i64,
}

/// 互动服务（点赞、评论）
///
/// 每次变更都在返回前同步失效帖子的点赞数缓存和帖子详情缓存，
/// 详情里嵌着评论和点赞数。
#[derive(Clone)]
pub struct Engagement {
    store: Arc<dyn SocialStore>,
    repo: ReadThrough,
}

impl Engagement {
    pub fn new(store: Arc<dyn SocialStore>, cache: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self {
            store,
            repo: ReadThrough::new(cache, ttl_secs),
        }
    }

    /// 点赞开关
    ///
    /// 已点赞则取消并报告 liked:false，否则创建并报告 liked:true。
    /// 并发重复创建由复合主键兜底，冲突视为已点赞。
    pub async fn toggle_like(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<LikeOutcome, ServiceError> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(ServiceError::NotFound);
        }

        let liked = if self.store.delete_like(user_id, post_id).await? {
            false
        } else {
            // insert 返回 false 说明并发请求已抢先点赞，效果相同
            let _ = self.store.insert_like(user_id, post_id).await?;
            true
        };

        self.invalidate_post(post_id).await;

        let likes_count = self.count_likes(post_id).await?;
        Ok(LikeOutcome { liked, likes_count })
    }

    /// 帖子点赞数，旁路缓存的派生计数
    pub async fn count_likes(&self, post_id: &str) -> Result<i64, ServiceError> {
        let store = self.store.clone();
        let pid = post_id.to_string();
        let count = self
            .repo
            .get_or_load(&post_keys::post_likes_key(post_id), async move {
                store.count_likes(&pid).await.map(Some)
            })
            .await?;
        Ok(count.unwrap_or(0))
    }

    pub async fn create_comment(
        &self,
        user_id: &str,
        post_id: &str,
        text: String,
    ) -> Result<CommentEntity, ServiceError> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(ServiceError::NotFound);
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                comment_id: Uuid::new_v4().to_string(),
                post_id: post_id.to_string(),
                user_id: user_id.to_string(),
                text,
            })
            .await?;

        // 评论嵌在帖子详情里，失效详情缓存
        self.repo
            .invalidate(&post_keys::post_key(post_id))
            .await;
        Ok(comment)
    }

    pub async fn find_comment(
        &self,
        comment_id: &str,
    ) -> Result<Option<CommentEntity>, ServiceError> {
        self.store.find_comment(comment_id).await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<CommentEntity, ServiceError> {
        let Some(comment) = self.store.find_comment(comment_id).await? else {
            return Err(ServiceError::NotFound);
        };
        if !self.store.delete_comment(comment_id).await? {
            return Err(ServiceError::NotFound);
        }
        self.repo
            .invalidate(&post_keys::post_key(&comment.post_id))
            .await;
        Ok(comment)
    }

    async fn invalidate_post(&self, post_id: &str) {
        self.repo
            .invalidate(&post_keys::post_likes_key(post_id))
            .await;
        self.repo.invalidate(&post_keys::post_key(post_id)).await;
    }
}
