use std::sync::Arc;

use crate::cache::CacheStore;
use crate::cache::keys::follow_keys;
use crate::error::ServiceError;
use crate::services::repository::ReadThrough;
use crate::store::{FollowEntity, SocialStore};

/// 关注图服务
///
/// 维护有向关注边和两侧的邻接表缓存。边的唯一性靠存储层的
/// 复合主键兜底，服务层把冲突当作"已存在"。
#[derive(Clone)]
pub struct FollowGraph {
    store: Arc<dyn SocialStore>,
    repo: ReadThrough,
}

impl FollowGraph {
    pub fn new(store: Arc<dyn SocialStore>, cache: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self {
            store,
            repo: ReadThrough::new(cache, ttl_secs),
        }
    }

    /// 创建关注边，幂等
    ///
    /// 已有边原样返回，不产生重复；新建边后失效两侧的邻接表缓存。
    pub async fn follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<FollowEntity, ServiceError> {
        if follower_id == following_id {
            return Err(ServiceError::SelfFollow);
        }

        if let Some(existing) = self.store.find_follow(follower_id, following_id).await? {
            return Ok(existing);
        }

        match self.store.insert_follow(follower_id, following_id).await? {
            Some(created) => {
                self.invalidate_edges(follower_id, following_id).await;
                Ok(created)
            }
            // 并发创建撞上唯一约束，按已存在处理
            None => self
                .store
                .find_follow(follower_id, following_id)
                .await?
                .ok_or(ServiceError::Conflict),
        }
    }

    /// 删除关注边
    ///
    /// 边不存在返回 NotFound，且不触碰任何缓存。
    pub async fn unfollow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<(), ServiceError> {
        if !self.store.delete_follow(follower_id, following_id).await? {
            return Err(ServiceError::NotFound);
        }
        self.invalidate_edges(follower_id, following_id).await;
        Ok(())
    }

    /// 关注 user_id 的用户ID列表（粉丝），旁路缓存
    pub async fn followers_of(&self, user_id: &str) -> Result<Vec<String>, ServiceError> {
        let store = self.store.clone();
        let uid = user_id.to_string();
        let ids = self
            .repo
            .get_or_load(&follow_keys::followers_key(user_id), async move {
                store.follower_ids(&uid).await.map(Some)
            })
            .await?;
        Ok(ids.unwrap_or_default())
    }

    /// user_id 关注的用户ID列表，旁路缓存
    pub async fn following_of(&self, user_id: &str) -> Result<Vec<String>, ServiceError> {
        let store = self.store.clone();
        let uid = user_id.to_string();
        let ids = self
            .repo
            .get_or_load(&follow_keys::following_key(user_id), async move {
                store.following_ids(&uid).await.map(Some)
            })
            .await?;
        Ok(ids.unwrap_or_default())
    }

    /// 是否已关注，直查主存储
    ///
    /// 命中主键索引，缓存价值不大。
    pub async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .store
            .find_follow(follower_id, following_id)
            .await?
            .is_some())
    }

    async fn invalidate_edges(&self, follower_id: &str, following_id: &str) {
        self.repo
            .invalidate(&follow_keys::followers_key(following_id))
            .await;
        self.repo
            .invalidate(&follow_keys::following_key(follower_id))
            .await;
    }
}
