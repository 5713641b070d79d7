use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use super::{CacheError, CacheStore};

/// Redis 缓存后端
///
/// 每次操作带超时保护，超时按缓存故障处理而不是挂起请求。
#[derive(Clone)]
pub struct RedisCacheStore {
    client: Arc<RedisClient>,
    timeout: Duration,
}

impl RedisCacheStore {
    pub fn new(client: Arc<RedisClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| CacheError::Backend(e.to_string())),
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move { conn.get(key).await }).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move { conn.set_ex(key, value, ttl_secs).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move { conn.del(key).await }).await
    }

    async fn push_front(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move { conn.lpush(key, value).await })
            .await
    }

    async fn remove_from_list(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // count = 0 表示删除所有匹配元素
        let _: i64 = self
            .bounded(async move { conn.lrem(key, 0, value).await })
            .await?;
        Ok(())
    }

    async fn trim(&self, key: &str, start: isize, stop: isize) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move { conn.ltrim(key, start, stop).await })
            .await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: bool = self
            .bounded(async move { conn.expire(key, ttl_secs as i64).await })
            .await?;
        Ok(())
    }

    async fn range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move { conn.lrange(key, start, stop).await })
            .await
    }
}
