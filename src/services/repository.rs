use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::CacheStore;
use crate::error::ServiceError;

/// 旁路缓存读取器
///
/// 读：先查缓存，命中反序列化返回；未命中回源加载，命中结果带 TTL
/// 写回。缓存层的任何错误（含超时）都降级为未命中，只记日志。
/// 失效：无条件删除，必须在变更操作返回前同步调用。
#[derive(Clone)]
pub struct ReadThrough {
    cache: Arc<dyn CacheStore>,
    ttl_secs: u64,
}

impl ReadThrough {
    pub fn new(cache: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self { cache, ttl_secs }
    }

    pub async fn get_or_load<T, F>(&self, key: &str, load: F) -> Result<Option<T>, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<Option<T>, ServiceError>> + Send,
    {
        self.get_or_load_ttl(key, self.ttl_secs, load).await
    }

    /// 指定 TTL 的变体，短命缓存（如分页列表）用
    pub async fn get_or_load_ttl<T, F>(
        &self,
        key: &str,
        ttl_secs: u64,
        load: F,
    ) -> Result<Option<T>, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<Option<T>, ServiceError>> + Send,
    {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!("cache hit: {}", key);
                    return Ok(Some(value));
                }
                Err(e) => {
                    // 载荷格式变了（比如升级后），当未命中处理
                    tracing::warn!("discarding undecodable cache entry {}: {}", key, e);
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("cache read failed for {}, falling back to store: {}", key, e);
            }
        }

        let loaded = load.await?;

        if let Some(ref value) = loaded {
            match serde_json::to_string(value) {
                Ok(json) => {
                    if let Err(e) = self.cache.set_ex(key, &json, ttl_secs).await {
                        tracing::warn!("cache set failed for {}: {}", key, e);
                    } else {
                        tracing::debug!("cache set: {}", key);
                    }
                }
                Err(e) => tracing::warn!("cache serialize failed for {}: {}", key, e),
            }
        }

        Ok(loaded)
    }

    /// 同步失效缓存键，失败只记日志（TTL 是最终兜底）
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            tracing::warn!("cache invalidation failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;

    #[tokio::test]
    async fn miss_loads_and_populates() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let repo = ReadThrough::new(cache.clone(), 60);

        let value = repo
            .get_or_load("k", async { Ok(Some("hello".to_string())) })
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("hello"));

        // 第二次直接命中缓存，加载器不应被执行
        let value = repo
            .get_or_load::<String, _>("k", async {
                panic!("loader must not run on cache hit")
            })
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn absent_entity_is_not_cached() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let repo = ReadThrough::new(cache.clone(), 60);

        let value = repo
            .get_or_load::<String, _>("missing", async { Ok(None) })
            .await
            .unwrap();
        assert!(value.is_none());
        assert!(cache.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let repo = ReadThrough::new(cache, 60);

        repo.get_or_load("k", async { Ok(Some(1_i64)) })
            .await
            .unwrap();
        repo.invalidate("k").await;
        let value = repo
            .get_or_load("k", async { Ok(Some(2_i64)) })
            .await
            .unwrap();
        assert_eq!(value, Some(2));
    }
}
