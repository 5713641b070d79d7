// 缓存模块
// 缓存抽象接口、键定义和两种后端实现

pub mod keys;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryCacheStore;
pub use self::redis::RedisCacheStore;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache operation timed out")]
    Timeout,
}

/// 缓存存储抽象
///
/// 读路径调用方必须把错误当作缓存未命中处理，不允许让缓存故障
/// 影响请求结果。列表操作服务于 feed 的有界物化视图。
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// 写入并设置过期时间（秒）
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// 列表头部插入
    async fn push_front(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// 删除列表中所有等于 value 的元素，用于去重后再插入
    async fn remove_from_list(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// 裁剪列表到 [start, stop] 闭区间
    async fn trim(&self, key: &str, start: isize, stop: isize) -> Result<(), CacheError>;

    /// 刷新键的过期时间
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// 读取列表 [start, stop] 闭区间，键不存在返回空
    async fn range(&self, key: &str, start: isize, stop: isize)
    -> Result<Vec<String>, CacheError>;
}
