/// feed 列表缓存键前缀
const FEED_PREFIX: &str = "feed:";

/// 生成用户 feed 列表缓存键
///
/// 值是帖子ID列表，表头最新，长度受配置上限约束。
pub fn feed_key(user_id: &str) -> String {
    format!("{}{}", FEED_PREFIX, user_id)
}
