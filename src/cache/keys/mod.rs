// 缓存键定义
// 所有键格式集中在这里，避免各处散落的 format! 拼写不一致

pub mod feed_keys;
pub mod follow_keys;
pub mod post_keys;
pub mod user_keys;
