/// 粉丝列表缓存键前缀
const FOLLOWERS_PREFIX: &str = "followers:";

/// 关注列表缓存键前缀
const FOLLOWING_PREFIX: &str = "following:";

/// 生成粉丝ID列表缓存键（关注该用户的人）
pub fn followers_key(user_id: &str) -> String {
    format!("{}{}", FOLLOWERS_PREFIX, user_id)
}

/// 生成关注ID列表缓存键（该用户关注的人）
pub fn following_key(user_id: &str) -> String {
    format!("{}{}", FOLLOWING_PREFIX, user_id)
}
