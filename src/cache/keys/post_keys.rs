/// 帖子详情缓存键前缀
const POST_PREFIX: &str = "post:";

/// 帖子点赞数缓存键前缀
const POST_LIKES_PREFIX: &str = "post:likes:";

/// 帖子分页列表缓存键前缀
const POST_PAGE_PREFIX: &str = "posts:page:";

/// 生成帖子详情缓存键
pub fn post_key(post_id: &str) -> String {
    format!("{}{}", POST_PREFIX, post_id)
}

/// 生成帖子点赞数缓存键
pub fn post_likes_key(post_id: &str) -> String {
    format!("{}{}", POST_LIKES_PREFIX, post_id)
}

/// 生成公开帖子列表分页缓存键
pub fn post_page_key(page: u32, limit: u32) -> String {
    format!("{}{}:{}", POST_PAGE_PREFIX, page, limit)
}
