// 主存储模块
// 实体定义和存储抽象，Postgres 为生产实现，内存实现供测试使用

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ServiceError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// 普通用户角色
pub const ROLE_USER: &str = "user";
/// 管理员角色
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserEntity {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub role: String,
    pub verified: bool,
    #[serde(skip_serializing, default)]
    pub verification_code: Option<String>,
    pub photo: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostEntity {
    pub post_id: String,
    /// 冗余的作者ID，feed 回源查询按它过滤
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentEntity {
    pub comment_id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FollowEntity {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub verification_code: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub post_id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub comment_id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
}

/// 帖子可更新字段，None 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

/// 主存储抽象
///
/// 关系数据的唯一事实来源。复合主键（关注边、点赞）依赖存储层的
/// 唯一约束做并发防护，insert_* 在冲突时返回"已存在"而不是报错。
#[async_trait]
pub trait SocialStore: Send + Sync {
    // ---- 用户 ----
    async fn create_user(&self, user: NewUser) -> Result<UserEntity, ServiceError>;
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, ServiceError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserEntity>, ServiceError>;
    /// 未验证用户重新注册时刷新资料和验证码
    async fn refresh_user_verification(
        &self,
        user_id: &str,
        name: &str,
        password_hash: &str,
        verification_code: &str,
    ) -> Result<UserEntity, ServiceError>;
    /// 按验证码摘要核销，成功返回被验证的用户
    async fn verify_user_by_code(
        &self,
        code_hash: &str,
    ) -> Result<Option<UserEntity>, ServiceError>;

    // ---- 帖子 ----
    async fn insert_post(&self, post: NewPost) -> Result<PostEntity, ServiceError>;
    async fn find_post(&self, post_id: &str) -> Result<Option<PostEntity>, ServiceError>;
    async fn update_post(
        &self,
        post_id: &str,
        changes: PostChanges,
    ) -> Result<Option<PostEntity>, ServiceError>;
    /// 删除帖子并级联删除评论和点赞，返回是否存在
    async fn delete_post(&self, post_id: &str) -> Result<bool, ServiceError>;
    /// 公开帖子列表，按创建时间倒序
    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<PostEntity>, ServiceError>;
    async fn posts_by_author(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostEntity>, ServiceError>;
    /// feed 回源查询：作者集合内的帖子按创建时间倒序分页
    async fn posts_by_authors(
        &self,
        user_ids: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostEntity>, ServiceError>;
    /// 批量按ID取帖子，缺失的ID直接缺席，不报错
    async fn posts_by_ids(&self, post_ids: &[String]) -> Result<Vec<PostEntity>, ServiceError>;

    // ---- 评论 ----
    async fn insert_comment(&self, comment: NewComment) -> Result<CommentEntity, ServiceError>;
    async fn find_comment(&self, comment_id: &str)
    -> Result<Option<CommentEntity>, ServiceError>;
    async fn delete_comment(&self, comment_id: &str) -> Result<bool, ServiceError>;
    async fn comments_for_post(
        &self,
        post_id: &str,
    ) -> Result<Vec<CommentEntity>, ServiceError>;

    // ---- 点赞 ----
    /// 返回 true 表示新建，false 表示已存在（并发重复点赞）
    async fn insert_like(&self, user_id: &str, post_id: &str) -> Result<bool, ServiceError>;
    /// 返回 true 表示删除了存在的点赞
    async fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool, ServiceError>;
    async fn count_likes(&self, post_id: &str) -> Result<i64, ServiceError>;

    // ---- 关注边 ----
    /// 返回 None 表示边已存在（幂等创建留给服务层处理）
    async fn insert_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowEntity>, ServiceError>;
    async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, ServiceError>;
    async fn find_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowEntity>, ServiceError>;
    /// 关注 user_id 的人（粉丝）
    async fn follower_ids(&self, user_id: &str) -> Result<Vec<String>, ServiceError>;
    /// user_id 关注的人
    async fn following_ids(&self, user_id: &str) -> Result<Vec<String>, ServiceError>;
}
