use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    CommentEntity, FollowEntity, NewComment, NewPost, NewUser, PostChanges, PostEntity,
    SocialStore, UserEntity,
};
use crate::error::ServiceError;

/// Postgres 主存储实现
///
/// 运行时查询接口，不用编译期宏，构建不依赖在线数据库。
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "user_id, name, email, password_hash, role, verified, verification_code, photo, created_at";
const POST_COLUMNS: &str = "post_id, user_id, title, content, image, created_at";
const COMMENT_COLUMNS: &str = "comment_id, post_id, user_id, text, created_at";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl SocialStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<UserEntity, ServiceError> {
        let sql = format!(
            "INSERT INTO users (user_id, name, email, password_hash, role, verified, verification_code, photo, created_at) \
             VALUES ($1, $2, $3, $4, 'user', false, $5, 'default.png', NOW()) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserEntity>(&sql)
            .bind(&user.user_id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.verification_code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::Conflict
                } else {
                    ServiceError::Database(e)
                }
            })
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, ServiceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let user = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserEntity>, ServiceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn refresh_user_verification(
        &self,
        user_id: &str,
        name: &str,
        password_hash: &str,
        verification_code: &str,
    ) -> Result<UserEntity, ServiceError> {
        let sql = format!(
            "UPDATE users SET name = $1, password_hash = $2, verification_code = $3 \
             WHERE user_id = $4 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(name)
            .bind(password_hash)
            .bind(verification_code)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        user.ok_or(ServiceError::NotFound)
    }

    async fn verify_user_by_code(
        &self,
        code_hash: &str,
    ) -> Result<Option<UserEntity>, ServiceError> {
        let sql = format!(
            "UPDATE users SET verified = true, verification_code = NULL \
             WHERE verification_code = $1 AND verified = false RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(code_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostEntity, ServiceError> {
        let sql = format!(
            "INSERT INTO posts (post_id, user_id, title, content, image, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(&post.post_id)
            .bind(&post.user_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.image)
            .fetch_one(&self.pool)
            .await?;
        Ok(post)
    }

    async fn find_post(&self, post_id: &str) -> Result<Option<PostEntity>, ServiceError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = $1");
        let post = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: &str,
        changes: PostChanges,
    ) -> Result<Option<PostEntity>, ServiceError> {
        let sql = format!(
            "UPDATE posts SET \
             title = COALESCE($1, title), \
             content = COALESCE($2, content), \
             image = COALESCE($3, image) \
             WHERE post_id = $4 RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(&changes.title)
            .bind(&changes.content)
            .bind(&changes.image)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool, ServiceError> {
        // 评论和点赞随帖子一起删，放在一个事务里
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM likes WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM posts WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<PostEntity>, ServiceError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, post_id OFFSET $1 LIMIT $2"
        );
        let posts = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn posts_by_author(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostEntity>, ServiceError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE user_id = $1 \
             ORDER BY created_at DESC, post_id OFFSET $2 LIMIT $3"
        );
        let posts = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(user_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn posts_by_authors(
        &self,
        user_ids: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostEntity>, ServiceError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ANY($1) \
             ORDER BY created_at DESC, post_id OFFSET $2 LIMIT $3"
        );
        let posts = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(user_ids)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn posts_by_ids(&self, post_ids: &[String]) -> Result<Vec<PostEntity>, ServiceError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ANY($1)");
        let posts = sqlx::query_as::<_, PostEntity>(&sql)
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentEntity, ServiceError> {
        let sql = format!(
            "INSERT INTO comments (comment_id, post_id, user_id, text, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) RETURNING {COMMENT_COLUMNS}"
        );
        let comment = sqlx::query_as::<_, CommentEntity>(&sql)
            .bind(&comment.comment_id)
            .bind(&comment.post_id)
            .bind(&comment.user_id)
            .bind(&comment.text)
            .fetch_one(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn find_comment(
        &self,
        comment_id: &str,
    ) -> Result<Option<CommentEntity>, ServiceError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_id = $1");
        let comment = sqlx::query_as::<_, CommentEntity>(&sql)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<bool, ServiceError> {
        let deleted = sqlx::query("DELETE FROM comments WHERE comment_id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn comments_for_post(
        &self,
        post_id: &str,
    ) -> Result<Vec<CommentEntity>, ServiceError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at"
        );
        let comments = sqlx::query_as::<_, CommentEntity>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn insert_like(&self, user_id: &str, post_id: &str) -> Result<bool, ServiceError> {
        // 复合主键 (user_id, post_id) 防并发重复，冲突即已存在
        let inserted = sqlx::query(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted > 0)
    }

    async fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool, ServiceError> {
        let deleted = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn count_likes(&self, post_id: &str) -> Result<i64, ServiceError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowEntity>, ServiceError> {
        // ON CONFLICT DO NOTHING 时 RETURNING 不产生行，正好表达"已存在"
        let follow = sqlx::query_as::<_, FollowEntity>(
            "INSERT INTO follows (follower_id, following_id, created_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT DO NOTHING RETURNING follower_id, following_id, created_at",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(follow)
    }

    async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, ServiceError> {
        let deleted =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(deleted > 0)
    }

    async fn find_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowEntity>, ServiceError> {
        let follow = sqlx::query_as::<_, FollowEntity>(
            "SELECT follower_id, following_id, created_at FROM follows \
             WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(follow)
    }

    async fn follower_ids(&self, user_id: &str) -> Result<Vec<String>, ServiceError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT follower_id FROM follows WHERE following_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn following_ids(&self, user_id: &str) -> Result<Vec<String>, ServiceError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT following_id FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }
}
