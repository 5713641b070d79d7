use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    CommentEntity, FollowEntity, NewComment, NewPost, NewUser, PostChanges, PostEntity,
    ROLE_USER, SocialStore, UserEntity,
};
use crate::error::ServiceError;

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserEntity>,
    // 插入顺序保留，时间戳相同时后插入的视为更新
    posts: Vec<PostEntity>,
    comments: Vec<CommentEntity>,
    likes: HashSet<(String, String)>,
    follows: Vec<FollowEntity>,
}

/// 内存主存储实现
///
/// 测试用，语义对齐 Postgres 实现：唯一约束、级联删除、倒序分页。
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

impl Inner {
    /// 创建时间倒序，时间相同时后插入的排前面
    fn posts_newest_first<'a>(
        &'a self,
        filter: impl Fn(&PostEntity) -> bool + 'a,
    ) -> Vec<PostEntity> {
        let mut posts: Vec<PostEntity> = self
            .posts
            .iter()
            .rev()
            .filter(|p| filter(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }
}

#[async_trait]
impl SocialStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<UserEntity, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(ServiceError::Conflict);
        }
        let entity = UserEntity {
            user_id: user.user_id.clone(),
            name: user.name,
            email: user.email,
            password_hash: Some(user.password_hash),
            role: ROLE_USER.to_string(),
            verified: false,
            verification_code: Some(user.verification_code),
            photo: "default.png".to_string(),
            created_at: Utc::now(),
        };
        inner.users.insert(user.user_id, entity.clone());
        Ok(entity)
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn refresh_user_verification(
        &self,
        user_id: &str,
        name: &str,
        password_hash: &str,
        verification_code: &str,
    ) -> Result<UserEntity, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let user = inner.users.get_mut(user_id).ok_or(ServiceError::NotFound)?;
        user.name = name.to_string();
        user.password_hash = Some(password_hash.to_string());
        user.verification_code = Some(verification_code.to_string());
        Ok(user.clone())
    }

    async fn verify_user_by_code(
        &self,
        code_hash: &str,
    ) -> Result<Option<UserEntity>, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let user = inner
            .users
            .values_mut()
            .find(|u| !u.verified && u.verification_code.as_deref() == Some(code_hash));
        Ok(user.map(|u| {
            u.verified = true;
            u.verification_code = None;
            u.clone()
        }))
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostEntity, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let entity = PostEntity {
            post_id: post.post_id,
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            image: post.image,
            created_at: Utc::now(),
        };
        inner.posts.push(entity.clone());
        Ok(entity)
    }

    async fn find_post(&self, post_id: &str) -> Result<Option<PostEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.posts.iter().find(|p| p.post_id == post_id).cloned())
    }

    async fn update_post(
        &self,
        post_id: &str,
        changes: PostChanges,
    ) -> Result<Option<PostEntity>, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let Some(post) = inner.posts.iter_mut().find(|p| p.post_id == post_id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(image) = changes.image {
            post.image = Some(image);
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let before = inner.posts.len();
        inner.posts.retain(|p| p.post_id != post_id);
        if inner.posts.len() == before {
            return Ok(false);
        }
        // 级联删除
        inner.comments.retain(|c| c.post_id != post_id);
        inner.likes.retain(|(_, liked_post)| liked_post != post_id);
        Ok(true)
    }

    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<PostEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(page(inner.posts_newest_first(|_| true), offset, limit))
    }

    async fn posts_by_author(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(page(
            inner.posts_newest_first(|p| p.user_id == user_id),
            offset,
            limit,
        ))
    }

    async fn posts_by_authors(
        &self,
        user_ids: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let authors: HashSet<&str> = user_ids.iter().map(String::as_str).collect();
        Ok(page(
            inner.posts_newest_first(|p| authors.contains(p.user_id.as_str())),
            offset,
            limit,
        ))
    }

    async fn posts_by_ids(&self, post_ids: &[String]) -> Result<Vec<PostEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let wanted: HashSet<&str> = post_ids.iter().map(String::as_str).collect();
        Ok(inner
            .posts
            .iter()
            .filter(|p| wanted.contains(p.post_id.as_str()))
            .cloned()
            .collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentEntity, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let entity = CommentEntity {
            comment_id: comment.comment_id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        inner.comments.push(entity.clone());
        Ok(entity)
    }

    async fn find_comment(
        &self,
        comment_id: &str,
    ) -> Result<Option<CommentEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .comments
            .iter()
            .find(|c| c.comment_id == comment_id)
            .cloned())
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let before = inner.comments.len();
        inner.comments.retain(|c| c.comment_id != comment_id);
        Ok(inner.comments.len() != before)
    }

    async fn comments_for_post(
        &self,
        post_id: &str,
    ) -> Result<Vec<CommentEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn insert_like(&self, user_id: &str, post_id: &str) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .likes
            .insert((user_id.to_string(), post_id.to_string())))
    }

    async fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .likes
            .remove(&(user_id.to_string(), post_id.to_string())))
    }

    async fn count_likes(&self, post_id: &str) -> Result<i64, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .likes
            .iter()
            .filter(|(_, liked_post)| liked_post == post_id)
            .count() as i64)
    }

    async fn insert_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowEntity>, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let exists = inner
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id);
        if exists {
            return Ok(None);
        }
        let entity = FollowEntity {
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: Utc::now(),
        };
        inner.follows.push(entity.clone());
        Ok(Some(entity))
    }

    async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let before = inner.follows.len();
        inner
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(inner.follows.len() != before)
    }

    async fn find_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowEntity>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .follows
            .iter()
            .find(|f| f.follower_id == follower_id && f.following_id == following_id)
            .cloned())
    }

    async fn follower_ids(&self, user_id: &str) -> Result<Vec<String>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .follows
            .iter()
            .filter(|f| f.following_id == user_id)
            .map(|f| f.follower_id.clone())
            .collect())
    }

    async fn following_ids(&self, user_id: &str) -> Result<Vec<String>, ServiceError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(id: &str, author: &str) -> NewPost {
        NewPost {
            post_id: id.to_string(),
            user_id: author.to_string(),
            title: format!("title-{id}"),
            content: "body".to_string(),
            image: None,
        }
    }

    #[tokio::test]
    async fn newest_first_pagination() {
        let store = MemoryStore::new();
        for id in ["p1", "p2", "p3"] {
            store.insert_post(new_post(id, "u1")).await.unwrap();
        }
        let posts = store.list_posts(0, 2).await.unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, ["p3", "p2"]);
        let rest = store.list_posts(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].post_id, "p1");
    }

    #[tokio::test]
    async fn delete_post_cascades() {
        let store = MemoryStore::new();
        store.insert_post(new_post("p1", "u1")).await.unwrap();
        store
            .insert_comment(NewComment {
                comment_id: "c1".into(),
                post_id: "p1".into(),
                user_id: "u2".into(),
                text: "hi".into(),
            })
            .await
            .unwrap();
        assert!(store.insert_like("u2", "p1").await.unwrap());

        assert!(store.delete_post("p1").await.unwrap());
        assert!(store.find_comment("c1").await.unwrap().is_none());
        assert_eq!(store.count_likes("p1").await.unwrap(), 0);
        // 再删一次是 false
        assert!(!store.delete_post("p1").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_like_and_follow_are_rejected() {
        let store = MemoryStore::new();
        assert!(store.insert_like("u1", "p1").await.unwrap());
        assert!(!store.insert_like("u1", "p1").await.unwrap());

        assert!(store.insert_follow("u1", "u2").await.unwrap().is_some());
        assert!(store.insert_follow("u1", "u2").await.unwrap().is_none());
        assert_eq!(store.follower_ids("u2").await.unwrap(), vec!["u1"]);
        assert_eq!(store.following_ids("u1").await.unwrap(), vec!["u2"]);
    }
}
