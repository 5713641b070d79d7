use std::sync::Arc;

use uuid::Uuid;

use crate::cache::CacheStore;
use crate::cache::keys::user_keys;
use crate::error::ServiceError;
use crate::services::repository::ReadThrough;
use crate::store::{NewUser, SocialStore, UserEntity};
use crate::utils::{generate_verification_code, hash_password, hash_verification_code, verify_password};

/// 注册结果
///
/// 验证码明文只在这里出现一次，交给邮件边界后即丢弃，
/// 存储里只有 sha256 摘要。
#[derive(Debug)]
pub struct Registration {
    pub user: UserEntity,
    pub verification_code: String,
    /// 未验证用户重复注册时刷新资料并重发验证码
    pub reissued: bool,
}

/// 用户服务
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn SocialStore>,
    repo: ReadThrough,
}

impl UserService {
    pub fn new(store: Arc<dyn SocialStore>, cache: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self {
            store,
            repo: ReadThrough::new(cache, ttl_secs),
        }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, ServiceError> {
        let email = email.to_lowercase();
        let password_hash = hash_password(password)
            .map_err(|e| ServiceError::Internal(format!("failed to hash password: {}", e)))?;
        let (code, hashed_code) = generate_verification_code();

        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            if existing.verified {
                return Err(ServiceError::Conflict);
            }
            // 未验证的老账号：更新资料、换新验证码
            let user = self
                .store
                .refresh_user_verification(&existing.user_id, name, &password_hash, &hashed_code)
                .await?;
            self.invalidate_user(&user).await;
            return Ok(Registration {
                user,
                verification_code: code,
                reissued: true,
            });
        }

        let user = self
            .store
            .create_user(NewUser {
                user_id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                email,
                password_hash,
                verification_code: hashed_code,
            })
            .await?;
        self.invalidate_user(&user).await;

        Ok(Registration {
            user,
            verification_code: code,
            reissued: false,
        })
    }

    /// 邮箱密码认证，凭据无效返回 None
    ///
    /// 绕过缓存直查主存储，缓存里的用户不带密码哈希。
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserEntity>, ServiceError> {
        let Some(user) = self.store.find_user_by_email(&email.to_lowercase()).await? else {
            return Ok(None);
        };
        let Some(hash) = user.password_hash.as_deref() else {
            return Ok(None);
        };
        let valid = verify_password(password, hash)
            .map_err(|e| ServiceError::Internal(format!("failed to verify password: {}", e)))?;
        Ok(valid.then_some(user))
    }

    /// 按邮件里的验证码核销
    pub async fn verify_email(&self, code: &str) -> Result<UserEntity, ServiceError> {
        let hashed = hash_verification_code(code);
        let user = self
            .store
            .verify_user_by_code(&hashed)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.invalidate_user(&user).await;
        Ok(user)
    }

    /// 按ID取用户，旁路缓存
    pub async fn get_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, ServiceError> {
        let store = self.store.clone();
        let uid = user_id.to_string();
        self.repo
            .get_or_load(&user_keys::user_key(user_id), async move {
                store.find_user_by_id(&uid).await
            })
            .await
    }

    /// 按邮箱取用户，旁路缓存
    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserEntity>, ServiceError> {
        let email = email.to_lowercase();
        let store = self.store.clone();
        let key = user_keys::user_email_key(&email);
        self.repo
            .get_or_load(&key, async move { store.find_user_by_email(&email).await })
            .await
    }

    async fn invalidate_user(&self, user: &UserEntity) {
        self.repo
            .invalidate(&user_keys::user_key(&user.user_id))
            .await;
        self.repo
            .invalidate(&user_keys::user_email_key(&user.email))
            .await;
    }
}
