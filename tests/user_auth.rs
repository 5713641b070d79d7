mod common;

use backend::error::ServiceError;
use common::{register_verified, test_env};

#[tokio::test]
async fn register_verify_login_flow() {
    let env = test_env();

    let registration = env
        .users
        .register("Alice", "Alice@Example.com", "password1")
        .await
        .unwrap();
    // 邮箱统一小写存储
    assert_eq!(registration.user.email, "alice@example.com");
    assert!(!registration.user.verified);
    assert!(!registration.reissued);

    // 凭据正确但尚未验证
    let user = env
        .users
        .authenticate("alice@example.com", "password1")
        .await
        .unwrap()
        .expect("credentials are valid");
    assert!(!user.verified);

    let verified = env
        .users
        .verify_email(&registration.verification_code)
        .await
        .unwrap();
    assert!(verified.verified);

    // 错误密码拿不到用户
    assert!(env
        .users
        .authenticate("alice@example.com", "wrong")
        .await
        .unwrap()
        .is_none());

    // 验证码只能用一次
    let err = env
        .users
        .verify_email(&registration.verification_code)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn verified_email_cannot_register_again() {
    let env = test_env();
    register_verified(&env, "alice").await;

    let err = env
        .users
        .register("Alice2", "alice@example.com", "password2")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict));
}

#[tokio::test]
async fn unverified_registration_reissues_code() {
    let env = test_env();
    let first = env
        .users
        .register("Alice", "alice@example.com", "password1")
        .await
        .unwrap();

    let second = env
        .users
        .register("Alice Renamed", "alice@example.com", "password2")
        .await
        .unwrap();
    assert!(second.reissued);
    assert_eq!(first.user.user_id, second.user.user_id);
    assert_eq!(second.user.name, "Alice Renamed");

    // 旧验证码作废，新验证码生效
    assert!(matches!(
        env.users.verify_email(&first.verification_code).await,
        Err(ServiceError::NotFound)
    ));
    let verified = env
        .users
        .verify_email(&second.verification_code)
        .await
        .unwrap();
    assert!(verified.verified);

    // 密码也换成了第二次注册的
    assert!(env
        .users
        .authenticate("alice@example.com", "password2")
        .await
        .unwrap()
        .is_some());
    assert!(env
        .users
        .authenticate("alice@example.com", "password1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn user_cache_is_invalidated_on_verification() {
    let env = test_env();
    let registration = env
        .users
        .register("Alice", "alice@example.com", "password1")
        .await
        .unwrap();
    let user_id = registration.user.user_id.clone();

    // 读一次把未验证状态放进缓存
    let cached = env.users.get_by_id(&user_id).await.unwrap().unwrap();
    assert!(!cached.verified);

    env.users
        .verify_email(&registration.verification_code)
        .await
        .unwrap();

    // 核销同步失效用户缓存，读到的是已验证状态
    let fresh = env.users.get_by_id(&user_id).await.unwrap().unwrap();
    assert!(fresh.verified);

    let by_email = env
        .users
        .get_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(by_email.verified);
}

#[tokio::test]
async fn cached_user_lookup_skips_store_on_second_read() {
    let env = test_env();
    let alice = register_verified(&env, "alice").await;

    let first = env.users.get_by_id(&alice.user_id).await.unwrap().unwrap();
    // 缓存条目不带密码哈希
    let raw = env
        .cache
        .get(&format!("user:{}", alice.user_id))
        .await
        .unwrap()
        .expect("user cached after read");
    assert!(!raw.contains("password_hash"));

    let second = env.users.get_by_id(&alice.user_id).await.unwrap().unwrap();
    assert_eq!(first.user_id, second.user_id);
    assert_eq!(first.email, second.email);
}
