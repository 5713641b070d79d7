mod common;

use backend::error::ServiceError;
use common::{register_verified, test_env};

#[tokio::test]
async fn follow_is_idempotent() {
    let env = test_env();
    let a = register_verified(&env, "alice").await;
    let b = register_verified(&env, "bob").await;

    // 重复调用不产生重复边
    for _ in 0..3 {
        let edge = env.follows.follow(&a.user_id, &b.user_id).await.unwrap();
        assert_eq!(edge.follower_id, a.user_id);
        assert_eq!(edge.following_id, b.user_id);
    }

    assert_eq!(
        env.follows.followers_of(&b.user_id).await.unwrap(),
        vec![a.user_id.clone()]
    );
    assert_eq!(
        env.follows.following_of(&a.user_id).await.unwrap(),
        vec![b.user_id.clone()]
    );
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let env = test_env();
    let a = register_verified(&env, "alice").await;

    let err = env.follows.follow(&a.user_id, &a.user_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::SelfFollow));
    assert!(env.follows.followers_of(&a.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unfollow_missing_edge_is_not_found_and_leaves_cache_alone() {
    let env = test_env();
    let a = register_verified(&env, "alice").await;
    let b = register_verified(&env, "bob").await;

    // 先把两侧邻接表缓存填热
    env.follows.followers_of(&b.user_id).await.unwrap();
    env.follows.following_of(&a.user_id).await.unwrap();
    let followers_key = format!("followers:{}", b.user_id);
    let cached_before = env.cache.get(&followers_key).await.unwrap();
    assert!(cached_before.is_some());

    let err = env
        .follows
        .unfollow(&a.user_id, &b.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));

    // 失败的取关不触碰缓存
    assert_eq!(env.cache.get(&followers_key).await.unwrap(), cached_before);
}

#[tokio::test]
async fn follow_invalidates_adjacency_caches() {
    let env = test_env();
    let a = register_verified(&env, "alice").await;
    let b = register_verified(&env, "bob").await;

    // 冷读缓存了空列表
    assert!(env.follows.followers_of(&b.user_id).await.unwrap().is_empty());
    assert!(env.follows.following_of(&a.user_id).await.unwrap().is_empty());

    env.follows.follow(&a.user_id, &b.user_id).await.unwrap();

    // 同步失效生效，读到的是新边而不是缓存的空列表
    assert_eq!(
        env.follows.followers_of(&b.user_id).await.unwrap(),
        vec![a.user_id.clone()]
    );
    assert_eq!(
        env.follows.following_of(&a.user_id).await.unwrap(),
        vec![b.user_id.clone()]
    );

    env.follows.unfollow(&a.user_id, &b.user_id).await.unwrap();
    assert!(env.follows.followers_of(&b.user_id).await.unwrap().is_empty());
    assert!(env.follows.following_of(&a.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn is_following_reflects_edge_state() {
    let env = test_env();
    let a = register_verified(&env, "alice").await;
    let b = register_verified(&env, "bob").await;

    assert!(!env.follows.is_following(&a.user_id, &b.user_id).await.unwrap());
    env.follows.follow(&a.user_id, &b.user_id).await.unwrap();
    assert!(env.follows.is_following(&a.user_id, &b.user_id).await.unwrap());
    // 方向性：b 没有关注 a
    assert!(!env.follows.is_following(&b.user_id, &a.user_id).await.unwrap());
}
