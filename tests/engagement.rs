mod common;

use backend::error::ServiceError;
use common::{register_verified, test_env};

#[tokio::test]
async fn toggle_like_twice_returns_to_zero() {
    let env = test_env();
    let author = register_verified(&env, "author").await;
    let reader = register_verified(&env, "reader").await;
    let created = env
        .posts
        .create(&author.user_id, "标题".into(), "内容".into(), None)
        .await
        .unwrap();
    let post_id = created.post.post_id;

    assert_eq!(env.engagement.count_likes(&post_id).await.unwrap(), 0);

    let first = env
        .engagement
        .toggle_like(&reader.user_id, &post_id)
        .await
        .unwrap();
    assert!(first.liked);
    assert_eq!(first.likes_count, 1);

    let second = env
        .engagement
        .toggle_like(&reader.user_id, &post_id)
        .await
        .unwrap();
    assert!(!second.liked);
    assert_eq!(second.likes_count, 0);

    // 偶数次切换后派生计数回到0
    assert_eq!(env.engagement.count_likes(&post_id).await.unwrap(), 0);
}

#[tokio::test]
async fn toggle_like_on_missing_post_is_not_found() {
    let env = test_env();
    let reader = register_verified(&env, "reader").await;

    let err = env
        .engagement
        .toggle_like(&reader.user_id, "no-such-post")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn post_detail_reflects_likes_after_toggle() {
    let env = test_env();
    let author = register_verified(&env, "author").await;
    let reader = register_verified(&env, "reader").await;
    let created = env
        .posts
        .create(&author.user_id, "标题".into(), "内容".into(), None)
        .await
        .unwrap();
    let post_id = created.post.post_id;

    // 先读一次，详情进缓存
    let detail = env.posts.get_detail(&post_id).await.unwrap().unwrap();
    assert_eq!(detail.likes_count, 0);

    env.engagement
        .toggle_like(&reader.user_id, &post_id)
        .await
        .unwrap();

    // 点赞同步失效了详情缓存，读到的是新计数
    let detail = env.posts.get_detail(&post_id).await.unwrap().unwrap();
    assert_eq!(detail.likes_count, 1);
}

#[tokio::test]
async fn comments_invalidate_post_detail() {
    let env = test_env();
    let author = register_verified(&env, "author").await;
    let reader = register_verified(&env, "reader").await;
    let created = env
        .posts
        .create(&author.user_id, "标题".into(), "内容".into(), None)
        .await
        .unwrap();
    let post_id = created.post.post_id;

    assert!(env
        .posts
        .get_detail(&post_id)
        .await
        .unwrap()
        .unwrap()
        .comments
        .is_empty());

    let comment = env
        .engagement
        .create_comment(&reader.user_id, &post_id, "不错".into())
        .await
        .unwrap();

    let detail = env.posts.get_detail(&post_id).await.unwrap().unwrap();
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].text, "不错");

    env.engagement
        .delete_comment(&comment.comment_id)
        .await
        .unwrap();

    assert!(env
        .posts
        .get_detail(&post_id)
        .await
        .unwrap()
        .unwrap()
        .comments
        .is_empty());
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let env = test_env();
    let reader = register_verified(&env, "reader").await;

    let err = env
        .engagement
        .create_comment(&reader.user_id, "no-such-post", "hi".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));

    let err = env
        .engagement
        .delete_comment("no-such-comment")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn post_update_and_delete_invalidate_detail() {
    let env = test_env();
    let author = register_verified(&env, "author").await;
    let created = env
        .posts
        .create(&author.user_id, "旧标题".into(), "内容".into(), None)
        .await
        .unwrap();
    let post_id = created.post.post_id;

    assert_eq!(
        env.posts.get_detail(&post_id).await.unwrap().unwrap().post.title,
        "旧标题"
    );

    env.posts
        .update(
            &post_id,
            backend::store::PostChanges {
                title: Some("新标题".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // 更新后的读不会拿到缓存里的旧标题
    assert_eq!(
        env.posts.get_detail(&post_id).await.unwrap().unwrap().post.title,
        "新标题"
    );

    env.posts.delete(&post_id).await.unwrap();
    assert!(env.posts.get_detail(&post_id).await.unwrap().is_none());
}
