mod common;

use backend::services::feed::FeedSource;
use backend::store::NewPost;
use common::{register_verified, test_env};

/// 规格化场景：关注、发帖、扇出、读 feed、取关后冷重建
#[tokio::test]
async fn follow_post_fanout_read_unfollow_scenario() {
    let env = test_env();
    let u1 = register_verified(&env, "reader").await;
    let u2 = register_verified(&env, "writer").await;

    env.follows.follow(&u1.user_id, &u2.user_id).await.unwrap();

    let p1 = env
        .posts
        .create(&u2.user_id, "Hello".into(), "World".into(), None)
        .await
        .unwrap();
    env.worker.drain().await.unwrap();

    let page = env.feeds.get_feed(&u1.user_id, 1, 20).await.unwrap();
    assert_eq!(page.posts[0].post_id, p1.post.post_id);
    assert_eq!(page.posts[0].title, "Hello");
    assert_eq!(page.posts[0].content, "World");

    // 取关后 u2 的新帖子不再进入 u1 的冷重建 feed
    env.follows.unfollow(&u1.user_id, &u2.user_id).await.unwrap();
    let p2 = env
        .posts
        .create(&u2.user_id, "Again".into(), "More".into(), None)
        .await
        .unwrap();
    env.worker.drain().await.unwrap();

    // 旧缓存条目 P1 在 TTL 内合法残留
    let cached = env
        .cache
        .range(&format!("feed:{}", u1.user_id), 0, -1)
        .await
        .unwrap();
    assert!(cached.contains(&p1.post.post_id));
    assert!(!cached.contains(&p2.post.post_id));

    // 模拟缓存失效后的冷重建：关注集合已空，feed 里没有 P2
    env.cache
        .delete(&format!("feed:{}", u1.user_id))
        .await
        .unwrap();
    let rebuilt = env.feeds.get_feed(&u1.user_id, 1, 20).await.unwrap();
    assert_eq!(rebuilt.source, FeedSource::Store);
    assert!(rebuilt.posts.is_empty());
}

#[tokio::test]
async fn cold_read_repopulates_only_first_page() {
    let env = test_env();
    let reader = register_verified(&env, "reader").await;
    let writer = register_verified(&env, "writer").await;
    env.follows.follow(&reader.user_id, &writer.user_id).await.unwrap();

    // 帖子直接入库，模拟扇出前就存在的历史内容
    for i in 0..5 {
        env.store
            .insert_post(NewPost {
                post_id: format!("p{i}"),
                user_id: writer.user_id.clone(),
                title: format!("post-{i}"),
                content: "body".into(),
                image: None,
            })
            .await
            .unwrap();
    }

    // 冷读第一页：回源并回填缓存
    let first = env.feeds.get_feed(&reader.user_id, 1, 2).await.unwrap();
    assert_eq!(first.source, FeedSource::Store);
    let ids: Vec<&str> = first.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, ["p4", "p3"]);

    // 第二次读同一页走缓存，内容一致
    let again = env.feeds.get_feed(&reader.user_id, 1, 2).await.unwrap();
    assert_eq!(again.source, FeedSource::Cache);
    let ids: Vec<&str> = again.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, ["p4", "p3"]);

    // 第二页超出已回填的窗口，回源读取，且不触发回填
    let second = env.feeds.get_feed(&reader.user_id, 2, 2).await.unwrap();
    assert_eq!(second.source, FeedSource::Store);
    let ids: Vec<&str> = second.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, ["p2", "p1"]);
    let window = env
        .cache
        .range(&format!("feed:{}", reader.user_id), 0, -1)
        .await
        .unwrap();
    assert_eq!(window, vec!["p4".to_string(), "p3".to_string()]);
}

#[tokio::test]
async fn pages_beyond_cache_window_always_hit_store() {
    let env = test_env();
    let reader = register_verified(&env, "reader").await;
    let writer = register_verified(&env, "writer").await;
    env.follows.follow(&reader.user_id, &writer.user_id).await.unwrap();

    env.posts
        .create(&writer.user_id, "t".into(), "b".into(), None)
        .await
        .unwrap();
    env.worker.drain().await.unwrap();

    // 窗口上限100：第6页(每页20)的区间 [100,119] 不可能由缓存服务
    let deep = env.feeds.get_feed(&reader.user_id, 6, 20).await.unwrap();
    assert_eq!(deep.source, FeedSource::Store);
    assert!(deep.posts.is_empty());
}

#[tokio::test]
async fn dangling_ids_are_dropped_during_resolution() {
    let env = test_env();
    let reader = register_verified(&env, "reader").await;
    let writer = register_verified(&env, "writer").await;
    env.follows.follow(&reader.user_id, &writer.user_id).await.unwrap();

    let keep = env
        .posts
        .create(&writer.user_id, "keep".into(), "b".into(), None)
        .await
        .unwrap();
    let doomed = env
        .posts
        .create(&writer.user_id, "doomed".into(), "b".into(), None)
        .await
        .unwrap();
    env.worker.drain().await.unwrap();

    // 绕过服务层直接删库，feed 缓存里留下悬挂ID
    assert!(env.store.delete_post(&doomed.post.post_id).await.unwrap());
    let cached = env
        .cache
        .range(&format!("feed:{}", reader.user_id), 0, -1)
        .await
        .unwrap();
    assert!(cached.contains(&doomed.post.post_id));

    // 解析阶段静默丢弃悬挂ID，绝不把已删除的帖子当实体返回
    let page = env.feeds.get_feed(&reader.user_id, 1, 20).await.unwrap();
    assert_eq!(page.source, FeedSource::Cache);
    let ids: Vec<&str> = page.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, [keep.post.post_id.as_str()]);
}

#[tokio::test]
async fn user_with_no_followees_gets_empty_feed() {
    let env = test_env();
    let loner = register_verified(&env, "loner").await;

    let page = env.feeds.get_feed(&loner.user_id, 1, 20).await.unwrap();
    assert_eq!(page.source, FeedSource::Store);
    assert!(page.posts.is_empty());
}

#[tokio::test]
async fn feed_merges_multiple_followees_newest_first() {
    let env = test_env();
    let reader = register_verified(&env, "reader").await;
    let w1 = register_verified(&env, "writer1").await;
    let w2 = register_verified(&env, "writer2").await;
    env.follows.follow(&reader.user_id, &w1.user_id).await.unwrap();
    env.follows.follow(&reader.user_id, &w2.user_id).await.unwrap();

    let a = env.posts.create(&w1.user_id, "a".into(), "b".into(), None).await.unwrap();
    let b = env.posts.create(&w2.user_id, "b".into(), "b".into(), None).await.unwrap();
    let c = env.posts.create(&w1.user_id, "c".into(), "b".into(), None).await.unwrap();
    env.worker.drain().await.unwrap();

    let page = env.feeds.get_feed(&reader.user_id, 1, 20).await.unwrap();
    let ids: Vec<&str> = page.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(
        ids,
        [
            c.post.post_id.as_str(),
            b.post.post_id.as_str(),
            a.post.post_id.as_str()
        ]
    );
}
