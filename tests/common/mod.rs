// 集成测试公共脚手架
// 用内存实现组装整套服务，测试之间互不共享状态，可以并行跑
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use backend::cache::{CacheStore, MemoryCacheStore};
use backend::queue::{JobQueue, MemoryJobQueue};
use backend::services::engagement::Engagement;
use backend::services::feed::{FanoutWorker, FeedService};
use backend::services::follow::FollowGraph;
use backend::services::post::PostService;
use backend::services::user::UserService;
use backend::store::{MemoryStore, SocialStore, UserEntity};

const CACHE_TTL_SECS: u64 = 300;
const FEED_TTL_SECS: u64 = 3600;

pub struct TestEnv {
    pub store: Arc<dyn SocialStore>,
    pub cache: Arc<dyn CacheStore>,
    pub queue: Arc<dyn JobQueue>,
    pub users: UserService,
    pub posts: PostService,
    pub follows: FollowGraph,
    pub engagement: Engagement,
    pub feeds: FeedService,
    pub worker: FanoutWorker,
}

pub fn test_env() -> TestEnv {
    test_env_with_feed_capacity(100)
}

pub fn test_env_with_feed_capacity(feed_capacity: usize) -> TestEnv {
    let store: Arc<dyn SocialStore> = Arc::new(MemoryStore::new());
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let queue: Arc<dyn JobQueue> = Arc::new(MemoryJobQueue::new());
    build_env(store, cache, queue, feed_capacity)
}

pub fn build_env(
    store: Arc<dyn SocialStore>,
    cache: Arc<dyn CacheStore>,
    queue: Arc<dyn JobQueue>,
    feed_capacity: usize,
) -> TestEnv {
    let follows = FollowGraph::new(store.clone(), cache.clone(), CACHE_TTL_SECS);
    let engagement = Engagement::new(store.clone(), cache.clone(), CACHE_TTL_SECS);
    let posts = PostService::new(
        store.clone(),
        cache.clone(),
        queue.clone(),
        follows.clone(),
        CACHE_TTL_SECS,
    );
    let feeds = FeedService::new(
        store.clone(),
        cache.clone(),
        follows.clone(),
        feed_capacity,
        FEED_TTL_SECS,
    );
    let users = UserService::new(store.clone(), cache.clone(), CACHE_TTL_SECS);
    let worker = FanoutWorker::new(
        store.clone(),
        cache.clone(),
        queue.clone(),
        feed_capacity,
        FEED_TTL_SECS,
        Duration::ZERO,
    );

    TestEnv {
        store,
        cache,
        queue,
        users,
        posts,
        follows,
        engagement,
        feeds,
        worker,
    }
}

/// 注册并完成邮箱验证的用户
pub async fn register_verified(env: &TestEnv, name: &str) -> UserEntity {
    let registration = env
        .users
        .register(name, &format!("{name}@example.com"), "password1")
        .await
        .expect("registration failed");
    env.users
        .verify_email(&registration.verification_code)
        .await
        .expect("verification failed")
}
