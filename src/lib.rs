use std::sync::Arc;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod queue;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use cache::CacheStore;
use config::Config;
use queue::JobQueue;
use services::engagement::Engagement;
use services::feed::FeedService;
use services::follow::FollowGraph;
use services::post::PostService;
use services::user::UserService;
use store::SocialStore;

/// 应用状态
///
/// 所有服务通过构造函数持有存储、缓存和队列句柄，不依赖全局单例，
/// 测试时可以注入内存实现并行执行。
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: UserService,
    pub posts: PostService,
    pub follows: FollowGraph,
    pub engagement: Engagement,
    pub feeds: FeedService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SocialStore>,
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let follows = FollowGraph::new(store.clone(), cache.clone(), config.cache_expire_secs);
        let engagement = Engagement::new(store.clone(), cache.clone(), config.cache_expire_secs);
        let posts = PostService::new(
            store.clone(),
            cache.clone(),
            queue.clone(),
            follows.clone(),
            config.cache_expire_secs,
        );
        let feeds = FeedService::new(
            store.clone(),
            cache.clone(),
            follows.clone(),
            config.feed_capacity,
            config.feed_expire_secs,
        );
        let users = UserService::new(store, cache, config.cache_expire_secs);

        Self {
            config,
            users,
            posts,
            follows,
            engagement,
            feeds,
        }
    }
}
