use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use backend::{
    AppState,
    cache::RedisCacheStore,
    config::Config,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    queue::RedisJobQueue,
    routes,
    services::feed::FanoutWorker,
    store::PgStore,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'social_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client.clone());

    // 组装存储、缓存、队列句柄
    let store = Arc::new(PgStore::new(pool));
    let cache = Arc::new(RedisCacheStore::new(
        redis_arc.clone(),
        config.cache_timeout(),
    ));
    let queue = Arc::new(RedisJobQueue::new(redis_arc));

    // 设置应用状态
    let state = AppState::new(config.clone(), store.clone(), cache.clone(), queue.clone());

    // 启动 feed 扇出 worker 池，与请求处理解耦
    for i in 0..config.fanout_workers {
        let worker = FanoutWorker::new(
            store.clone(),
            cache.clone(),
            queue.clone(),
            config.feed_capacity,
            config.feed_expire_secs,
            config.job_poll_timeout(),
        );
        tracing::info!("Starting feed fanout worker #{}", i);
        tokio::spawn(worker.run());
    }

    // 设置限流器
    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    // 将路由分为公开路由和受保护路由
    let public_routes = Router::new()
        // 健康检查
        .route("/health", get(routes::health::ping))
        // 注册登录和邮箱验证
        .route("/users/register", post(routes::user::handler::register))
        .route("/users/login", post(routes::user::handler::login))
        .route(
            "/users/verify-email/{code}",
            get(routes::user::handler::verify_email),
        )
        // 公开帖子读取
        .route("/posts", get(routes::post::handler::list_posts))
        .route("/posts/{post_id}", get(routes::post::handler::get_post))
        // 关注关系的公开查询
        .route(
            "/follow/{user_id}/followers",
            get(routes::follow::handler::get_followers),
        )
        .route(
            "/follow/{user_id}/following",
            get(routes::follow::handler::get_following),
        );

    let protected_routes = Router::new()
        // 当前用户
        .route("/users/me", get(routes::user::handler::me))
        // feed 与发帖
        .route("/posts/feed", get(routes::post::handler::feed))
        .route("/posts/me", get(routes::post::handler::my_posts))
        .route("/posts", post(routes::post::handler::create_post))
        .route(
            "/posts/{post_id}",
            patch(routes::post::handler::update_post),
        )
        .route(
            "/posts/{post_id}",
            delete(routes::post::handler::delete_post),
        )
        // 评论
        .route("/comments", post(routes::comment::handler::create_comment))
        .route(
            "/comments/{comment_id}",
            delete(routes::comment::handler::delete_comment),
        )
        // 点赞开关
        .route("/likes/{post_id}", post(routes::like::handler::toggle_like))
        // 关注
        .route("/follow/{user_id}", post(routes::follow::handler::follow_user))
        .route(
            "/follow/{user_id}",
            delete(routes::follow::handler::unfollow_user),
        )
        .route(
            "/follow/{user_id}/status",
            get(routes::follow::handler::follow_status),
        )
        // 应用认证中间件
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    // 添加日志中间件和限流中间件
    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = CorsLayer::permissive();
        router.layer(cors)
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
