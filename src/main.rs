use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workforce::{
    AppState,
    config::Config,
    database::{self, Repositories},
    middleware::{RateLimiter, log_errors, rate_limit},
    routes,
    services::{document::PdfSlipGenerator, mailer},
};

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
    let config = Arc::new(Config::from_env().expect("Failed to load configuration"));

    // 连接数据库并执行迁移
    let pool = database::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    let state = AppState {
        config: config.clone(),
        repos: Repositories::postgres(pool),
        mailer: mailer::from_config(&config),
        documents: Arc::new(PdfSlipGenerator::new(&config.upload_dir)),
    };

    // 添加日志中间件和限流中间件
    let router = routes::create_router(state)
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit))
        .layer(TraceLayer::new_for_http());

    // 开发环境允许所有来源，生产环境只允许前端域名
    #[cfg(debug_assertions)]
    let cors = {
        tracing::info!("Running in debug mode with permissive CORS");
        CorsLayer::permissive()
    };

    #[cfg(not(debug_assertions))]
    let cors = match config.frontend_url.parse::<axum::http::HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        Err(_) => {
            tracing::warn!("Invalid FRONTEND_URL, CORS disabled");
            CorsLayer::new()
        }
    };

    let app = router.layer(cors);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid SERVER_HOST, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
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
