use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spots_backend::{
    config::Config,
    db,
    middleware::rate_limit::create_global_governor,
    routes, AppError, AppState,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spots_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config).await?;
    tracing::info!("Connected to database");

    db::migrate(&db).await?;
    tracing::info!("Migrations complete");

    if config.seed_demo_user {
        db::seed_demo_user(&db).await?;
    }

    let state = AppState {
        db,
        config: config.clone(),
    };

    // 1000 requests per minute per IP: one token every 60ms
    let governor = create_global_governor(60, 1000)
        .ok_or_else(|| AppError::Internal("Invalid rate limit configuration".to_string()))?;

    let app = routes::with_middleware(routes::create_router(state), governor);

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| AppError::Internal(format!("Invalid address: {}", e)))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::Internal(format!("Server error: {}", e)))
}
