use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retouch_auth::JwtService;
use retouch_chat::{build_router, config::AppConfig, AppState};
use retouch_database::{create_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retouch_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    if config.payments.allow_client_confirmation {
        tracing::warn!("Client payment confirmation is enabled; set PAYMENT_ALLOW_CLIENT_CONFIRMATION=false once the webhook is live");
    }
    if config.payments.webhook_secret.is_none() {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET is not set; /webhooks/payment is disabled");
    }

    // Create database connection pool
    let db_pool = create_pool(&config.database).await?;

    // Run migrations
    run_migrations(&db_pool).await?;

    let app_state = AppState {
        db_pool,
        jwt_service: JwtService::new(&config.jwt),
        config: config.clone(),
    };

    let app = build_router(app_state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port)).await?;

    tracing::info!("Chat Service listening on {}:{}", config.server.host, config.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
