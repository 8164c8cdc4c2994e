use std::net::SocketAddr;

use sync_server::{config, db, routes, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings
    let settings = config::Settings::new().expect("Failed to load settings");

    // Initialize database
    let db = db::Database::new(&settings.database.path).expect("Failed to create database");

    db.initialize()
        .expect("Failed to initialize database schema");

    if settings.database.seed {
        db.seed_test_data().expect("Failed to seed test data");
        tracing::info!("Test data seeded successfully");
    }

    tracing::info!("Database initialized at {}", settings.database.path);

    // Create application state
    let state = AppState::new(db, settings.pagination, settings.session.ttl_days);

    // Expired sessions are also dropped lazily when presented
    match state.session_manager.cleanup_expired_sessions() {
        Ok(count) => {
            if count > 0 {
                tracing::info!("Cleaned up {} expired sessions on startup", count);
            } else {
                tracing::info!("No expired sessions to clean up");
            }
        }
        Err(e) => {
            tracing::error!("Failed to cleanup expired sessions on startup: {}", e);
        }
    }

    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .expect("Failed to parse server address");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}
