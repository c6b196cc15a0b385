use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ai::OpenAiClient;
use api::reminders::{LogNotifier, ReminderSweeper};
use api::settings::Settings;
use api::{AppState, create_router};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting API service");

    let settings = Settings::new()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    if settings.ai.api_key.is_empty() {
        tracing::warn!("No model API key configured, parsing endpoints will return low-confidence results");
    }
    let language_model = Arc::new(OpenAiClient::new(&settings.ai)?);

    let app_state = AppState::new(pool, language_model, &settings);

    // Kept alive for the lifetime of the server
    let _scheduler = if settings.reminders.enabled {
        let sweeper = ReminderSweeper::new(
            app_state.reminder_repository.clone(),
            Arc::new(LogNotifier),
            settings.reminders.clone(),
        );
        Some(sweeper.start().await?)
    } else {
        info!("Payment reminders disabled");
        None
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = create_router(app_state);

    let address = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
