use lumdash_api::{build_router, state::AppState};
use lumdash_config::Settings;
use lumdash_db::{connect, indexes::ensure_indexes};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "lumdash_api=debug,lumdash_services=debug,lumdash_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting LumDash API on {}:{}", settings.app.host, settings.app.port);
    info!(
        database = %settings.database.name,
        admins = settings.auth.admin_emails.len(),
        chat_enabled = settings.claude.api_key.is_some(),
        max_update_retries = settings.reservation.max_update_retries,
        "Configuration loaded"
    );

    let db = connect(&settings).await?;

    // Also drops the legacy unique serial index
    ensure_indexes(&db).await?;

    let app_state = AppState::new(db, settings.clone());
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
