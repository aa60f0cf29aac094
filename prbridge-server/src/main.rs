use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prbridge_server::config::Config;
use prbridge_server::notify::{LogNotifier, Notifier, WebhookNotifier};
use prbridge_server::payments::StripeClient;
use prbridge_server::repository::SqliteRepository;
use prbridge_server::session::SessionStore;
use prbridge_server::store::OfferStore;
use prbridge_server::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting PR-offer lifecycle service");

    let config = Config::from_env()?;

    let db_path = config.state_dir.join("prbridge-state.db");
    info!("Using state database: {}", db_path.display());
    let repository = SqliteRepository::new(&db_path)?;

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!("Notifications will be POSTed to {}", url);
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    let stripe = config.stripe_secret_key.clone().map(StripeClient::new);
    if stripe.is_none() {
        info!("STRIPE_SECRET_KEY not set; payment endpoints disabled");
    }

    let state = Arc::new(AppState {
        store: OfferStore::new(Arc::new(repository), notifier),
        sessions: SessionStore::new(config.session_secret.clone(), config.session_ttl_minutes),
        stripe,
    });

    let app = app_router(state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
