use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cv_editor::auth::{AuthService, FileCredentialStore};
use cv_editor::config::Config;
use cv_editor::routes;
use cv_editor::{Dashboard, HttpApiClient, StoreHandle};

/// Restores the stored session and syncs the user's saved CVs.
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV editor v{}", env!("CARGO_PKG_VERSION"));

    let client = Arc::new(
        HttpApiClient::new(config.api_base_url.clone(), config.http_timeout)
            .context("Failed to build HTTP client")?,
    );
    info!("API client targeting {}", client.base_url());

    let credentials = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
    let auth = AuthService::restore(client.clone(), credentials);

    if let Some(redirect) = routes::guard(routes::DASHBOARD, auth.session()) {
        info!(
            "No stored session in {}; log in to sync CVs (redirecting to {redirect})",
            config.credentials_path.display()
        );
        return Ok(());
    }
    let Some(user) = auth.session().user.as_ref() else {
        return Ok(());
    };
    info!("Syncing CVs for {}", user.username);

    let store = StoreHandle::new();
    let mut dashboard = Dashboard::new(client, store.clone());
    if let Err(e) = dashboard.load_all().await {
        warn!("CV sync stopped early: {}", e.user_message());
    }

    for cv in store.saved() {
        let id = cv.id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        match cv.updated_at {
            Some(updated) => info!(
                "{id}  {}  (updated {})",
                cv.display_name(),
                updated.to_rfc3339()
            ),
            None => info!("{id}  {}", cv.display_name()),
        }
    }
    info!("{} saved CVs", store.saved_len());

    Ok(())
}
