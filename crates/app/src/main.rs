//! Tokenguard session check.
//!
//! Loads configuration, restores the persisted session (or signs in with
//! `TOKENGUARD_IDENTIFIER`/`TOKENGUARD_PASSWORD`), and reports the session
//! state. `TOKENGUARD_REFRESH_PROFILE=1` merges the profile into the stored
//! identity, `TOKENGUARD_CALL_PATH` issues one authorized GET, and
//! `TOKENGUARD_LOGOUT=1` signs out before exiting.

use std::sync::Arc;

use tokenguard_application::{AuthSession, AuthorizedClient, SessionOptions, TokenStore};
use tokenguard_domain::{ApiRequest, Credentials, Identity};
use tokenguard_infrastructure::{
    ConfigLoader, FileKeyValueStore, HttpAuthRemote, ReqwestApiTransport, SystemClock,
    init_tracing,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::new().load().await?;
    init_tracing(&config.log_filter);

    info!(
        "Starting Tokenguard session check v{}",
        env!("CARGO_PKG_VERSION")
    );

    let storage_dir = config
        .storage_dir
        .clone()
        .or_else(FileKeyValueStore::default_dir)
        .ok_or("could not determine a storage directory")?;
    let store = TokenStore::new(
        Arc::new(FileKeyValueStore::new(&storage_dir)),
        config.storage_keys(),
        config.snapshot_layout,
    );
    let session = AuthSession::new(
        Arc::new(HttpAuthRemote::new(config.clone())?),
        store,
        Arc::new(SystemClock::new()),
        SessionOptions::from_config(&config),
    );

    if !session.ensure_restored().await {
        if let (Ok(identifier), Ok(password)) = (
            std::env::var("TOKENGUARD_IDENTIFIER"),
            std::env::var("TOKENGUARD_PASSWORD"),
        ) {
            session
                .login(Credentials::password(identifier, password))
                .await?;
        }
    }

    let client = AuthorizedClient::new(
        session.clone(),
        Arc::new(ReqwestApiTransport::new(&config)?),
    );

    if std::env::var("TOKENGUARD_REFRESH_PROFILE").is_ok_and(|v| v == "1") {
        if let Err(error) = client.refresh_identity(&config.profile_path()).await {
            warn!(%error, "profile refresh failed");
        }
    }

    let identity = session.identity().await;
    info!(
        authenticated = session.is_authenticated().await,
        user = identity.as_ref().map_or("-", Identity::display_name),
        token = %session.token_status().await.display_message(),
        refresh_expiring_soon = session.is_refresh_expiring_soon().await,
        "session state"
    );

    if let Ok(path) = std::env::var("TOKENGUARD_CALL_PATH") {
        match client.execute(&ApiRequest::get(path)).await {
            Ok(response) => info!(status = %response.status, "call succeeded"),
            Err(error) => warn!(%error, "call failed"),
        }
    }

    if std::env::var("TOKENGUARD_LOGOUT").is_ok_and(|v| v == "1") {
        session.logout().await;
        info!("signed out");
    }

    Ok(())
}
