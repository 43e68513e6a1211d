use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use phonebook_bulk::Generator;
use phonebook_http::AppState;
use phonebook_hub::Hub;

use crate::config::{ConfigArgs, ServerConfig};
use crate::error::ServerError;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(args: ConfigArgs) -> Result<(), ServerError> {
    tracing::info!("phonebook-server starting");

    // --- Load config ---
    let config = ServerConfig::load(&args.config)?;
    tracing::info!(config = %args.config, "loaded config");

    let store = super::open_store(&config).await?;
    let generator = Arc::new(Generator::new(store.clone(), config.generator.clone())?);
    let hub = Hub::new(config.hub.clone())?;
    tracing::info!(
        overflow = %config.hub.overflow,
        exclude_sender = config.hub.exclude_sender,
        listener_buffer = config.hub.listener_buffer,
        "hub configured"
    );

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();
    let fan_out = hub.spawn_fan_out(token.clone());

    // --- API server (HTTP + WS) ---
    let state = AppState {
        store,
        hub: hub.clone(),
        generator,
    };
    let port = config.port;
    let mut api_handle = tokio::spawn(phonebook_http::run(port, state, token.clone()));
    tracing::info!(port, "server ready");

    tokio::select! {
        r = tokio::signal::ctrl_c() => {
            r?;
            tracing::info!("shutting down...");
        }
        r = &mut api_handle => {
            token.cancel();
            hub.close_all().await;
            return match r {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ServerError::Io(e)),
                Err(e) => Err(ServerError::Io(std::io::Error::other(e))),
            };
        }
    }

    // Stop accepting, then drop every listener so upgraded sockets end too.
    token.cancel();
    hub.close_all().await;

    match tokio::time::timeout(DRAIN_TIMEOUT, &mut api_handle).await {
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "api server error"),
        Ok(_) => {}
        Err(_) => {
            tracing::warn!("api server did not drain in time, aborting");
            api_handle.abort();
        }
    }
    let _ = fan_out.await;

    tracing::info!("shutdown complete");
    Ok(())
}
