//! HTTP + WebSocket surface of the phonebook service.

mod http;
mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use tokio_util::sync::CancellationToken;

use phonebook_api::PhoneStore;
use phonebook_bulk::Generator;
use phonebook_hub::Hub;

pub use http::PhonePage;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PhoneStore>,
    pub hub: Arc<Hub>,
    pub generator: Arc<Generator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handle_welcome))
        .route("/phone", get(http::handle_list).post(http::handle_create))
        .route("/phone/{id}", put(http::handle_update).delete(http::handle_delete))
        .route("/generate", get(http::handle_generate))
        .route("/migrate", get(http::handle_migrate))
        .route("/ws", get(ws::handle_ws))
        .with_state(state)
}

/// Serve the API on `0.0.0.0:port` until `shutdown` fires.
pub async fn run(port: u16, state: AppState, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "http server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("http server stopped");
    Ok(())
}
