//! HTTP front end: accepts prompt lists and hands them to the job queue.

use axum::Router;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::jobs::JobQueue;

mod generate;

use generate::generate_images_handler;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    queue: JobQueue,
}

impl AppState {
    fn new(queue: JobQueue) -> Self {
        Self { queue }
    }
}

fn create_router(route: &str) -> Router<AppState> {
    Router::new().route(route, axum::routing::post(generate_images_handler))
}

/// Builds the application with the prompt endpoint mounted on `route`.
pub fn app(route: &str, queue: JobQueue) -> Router {
    create_router(route).with_state(AppState::new(queue))
}

/// Serves the application until Ctrl-C, then stops accepting requests.
///
/// `queue` is dropped on return, which lets the job worker drain and stop.
pub async fn setup_server(config: &AppConfig, queue: JobQueue) -> Result<(), anyhow::Error> {
    let app = app(&config.route, queue);

    let addr = format!("{}:{}", config.listen_address, config.port);
    info!("Starting server on http://{}{}", addr, config.route);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, no longer accepting prompts");
}
