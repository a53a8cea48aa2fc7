use std::sync::Arc;

use clap::Parser;
use imagegen::config::{AppConfig, setup_logging};
use imagegen::jobs::{JobContext, JobQueue, JobWorker};
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let dotenv = dotenvy::dotenv();
    let cli = imagegen::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = AppConfig::from(cli);
    let context = match JobContext::from_config(&config) {
        Ok(context) => Arc::new(context),
        Err(err) => {
            error!("Failed to set up image generation: {}", err);
            return;
        }
    };

    let (queue, receiver) = JobQueue::channel();
    let worker = JobWorker::spawn(receiver, context, config.workers);
    info!(
        "Writing images to {} with {} workers",
        config.output_dir.display(),
        config.workers
    );

    if let Err(err) = imagegen::web::setup_server(&config, queue).await {
        error!("Application error: {}", err);
    }

    info!("Waiting for queued jobs to finish");
    match worker.finish().await {
        Ok(summary) => info!(
            "All jobs finished: {} saved, {} not saved, {} failed",
            summary.saved, summary.not_saved, summary.failed
        ),
        Err(err) => error!("Job worker crashed: {}", err),
    }
}
