//! Background image generation jobs.
//!
//! The web handler publishes one [`GenerateImageJob`] per prompt on a [`JobQueue`] and
//! never hears back. A [`JobWorker`] consumes the queue, running up to `workers` jobs at
//! once in no particular order. Outcomes only show up in the logs and on disk.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info};

use crate::config::{ApiConfig, AppConfig};
use crate::error::ImageGenError;
use crate::generator::ImageGenerator;
use crate::storage::save_image;

/// What a job does when the generation API call fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GenerationFailurePolicy {
    /// Log the failure and finish the job without an image
    Swallow,
    /// Fail the job and leave it to the worker's failure handling
    Propagate,
}

/// One queued unit of work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateImageJob {
    /// Text the image is generated from, also the basis of its filename
    pub prompt: String,
}

/// How a job that did not fail ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The image is on disk
    Saved,
    /// The image was generated but could not be downloaded
    DownloadFailed,
    /// Generation failed and the policy said to carry on
    GenerationSkipped,
}

/// Everything a job needs, built once at startup and shared by all jobs.
#[derive(Debug)]
pub struct JobContext {
    generator: ImageGenerator,
    http: reqwest::Client,
    output_dir: PathBuf,
    on_generation_failure: GenerationFailurePolicy,
}

impl JobContext {
    /// Builds a context from its parts.
    pub fn new(
        api: ApiConfig,
        output_dir: PathBuf,
        on_generation_failure: GenerationFailurePolicy,
    ) -> Result<Self, ImageGenError> {
        let http = reqwest::Client::builder().build().map_err(|err| {
            ImageGenError::ExternalService(format!("Failed to build download client: {err}"))
        })?;
        Ok(Self {
            generator: ImageGenerator::new(api)?,
            http,
            output_dir,
            on_generation_failure,
        })
    }

    /// Builds a context from the process configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ImageGenError> {
        Self::new(
            config.api.clone(),
            config.output_dir.clone(),
            config.on_generation_failure,
        )
    }
}

/// Generates the image for `prompt` and stores it in the context's output directory.
///
/// Filesystem errors are always returned. Generation errors are returned or logged
/// depending on the context's [`GenerationFailurePolicy`].
pub async fn run_job(context: &JobContext, prompt: &str) -> Result<JobOutcome, ImageGenError> {
    debug!("Starting image generation for prompt '{prompt}'");
    let image_url = match context.generator.generate(prompt).await {
        Ok(url) => url,
        Err(err) => match context.on_generation_failure {
            GenerationFailurePolicy::Swallow => {
                error!("Image generation failed for prompt '{prompt}': {err}");
                return Ok(JobOutcome::GenerationSkipped);
            }
            GenerationFailurePolicy::Propagate => return Err(err),
        },
    };
    info!("Generated image for prompt '{prompt}': {image_url}");

    let saved = save_image(&context.http, prompt, &image_url, &context.output_dir).await?;
    Ok(if saved {
        JobOutcome::Saved
    } else {
        JobOutcome::DownloadFailed
    })
}

/// Sending half of the job queue. Cheap to clone; the queue closes once every clone is gone.
#[derive(Clone, Debug)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<GenerateImageJob>,
}

/// Receiving half of the job queue, normally handed to [`JobWorker::spawn`].
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<GenerateImageJob>,
}

impl JobQueue {
    /// Creates a connected queue and receiver.
    pub fn channel() -> (JobQueue, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (JobQueue { tx }, JobReceiver { rx })
    }

    /// Submits a job for `prompt` without waiting for it to run.
    pub fn enqueue(&self, prompt: String) -> Result<(), ImageGenError> {
        self.tx
            .send(GenerateImageJob { prompt })
            .map_err(|_| ImageGenError::QueueClosed)
    }
}

impl JobReceiver {
    /// Waits for the next job, `None` once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<GenerateImageJob> {
        self.rx.recv().await
    }

    /// Takes the next job if one is already waiting.
    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<GenerateImageJob> {
        self.rx.try_recv().ok()
    }
}

type FinishedJob = (GenerateImageJob, Result<JobOutcome, ImageGenError>);

/// Tally of finished jobs, reported when a worker shuts down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Jobs that stored an image
    pub saved: usize,
    /// Jobs that completed without storing an image
    pub not_saved: usize,
    /// Jobs that returned an error or panicked
    pub failed: usize,
}

impl JobSummary {
    fn record(&mut self, finished: Result<FinishedJob, JoinError>) {
        match finished {
            Ok((_, Ok(JobOutcome::Saved))) => self.saved += 1,
            Ok((_, Ok(_))) => self.not_saved += 1,
            Ok((job, Err(err))) => {
                error!("Image generation job for prompt '{}' failed: {err}", job.prompt);
                self.failed += 1;
            }
            Err(err) => {
                error!("Image generation job panicked: {err}");
                self.failed += 1;
            }
        }
    }
}

/// Pool consuming a [`JobReceiver`].
#[derive(Debug)]
pub struct JobWorker {
    handle: JoinHandle<JobSummary>,
}

impl JobWorker {
    /// Starts consuming `receiver`, running at most `concurrency` jobs at a time.
    pub fn spawn(
        receiver: JobReceiver,
        context: Arc<JobContext>,
        concurrency: NonZeroUsize,
    ) -> Self {
        let handle = tokio::spawn(run_worker(receiver, context, concurrency));
        Self { handle }
    }

    /// Waits for the queue to close and every queued job to finish.
    pub async fn finish(self) -> Result<JobSummary, JoinError> {
        self.handle.await
    }
}

async fn run_worker(
    mut receiver: JobReceiver,
    context: Arc<JobContext>,
    concurrency: NonZeroUsize,
) -> JobSummary {
    let limit = Arc::new(Semaphore::new(concurrency.get()));
    let mut running = JoinSet::new();
    let mut summary = JobSummary::default();

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = limit.clone().acquire_owned().await else {
            break;
        };
        let context = context.clone();
        running.spawn(async move {
            let _permit = permit;
            let result = run_job(&context, &job.prompt).await;
            (job, result)
        });
        while let Some(finished) = running.try_join_next() {
            summary.record(finished);
        }
    }

    while let Some(finished) = running.join_next().await {
        summary.record(finished);
    }
    info!(
        "Job worker stopped: {} saved, {} not saved, {} failed",
        summary.saved, summary.not_saved, summary.failed
    );
    summary
}
