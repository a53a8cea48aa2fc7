//! CLI parser
use clap::Parser;
use std::num::{NonZeroU16, NonZeroUsize};
use std::path::PathBuf;
use url::Url;

use crate::constants::{DEFAULT_API_BASE, DEFAULT_IMAGE_DIR, DEFAULT_IMAGE_MODEL, DEFAULT_ROUTE};
use crate::jobs::GenerationFailurePolicy;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "IMAGEGEN_DEBUG")]
    /// Enable debug logging. Env: IMAGEGEN_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "IMAGEGEN_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: IMAGEGEN_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "IMAGEGEN_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: IMAGEGEN_LISTEN_ADDRESS
    pub listen_address: String,
    #[clap(long, default_value = DEFAULT_ROUTE, env = "IMAGEGEN_ROUTE")]
    /// Path the prompt endpoint is mounted on.
    /// Env: IMAGEGEN_ROUTE
    pub route: String,

    #[clap(long, short, default_value = DEFAULT_IMAGE_DIR, env = "IMAGEGEN_OUTPUT_DIR")]
    /// Where generated images are written, relative to the working directory.
    /// Env: IMAGEGEN_OUTPUT_DIR
    pub output_dir: PathBuf,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// API key for the image generation API.
    /// Env: OPENAI_API_KEY
    pub openai_api_key: String,
    #[clap(long, env = "OPENAI_ORG_ID", hide_env_values = true)]
    /// Organization the API calls are billed to.
    /// Env: OPENAI_ORG_ID
    pub openai_org_id: Option<String>,
    #[clap(long, default_value = DEFAULT_API_BASE, env = "IMAGEGEN_API_BASE")]
    /// Base URL of the image generation API.
    /// Env: IMAGEGEN_API_BASE
    pub api_base: Url,
    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "IMAGEGEN_IMAGE_MODEL")]
    /// Image model, eg `dall-e-3`.
    /// Env: IMAGEGEN_IMAGE_MODEL
    pub image_model: String,

    #[clap(
        long,
        value_enum,
        default_value_t = GenerationFailurePolicy::Propagate,
        env = "IMAGEGEN_ON_GENERATION_FAILURE"
    )]
    /// What a job does when the generation API call fails.
    /// Env: IMAGEGEN_ON_GENERATION_FAILURE
    pub on_generation_failure: GenerationFailurePolicy,
    #[clap(long, short, default_value = "4", env = "IMAGEGEN_WORKERS")]
    /// How many jobs may run at once.
    /// Env: IMAGEGEN_WORKERS
    pub workers: NonZeroUsize,
}
