//! Config handling

use std::num::{NonZeroU16, NonZeroUsize};
use std::path::PathBuf;

use tracing::log::LevelFilter;
use url::Url;

use crate::cli::CliOptions;
use crate::jobs::GenerationFailurePolicy;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Credentials and endpoint for the image generation API.
#[derive(Clone)]
pub struct ApiConfig {
    /// Bearer token sent with every generation call
    pub api_key: String,
    /// Organization header, omitted when unset
    pub organization: Option<String>,
    /// API root, eg `https://api.openai.com/v1`
    pub base_url: Url,
    /// Model name sent with every generation call
    pub model: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("organization", &self.organization)
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .finish()
    }
}

/// Process configuration, read once at startup and handed to whatever needs it.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Listen address for the HTTP server
    pub listen_address: String,
    /// Listen port for the HTTP server
    pub port: NonZeroU16,
    /// Path the prompt endpoint is mounted on
    pub route: String,
    /// Directory generated images are written to
    pub output_dir: PathBuf,
    /// Generation API settings
    pub api: ApiConfig,
    /// What jobs do when generation fails
    pub on_generation_failure: GenerationFailurePolicy,
    /// Concurrent job limit
    pub workers: NonZeroUsize,
}

impl From<CliOptions> for AppConfig {
    fn from(cli: CliOptions) -> Self {
        let organization = cli.openai_org_id.filter(|org| !org.trim().is_empty());
        Self {
            listen_address: cli.listen_address,
            port: cli.port,
            route: normalize_route(&cli.route),
            output_dir: cli.output_dir,
            api: ApiConfig {
                api_key: cli.openai_api_key,
                organization,
                base_url: cli.api_base,
                model: cli.image_model,
            },
            on_generation_failure: cli.on_generation_failure,
            workers: cli.workers,
        }
    }
}

/// Routes must start with a slash for the router to accept them.
fn normalize_route(route: &str) -> String {
    let route = route.trim();
    if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{route}")
    }
}
