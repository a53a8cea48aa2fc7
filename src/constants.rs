//! Shared constants for the generation pipeline
//!

use std::time::Duration;

/// The default place we put images, relative to the working directory
pub const DEFAULT_IMAGE_DIR: &str = "generated_images";

/// Path the prompt endpoint is served on unless configured otherwise
pub const DEFAULT_ROUTE: &str = "/generate-image/";

/// Where the image generation API lives
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Model requested from the generation API
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Every image is requested at this resolution
pub const IMAGE_SIZE: &str = "1024x1024";

/// Every image is requested at this quality tier
pub const IMAGE_QUALITY: &str = "standard";

/// Images requested per generation call
pub const IMAGES_PER_PROMPT: u8 = 1;

/// Extension appended to every stored image
pub const IMAGE_EXTENSION: &str = "png";

/// Longest filename stem derived from a prompt, in characters
pub const MAX_FILENAME_LEN: usize = 100;

/// Bound on fetching a generated image
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on a single generation API call, matching the upstream client library default
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Header carrying the organization the API call is billed to
pub const OPENAI_ORGANIZATION_HEADER: &str = "OpenAI-Organization";

/// Status value returned once prompts are queued
pub const STATUS_ACCEPTED: &str = "Accepted";

/// Message returned when the `prompts` field has the wrong shape
pub const INVALID_PROMPTS_MESSAGE: &str = "Invalid input. Prompts should be a list of strings.";
