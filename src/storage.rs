//! Turning a generated image URL into a file on disk.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use axum::body::Bytes;
use regex::Regex;
use tracing::{debug, error, info};

use crate::constants::{DOWNLOAD_TIMEOUT, IMAGE_EXTENSION, MAX_FILENAME_LEN};
use crate::error::ImageGenError;

#[allow(clippy::expect_used)]
static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_]").expect("filename regex is valid"));

/// Replaces every character outside `[A-Za-z0-9_]` with `_` and keeps the first 100.
///
/// Total and pure: `"a red fox!"` always becomes `"a_red_fox_"`.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS
        .replace_all(name, "_")
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect()
}

/// Where the image for `prompt` lands inside `directory`.
pub fn image_path(directory: &Path, prompt: &str) -> PathBuf {
    directory.join(format!("{}.{}", sanitize_filename(prompt), IMAGE_EXTENSION))
}

/// Creates `directory` and its parents when missing.
///
/// An existing directory, including one another job just created, is success.
pub async fn ensure_directory(directory: &Path) -> Result<(), ImageGenError> {
    tokio::fs::create_dir_all(directory).await?;
    Ok(())
}

/// One bounded GET; anything but a complete success body is a [`ImageGenError::Download`].
async fn fetch_image(client: &reqwest::Client, image_url: &str) -> Result<Bytes, ImageGenError> {
    debug!("Downloading image from {image_url}");
    let response = client
        .get(image_url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .map_err(|err| {
            ImageGenError::Download(format!("Error occurred while downloading the image: {err}"))
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ImageGenError::Download(format!(
            "Failed to download the image. HTTP status code: {}",
            status.as_u16()
        )));
    }

    response.bytes().await.map_err(|err| {
        ImageGenError::Download(format!("Error occurred while downloading the image: {err}"))
    })
}

/// Downloads `image_url` and writes it to `<directory>/<sanitized prompt>.png`.
///
/// Returns `Ok(false)` when the download fails, either on a non-success status or a
/// transport error; both are logged. A single attempt is made. Filesystem errors are
/// returned. An existing file with the same name is overwritten.
pub async fn save_image(
    client: &reqwest::Client,
    prompt: &str,
    image_url: &str,
    directory: &Path,
) -> Result<bool, ImageGenError> {
    ensure_directory(directory).await?;

    let bytes = match fetch_image(client, image_url).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("{err}");
            return Ok(false);
        }
    };

    let filename = image_path(directory, prompt);
    tokio::fs::write(&filename, &bytes).await?;
    info!("Image downloaded and saved as {}", filename.display());
    Ok(true)
}
