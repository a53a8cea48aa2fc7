use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use super::AppState;
use crate::constants::{INVALID_PROMPTS_MESSAGE, STATUS_ACCEPTED};
use crate::error::ImageGenError;

#[derive(Serialize, Debug)]
pub(crate) struct AcceptedResponse {
    status: &'static str,
}

fn invalid_prompts() -> ImageGenError {
    ImageGenError::Validation(INVALID_PROMPTS_MESSAGE.to_string())
}

/// Pulls the prompt list out of a request body.
///
/// A missing `prompts` key is an empty list. Anything other than an array of strings,
/// including `null`, is rejected as a whole.
pub(crate) fn parse_prompts(body: &Value) -> Result<Vec<String>, ImageGenError> {
    let Value::Object(fields) = body else {
        return Err(invalid_prompts());
    };
    match fields.get("prompts") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned).ok_or_else(invalid_prompts))
            .collect(),
        Some(_) => Err(invalid_prompts()),
    }
}

/// Queues one generation job per prompt and answers 202 without waiting for any of them.
pub(crate) async fn generate_images_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AcceptedResponse>), ImageGenError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            warn!("Request body is not valid JSON: {err}");
            invalid_prompts()
        })?
    };

    let prompts = parse_prompts(&body).inspect_err(|_| {
        error!("Invalid input: Prompts should be a list of strings.");
    })?;

    for prompt in prompts {
        if let Err(err) = state.queue.enqueue(prompt.clone()) {
            error!("Error enqueuing image generation task for prompt '{prompt}': {err}");
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: STATUS_ACCEPTED,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompts_must_be_a_list_of_strings() {
        assert_eq!(
            parse_prompts(&json!({ "prompts": ["cat", "dog"] })).expect("valid"),
            vec!["cat".to_string(), "dog".to_string()]
        );
        assert!(parse_prompts(&json!({ "prompts": [] })).expect("valid").is_empty());
        assert!(parse_prompts(&json!({ "other": 1 })).expect("valid").is_empty());

        for invalid in [
            json!({ "prompts": "not-a-list" }),
            json!({ "prompts": [1, 2] }),
            json!({ "prompts": ["cat", 2] }),
            json!({ "prompts": null }),
            json!({ "prompts": { "a": "b" } }),
            json!(["cat"]),
        ] {
            assert!(
                matches!(parse_prompts(&invalid), Err(ImageGenError::Validation(_))),
                "{invalid} should be rejected"
            );
        }
    }

    #[test]
    fn empty_prompt_strings_are_accepted() {
        assert_eq!(
            parse_prompts(&json!({ "prompts": [""] })).expect("valid"),
            vec![String::new()]
        );
    }
}
