//! Completions proxy endpoint

use crate::api::JsonBody;
use crate::api::error::ApiError;
use crate::core::completion::{ChatMessage, CompletionOptions};
use crate::core::errors::ServiceError;
use crate::core::traits::CompletionClient;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use schemas::{CompletionRequest, CompletionResponse};

pub fn router() -> Router {
    Router::new().route("/completions", post(complete))
}

async fn complete(
    Inject(completions): Inject<dyn CompletionClient>,
    JsonBody(request): JsonBody<CompletionRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let messages = request
        .messages
        .and_then(|messages| serde_json::from_value::<Vec<ChatMessage>>(messages).ok())
        .filter(|messages| !messages.is_empty())
        .ok_or_else(|| ServiceError::validation("messages array is required"))?;

    let defaults = CompletionOptions::default();
    let options = CompletionOptions {
        model: request.model,
        temperature: request.temperature.unwrap_or(defaults.temperature),
        max_tokens: request.max_tokens.unwrap_or(defaults.max_tokens),
    };

    let message = completions
        .complete(&messages, &options)
        .await
        .map_err(ApiError::with("Failed to generate response"))?;

    Ok(Json(CompletionResponse { message }))
}

pub mod schemas {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CompletionRequest {
        /// Kept untyped so any malformed list is reported as a missing one.
        pub messages: Option<serde_json::Value>,
        pub model: Option<String>,
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
    }

    #[derive(Serialize, Debug)]
    pub struct CompletionResponse {
        pub message: String,
    }
}
