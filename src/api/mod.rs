use crate::api::error::ApiError;
use crate::core::errors::ServiceError;
use crate::core::services::is_blank;
use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use uuid::Uuid;

pub mod chat;
pub mod completions;
pub mod error;
pub mod personalities;

/// All routes of the service, without DI or middleware attached.
pub fn router() -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/api/groq", completions::router())
        .nest("/api/chat", chat::router())
        .nest("/api/personalities", personalities::router())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

/// The caller's identity, taken from the `email` query parameter.
#[derive(Debug)]
pub struct ExtractEmail(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractEmail
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        let email = Query::<EmailQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.email)
            .filter(|email| !is_blank(email))
            .ok_or_else(|| ServiceError::validation("email is required"))?;

        Ok(ExtractEmail(email))
    }
}

/// `Json` whose rejections answer with the usual `{ "error": ... }` body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ServiceError::validation(rejection.body_text()))?;

        Ok(JsonBody(value))
    }
}

/// Parses an identifier; a malformed one cannot name any row, so it is reported as not found.
pub fn parse_id(id: &str, not_found: &str) -> Result<Uuid, ServiceError> {
    Uuid::from_str(id).map_err(|_| ServiceError::not_found(not_found))
}
