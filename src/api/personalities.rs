//! Personality CRUD endpoints

use crate::api::error::ApiError;
use crate::api::personalities::schemas::{
    CreatePersonality, DeleteResponse, Personality, UpdatePersonality,
};
use crate::api::{JsonBody, parse_id};
use crate::core::traits::PersonalityRegistry;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use di_axum::Inject;

const NOT_FOUND: &str = "Personality not found";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_personalities).post(create_personality))
        .route("/:id", put(update_personality).delete(delete_personality))
}

async fn list_personalities(
    Inject(registry): Inject<dyn PersonalityRegistry>,
) -> Result<Json<Vec<Personality>>, ApiError> {
    let personalities = registry
        .list()
        .await
        .map_err(ApiError::with("Failed to fetch personalities"))?;

    Ok(Json(
        personalities.into_iter().map(Personality::from).collect(),
    ))
}

async fn create_personality(
    Inject(registry): Inject<dyn PersonalityRegistry>,
    JsonBody(request): JsonBody<CreatePersonality>,
) -> Result<(StatusCode, Json<Personality>), ApiError> {
    let personality = registry
        .create(request.into())
        .await
        .map_err(ApiError::with("Failed to create personality"))?;

    Ok((StatusCode::CREATED, Json(personality.into())))
}

async fn update_personality(
    Inject(registry): Inject<dyn PersonalityRegistry>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdatePersonality>,
) -> Result<Json<Personality>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;

    let personality = registry
        .update(id, request.into())
        .await
        .map_err(ApiError::with("Failed to update personality"))?;

    Ok(Json(personality.into()))
}

async fn delete_personality(
    Inject(registry): Inject<dyn PersonalityRegistry>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;

    registry
        .delete(id)
        .await
        .map_err(ApiError::with("Failed to delete personality"))?;

    Ok(Json(DeleteResponse { success: true }))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize};
    use uuid::Uuid;

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Personality {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub system_prompt: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Personality> for Personality {
        fn from(personality: entities::Personality) -> Self {
            Personality {
                id: personality.id,
                name: personality.name,
                description: personality.description,
                system_prompt: personality.system_prompt,
                created_at: personality.created_at,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CreatePersonality {
        #[serde(default)]
        pub name: String,
        pub description: Option<String>,
        #[serde(default)]
        pub system_prompt: String,
    }

    impl From<CreatePersonality> for entities::NewPersonality {
        fn from(request: CreatePersonality) -> Self {
            entities::NewPersonality {
                name: request.name,
                description: request.description.filter(|d| !d.is_empty()),
                system_prompt: request.system_prompt,
            }
        }
    }

    /// Any subset of the editable fields; `"description": null` clears the description.
    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdatePersonality {
        pub name: Option<String>,
        #[serde(default, deserialize_with = "present")]
        pub description: Option<Option<String>>,
        pub system_prompt: Option<String>,
    }

    impl From<UpdatePersonality> for entities::PersonalityUpdate {
        fn from(request: UpdatePersonality) -> Self {
            entities::PersonalityUpdate {
                name: request.name,
                description: request.description,
                system_prompt: request.system_prompt,
            }
        }
    }

    /// Distinguishes a field sent as `null` from one left out.
    fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    #[derive(Serialize, Debug)]
    pub struct DeleteResponse {
        pub success: bool,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn update_tells_null_from_missing_description() {
            let update: UpdatePersonality = serde_json::from_str(r#"{"description": null}"#).unwrap();
            assert_eq!(update.description, Some(None));

            let update: UpdatePersonality = serde_json::from_str(r#"{"name": "Bob"}"#).unwrap();
            assert_eq!(update.description, None);
            assert_eq!(update.name.as_deref(), Some("Bob"));
        }

        #[test]
        fn empty_update_changes_nothing() {
            let update: UpdatePersonality = serde_json::from_str("{}").unwrap();
            assert!(entities::PersonalityUpdate::from(update).is_empty());
        }
    }
}
