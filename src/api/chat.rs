//! Conversation endpoints

use crate::api::chat::schemas::{Conversation, Message, SendRequest, SendResponse};
use crate::api::error::ApiError;
use crate::api::{ExtractEmail, JsonBody, parse_id};
use crate::core::traits::ConversationService;
use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/send", post(send_message))
        .route("/conversations", get(list_conversations))
        .route("/conversations/:id/messages", get(conversation_messages))
}

async fn send_message(
    Inject(conversation_service): Inject<dyn ConversationService>,
    JsonBody(request): JsonBody<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let internal = ApiError::with("Failed to send message");
    let command = request.into_command().map_err(ApiError::from)?;

    let exchange = conversation_service.send(command).await.map_err(internal)?;

    Ok(Json(SendResponse {
        conversation_id: exchange.conversation_id,
        user_message: exchange.user_message.into(),
        assistant_message: exchange.assistant_message.into(),
    }))
}

async fn list_conversations(
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractEmail(email): ExtractEmail,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = conversation_service
        .list_conversations(&email)
        .await
        .map_err(ApiError::with("Failed to fetch conversations"))?;

    Ok(Json(
        conversations.into_iter().map(Conversation::from).collect(),
    ))
}

async fn conversation_messages(
    Inject(conversation_service): Inject<dyn ConversationService>,
    Path(conversation_id): Path<String>,
    ExtractEmail(email): ExtractEmail,
) -> Result<Json<Vec<Message>>, ApiError> {
    let internal = ApiError::with("Failed to fetch messages");
    let conversation_id = parse_id(&conversation_id, "Conversation not found")?;

    let messages = conversation_service
        .list_messages(&email, conversation_id)
        .await
        .map_err(internal)?;

    Ok(Json(messages.into_iter().map(Message::from).collect()))
}

pub mod schemas {
    use crate::core::errors::ServiceError;
    use crate::core::services::is_blank;
    use crate::core::traits::SendMessage;
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct SendRequest {
        pub email: Option<String>,
        pub name: Option<String>,
        pub personality_id: Option<String>,
        pub message: Option<String>,
        pub conversation_id: Option<String>,
    }

    impl SendRequest {
        pub fn into_command(self) -> Result<SendMessage, ServiceError> {
            let (Some(email), Some(personality_id), Some(message)) = (
                non_empty(self.email),
                non_empty(self.personality_id),
                non_empty(self.message),
            ) else {
                return Err(ServiceError::validation(
                    "email, personalityId and message are required",
                ));
            };

            Ok(SendMessage {
                email,
                name: non_empty(self.name),
                personality_id,
                message,
                conversation_id: non_empty(self.conversation_id),
            })
        }
    }

    fn non_empty(value: Option<String>) -> Option<String> {
        value.filter(|v| !is_blank(v))
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct SendResponse {
        pub conversation_id: Uuid,
        pub user_message: Message,
        pub assistant_message: Message,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Conversation {
        pub id: Uuid,
        pub user_id: Uuid,
        pub personality_id: Uuid,
        pub title: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Conversation> for Conversation {
        fn from(conversation: entities::Conversation) -> Self {
            Conversation {
                id: conversation.id,
                user_id: conversation.user_id,
                personality_id: conversation.personality_id,
                title: conversation.title,
                created_at: conversation.created_at,
                updated_at: conversation.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "lowercase")]
    pub enum Sender {
        User,
        Assistant,
    }

    impl From<entities::Sender> for Sender {
        fn from(sender: entities::Sender) -> Self {
            match sender {
                entities::Sender::User => Sender::User,
                entities::Sender::Assistant => Sender::Assistant,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Message {
        pub id: Uuid,
        pub conversation_id: Uuid,
        pub sender: Sender,
        pub content: String,
        pub metadata: Option<serde_json::Value>,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            Message {
                id: message.id,
                conversation_id: message.conversation_id,
                sender: message.sender.into(),
                content: message.content,
                metadata: message.metadata.map(|metadata| metadata.0),
                created_at: message.created_at,
            }
        }
    }

}
