//! DI "Interfaces"

use crate::core::completion::{ChatMessage, CompletionOptions};
use crate::core::errors::ServiceError;
use crate::infrastructure::entities;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the chat history to the provider and returns the first choice's text verbatim.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ServiceError>;
}

/// A message sent by a user to one of the personalities.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub email: String,
    pub name: Option<String>,
    /// Raw identifiers as sent by the client; they are resolved after the user is.
    pub personality_id: String,
    pub message: String,
    /// Starts a new conversation when absent.
    pub conversation_id: Option<String>,
}

/// Outcome of a successful send.
#[derive(Debug)]
pub struct Exchange {
    pub conversation_id: Uuid,
    pub user_message: entities::Message,
    pub assistant_message: entities::Message,
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Stores the user's message together with the personality's reply.
    ///
    /// Returns `Err(NotFound)` if the personality does not exist or the conversation is not
    /// owned by the user. The user is created on first contact even if the send later fails.
    async fn send(&self, request: SendMessage) -> Result<Exchange, ServiceError>;

    /// Lists all conversations of the user with this email; unknown users have none.
    async fn list_conversations(
        &self,
        email: &str,
    ) -> Result<Vec<entities::Conversation>, ServiceError>;

    /// List all messages in a conversation, oldest first.
    ///
    /// Returns `Err(NotFound)` if the user is unknown or doesn't own the conversation.
    async fn list_messages(
        &self,
        email: &str,
        conversation_id: Uuid,
    ) -> Result<Vec<entities::Message>, ServiceError>;
}

#[async_trait]
pub trait PersonalityRegistry: Send + Sync {
    async fn list(&self) -> Result<Vec<entities::Personality>, ServiceError>;

    /// Returns `Err(Validation)` if the name or system prompt is empty.
    async fn create(
        &self,
        personality: entities::NewPersonality,
    ) -> Result<entities::Personality, ServiceError>;

    /// Applies only the supplied fields.
    async fn update(
        &self,
        personality_id: Uuid,
        update: entities::PersonalityUpdate,
    ) -> Result<entities::Personality, ServiceError>;

    /// Returns `Err(Conflict)` while any conversation still uses the personality.
    async fn delete(&self, personality_id: Uuid) -> Result<(), ServiceError>;
}
