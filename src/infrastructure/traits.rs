//! Infrastructure traits, used for DI on higher levels

use crate::core::errors::ServiceError;
use crate::infrastructure::entities;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<entities::User>, ServiceError>;

    /// Inserts the user unless the email is already taken, then returns the stored row.
    ///
    /// An existing user keeps its original name.
    async fn find_or_create(
        &self,
        email: &str,
        name: Option<String>,
    ) -> Result<entities::User, ServiceError>;
}

#[async_trait]
pub trait PersonalityRepository: Send + Sync {
    async fn list_personalities(&self) -> Result<Vec<entities::Personality>, ServiceError>;

    async fn find_personality(
        &self,
        personality_id: Uuid,
    ) -> Result<Option<entities::Personality>, ServiceError>;

    async fn create_personality(
        &self,
        personality: entities::NewPersonality,
    ) -> Result<entities::Personality, ServiceError>;

    /// Returns `None` when no personality has the given id.
    async fn update_personality(
        &self,
        personality_id: Uuid,
        update: entities::PersonalityUpdate,
    ) -> Result<Option<entities::Personality>, ServiceError>;

    async fn delete_personality(
        &self,
        personality_id: Uuid,
    ) -> Result<entities::DeleteOutcome, ServiceError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn list_conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<entities::Conversation>, ServiceError>;

    async fn create_conversation(
        &self,
        conversation: entities::Conversation,
    ) -> Result<entities::Conversation, ServiceError>;

    /// Fetches a conversation only if it is owned by `user_id`.
    async fn find_user_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<entities::Conversation>, ServiceError>;

    /// Messages of a conversation, oldest first.
    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<entities::Message>, ServiceError>;

    /// Stores a user message and the assistant reply and bumps the conversation's
    /// `updated_at`, all in one transaction.
    async fn append_exchange(
        &self,
        conversation_id: Uuid,
        user_text: String,
        assistant_text: String,
    ) -> Result<(entities::Message, entities::Message), ServiceError>;
}
