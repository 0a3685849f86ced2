//! DB Repository abstractions

use crate::core::errors::ServiceError;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Conversation, DeleteOutcome, Message, NewPersonality, Personality, PersonalityUpdate, Sender,
    User,
};
use crate::infrastructure::traits::{
    ConversationRepository, PersonalityRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::debug;
use sqlx::SqliteConnection;
use uuid::Uuid;

#[injectable(UserRepository)]
pub struct DbUserRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&**self.connection)
            .await?;

        Ok(user)
    }

    async fn find_or_create(&self, email: &str, name: Option<String>) -> Result<User, ServiceError> {
        let inserted = sqlx::query(
            "INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?) ON CONFLICT (email) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(Utc::now())
        .execute(&**self.connection)
        .await?
        .rows_affected();

        if inserted > 0 {
            debug!("created user for {email}");
        }

        let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&**self.connection)
            .await?;

        Ok(user)
    }
}

#[injectable(PersonalityRepository)]
pub struct DbPersonalityRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl PersonalityRepository for DbPersonalityRepository {
    async fn list_personalities(&self) -> Result<Vec<Personality>, ServiceError> {
        let personalities = sqlx::query_as("SELECT * FROM personalities")
            .fetch_all(&**self.connection)
            .await?;

        Ok(personalities)
    }

    async fn find_personality(
        &self,
        personality_id: Uuid,
    ) -> Result<Option<Personality>, ServiceError> {
        let personality = sqlx::query_as("SELECT * FROM personalities WHERE id = ?")
            .bind(personality_id)
            .fetch_optional(&**self.connection)
            .await?;

        Ok(personality)
    }

    async fn create_personality(
        &self,
        personality: NewPersonality,
    ) -> Result<Personality, ServiceError> {
        let personality = sqlx::query_as(
            "INSERT INTO personalities (id, name, description, system_prompt, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(personality.name)
        .bind(personality.description)
        .bind(personality.system_prompt)
        .bind(Utc::now())
        .fetch_one(&**self.connection)
        .await?;

        Ok(personality)
    }

    async fn update_personality(
        &self,
        personality_id: Uuid,
        update: PersonalityUpdate,
    ) -> Result<Option<Personality>, ServiceError> {
        let set_description = update.description.is_some();

        let personality = sqlx::query_as(
            "UPDATE personalities SET name = COALESCE(?, name), description = CASE WHEN ? THEN ? ELSE description END, system_prompt = COALESCE(?, system_prompt) WHERE id = ? RETURNING *",
        )
        .bind(update.name)
        .bind(set_description)
        .bind(update.description.flatten())
        .bind(update.system_prompt)
        .bind(personality_id)
        .fetch_optional(&**self.connection)
        .await?;

        Ok(personality)
    }

    async fn delete_personality(&self, personality_id: Uuid) -> Result<DeleteOutcome, ServiceError> {
        let mut tx = self.connection.begin().await?;

        let references: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE personality_id = ?")
                .bind(personality_id)
                .fetch_one(&mut *tx)
                .await?;

        if references > 0 {
            return Ok(DeleteOutcome::Referenced);
        }

        let deleted = sqlx::query("DELETE FROM personalities WHERE id = ?")
            .bind(personality_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if deleted == 0 {
            Ok(DeleteOutcome::NotFound)
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }
}

#[injectable(ConversationRepository)]
pub struct DbConversationRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ConversationRepository for DbConversationRepository {
    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, ServiceError> {
        let conversations = sqlx::query_as(
            "SELECT * FROM conversations WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await?;

        Ok(conversations)
    }

    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, ServiceError> {
        let conversation = sqlx::query_as(
            "INSERT INTO conversations (id, user_id, personality_id, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(conversation.id)
        .bind(conversation.user_id)
        .bind(conversation.personality_id)
        .bind(conversation.title)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .fetch_one(&**self.connection)
        .await?;

        Ok(conversation)
    }

    async fn find_user_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, ServiceError> {
        let conversation =
            sqlx::query_as("SELECT * FROM conversations WHERE id = ? AND user_id = ?")
                .bind(conversation_id)
                .bind(user_id)
                .fetch_optional(&**self.connection)
                .await?;

        Ok(conversation)
    }

    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, ServiceError> {
        let messages = sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&**self.connection)
        .await?;

        Ok(messages)
    }

    async fn append_exchange(
        &self,
        conversation_id: Uuid,
        user_text: String,
        assistant_text: String,
    ) -> Result<(Message, Message), ServiceError> {
        // Dropping `tx` on any early return rolls the whole exchange back.
        let mut tx = self
            .connection
            .begin()
            .await
            .map_err(ServiceError::Transaction)?;

        let user_message = insert_message(&mut *tx, conversation_id, Sender::User, user_text)
            .await
            .map_err(ServiceError::Transaction)?;
        let assistant_message =
            insert_message(&mut *tx, conversation_id, Sender::Assistant, assistant_text)
                .await
                .map_err(ServiceError::Transaction)?;

        let updated = sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(ServiceError::Transaction)?
            .rows_affected();

        if updated == 0 {
            return Err(ServiceError::Transaction(sqlx::Error::RowNotFound));
        }

        tx.commit().await.map_err(ServiceError::Transaction)?;

        Ok((user_message, assistant_message))
    }
}

async fn insert_message(
    connection: &mut SqliteConnection,
    conversation_id: Uuid,
    sender: Sender,
    content: String,
) -> Result<Message, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO messages (id, conversation_id, sender, content, metadata, created_at) VALUES (?, ?, ?, ?, NULL, ?) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(sender)
    .bind(content)
    .bind(Utc::now())
    .fetch_one(connection)
    .await
}
