//! Implementations for the service the app needs.
//!

use crate::core::completion::{ChatMessage, CompletionOptions};
use crate::core::errors::ServiceError;
use crate::core::traits::{
    CompletionClient, ConversationService, Exchange, PersonalityRegistry, SendMessage,
};
use crate::infrastructure::entities::{
    Conversation, DeleteOutcome, Message, NewPersonality, Personality, PersonalityUpdate,
};
use crate::infrastructure::traits::{
    ConversationRepository, PersonalityRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::info;
use uuid::Uuid;

/// Conversation titles are cut from the first message to this many characters.
pub const TITLE_MAX_CHARS: usize = 80;

const PERSONALITY_NOT_FOUND: &str = "Personality not found";

#[injectable(ConversationService)]
pub struct ChatConversationService {
    users: Ref<dyn UserRepository>,
    personalities: Ref<dyn PersonalityRepository>,
    conversations: Ref<dyn ConversationRepository>,
    completions: Ref<dyn CompletionClient>,
}

#[async_trait]
impl ConversationService for ChatConversationService {
    async fn send(&self, request: SendMessage) -> Result<Exchange, ServiceError> {
        let user = self
            .users
            .find_or_create(&request.email, request.name)
            .await?;

        let personality = match Uuid::parse_str(&request.personality_id) {
            Ok(personality_id) => self.personalities.find_personality(personality_id).await?,
            Err(_) => None,
        }
        .ok_or_else(|| ServiceError::not_found(PERSONALITY_NOT_FOUND))?;

        let conversation = match request.conversation_id.as_deref() {
            None => {
                let now = Utc::now();
                let conversation = self
                    .conversations
                    .create_conversation(Conversation {
                        id: Uuid::new_v4(),
                        user_id: user.id,
                        personality_id: personality.id,
                        title: Some(conversation_title(&request.message)),
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
                info!("started conversation {} for user {}", conversation.id, user.id);
                conversation
            }
            Some(conversation_id) => {
                let conversation = match Uuid::parse_str(conversation_id) {
                    Ok(conversation_id) => {
                        self.conversations
                            .find_user_conversation(user.id, conversation_id)
                            .await?
                    }
                    Err(_) => None,
                };
                conversation
                    .ok_or_else(|| ServiceError::not_found("Conversation not found for this user"))?
            }
        };

        let history = self
            .conversations
            .list_conversation_messages(conversation.id)
            .await?;

        let prompt = build_prompt(&personality, history, &request.message);

        let reply = self
            .completions
            .complete(&prompt, &CompletionOptions::default())
            .await?;

        let (user_message, assistant_message) = self
            .conversations
            .append_exchange(conversation.id, request.message, reply)
            .await?;

        Ok(Exchange {
            conversation_id: conversation.id,
            user_message,
            assistant_message,
        })
    }

    async fn list_conversations(&self, email: &str) -> Result<Vec<Conversation>, ServiceError> {
        match self.users.find_by_email(email).await? {
            Some(user) => self.conversations.list_conversations(user.id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn list_messages(
        &self,
        email: &str,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, ServiceError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        let conversation = self
            .conversations
            .find_user_conversation(user.id, conversation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation not found"))?;

        self.conversations
            .list_conversation_messages(conversation.id)
            .await
    }
}

/// First [`TITLE_MAX_CHARS`] characters of the opening message.
pub fn conversation_title(message: &str) -> String {
    message.chars().take(TITLE_MAX_CHARS).collect()
}

/// System prompt, then the stored history, then the new user turn.
pub fn build_prompt(
    personality: &Personality,
    history: Vec<Message>,
    message: &str,
) -> Vec<ChatMessage> {
    let mut prompt = Vec::with_capacity(history.len() + 2);
    prompt.push(ChatMessage::system(personality.system_prompt.as_str()));
    prompt.extend(history.into_iter().map(ChatMessage::from));
    prompt.push(ChatMessage::user(message));
    prompt
}

#[injectable(PersonalityRegistry)]
pub struct DbPersonalityRegistry {
    personalities: Ref<dyn PersonalityRepository>,
}

#[async_trait]
impl PersonalityRegistry for DbPersonalityRegistry {
    async fn list(&self) -> Result<Vec<Personality>, ServiceError> {
        self.personalities.list_personalities().await
    }

    async fn create(&self, personality: NewPersonality) -> Result<Personality, ServiceError> {
        if is_blank(&personality.name) || is_blank(&personality.system_prompt) {
            return Err(ServiceError::validation("name and systemPrompt are required"));
        }

        let personality = self.personalities.create_personality(personality).await?;
        info!("created personality {} ({})", personality.id, personality.name);
        Ok(personality)
    }

    async fn update(
        &self,
        personality_id: Uuid,
        update: PersonalityUpdate,
    ) -> Result<Personality, ServiceError> {
        if update.name.as_deref().is_some_and(is_blank) {
            return Err(ServiceError::validation("name must not be empty"));
        }
        if update.system_prompt.as_deref().is_some_and(is_blank) {
            return Err(ServiceError::validation("systemPrompt must not be empty"));
        }

        self.personalities
            .update_personality(personality_id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found(PERSONALITY_NOT_FOUND))
    }

    async fn delete(&self, personality_id: Uuid) -> Result<(), ServiceError> {
        match self.personalities.delete_personality(personality_id).await? {
            DeleteOutcome::Deleted => {
                info!("deleted personality {personality_id}");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(ServiceError::not_found(PERSONALITY_NOT_FOUND)),
            DeleteOutcome::Referenced => Err(ServiceError::Conflict(
                "Personality is still used by existing conversations".to_owned(),
            )),
        }
    }
}

/// Whitespace-only input counts as missing.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::completion::Role;
    use crate::infrastructure::entities::Sender;

    fn message(sender: Sender, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::nil(),
            sender,
            content: content.to_owned(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn title_keeps_first_80_characters() {
        let message = "x".repeat(90);
        assert_eq!(conversation_title(&message), "x".repeat(80));
        assert_eq!(conversation_title("hi"), "hi");
    }

    #[test]
    fn title_counts_characters_not_bytes() {
        let message = "é".repeat(100);
        assert_eq!(conversation_title(&message).chars().count(), 80);
    }

    #[test]
    fn prompt_wraps_history_between_system_and_new_message() {
        let personality = Personality {
            id: Uuid::new_v4(),
            name: "Pirate".to_owned(),
            description: None,
            system_prompt: "Talk like a pirate.".to_owned(),
            created_at: Utc::now(),
        };
        let history = vec![
            message(Sender::User, "ahoy"),
            message(Sender::Assistant, "arr"),
        ];

        let prompt = build_prompt(&personality, history, "where's the treasure?");

        let roles: Vec<Role> = prompt.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(prompt[0].content, "Talk like a pirate.");
        assert_eq!(prompt[3].content, "where's the treasure?");
    }
}
