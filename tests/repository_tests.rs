//! Repository tests
//!
//! Resolves the SQL repositories from the DI container and exercises them
//! against an in-memory database.

use chrono::Utc;
use di::{Injectable, Ref, ServiceCollection, ServiceProvider, existing_as_self};
use personality_chat_api::core::errors::ServiceError;
use personality_chat_api::infrastructure::database::DatabaseConnection;
use personality_chat_api::infrastructure::repositories::{
    DbConversationRepository, DbPersonalityRepository, DbUserRepository,
};
use personality_chat_api::infrastructure::entities::{
    Conversation, DeleteOutcome, NewPersonality, Personality, PersonalityUpdate, Sender, User,
};
use personality_chat_api::infrastructure::traits::{
    ConversationRepository, PersonalityRepository, UserRepository,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

struct Fixture {
    pool: SqlitePool,
    // keeps scoped services alive
    scope: ServiceProvider,
}

impl Fixture {
    async fn new() -> Fixture {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let database = DatabaseConnection::migrated(pool.clone()).await.unwrap();

        let provider = ServiceCollection::new()
            .add(existing_as_self(database))
            .add(DbUserRepository::scoped())
            .add(DbPersonalityRepository::scoped())
            .add(DbConversationRepository::scoped())
            .build_provider()
            .unwrap();

        Fixture {
            pool,
            scope: provider.create_scope(),
        }
    }

    fn users(&self) -> Ref<dyn UserRepository> {
        self.scope.get_required::<dyn UserRepository>()
    }

    fn personalities(&self) -> Ref<dyn PersonalityRepository> {
        self.scope.get_required::<dyn PersonalityRepository>()
    }

    fn conversations(&self) -> Ref<dyn ConversationRepository> {
        self.scope.get_required::<dyn ConversationRepository>()
    }

    async fn personality(&self) -> Personality {
        self.personalities()
            .create_personality(NewPersonality {
                name: "Pirate".to_owned(),
                description: None,
                system_prompt: "Arr.".to_owned(),
            })
            .await
            .unwrap()
    }

    async fn conversation(&self, user: &User, personality: &Personality) -> Conversation {
        let now = Utc::now();
        self.conversations()
            .create_conversation(Conversation {
                id: Uuid::new_v4(),
                user_id: user.id,
                personality_id: personality.id,
                title: Some("hi".to_owned()),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    async fn message_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_find_or_create_user_is_idempotent() {
    let fixture = Fixture::new().await;
    let users = fixture.users();

    let first = users
        .find_or_create("a@x.com", Some("Alice".to_owned()))
        .await
        .unwrap();
    let second = users
        .find_or_create("a@x.com", Some("Someone else".to_owned()))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name.as_deref(), Some("Alice"));

    let found = users.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
    assert!(users.find_by_email("b@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_append_exchange_stores_both_messages_in_order() {
    let fixture = Fixture::new().await;
    let user = fixture.users().find_or_create("a@x.com", None).await.unwrap();
    let personality = fixture.personality().await;
    let conversation = fixture.conversation(&user, &personality).await;
    let conversations = fixture.conversations();

    for turn in 0..3 {
        let (user_message, assistant_message) = conversations
            .append_exchange(conversation.id, format!("q{turn}"), format!("a{turn}"))
            .await
            .unwrap();
        assert_eq!(user_message.sender, Sender::User);
        assert_eq!(assistant_message.sender, Sender::Assistant);
        assert!(user_message.metadata.is_none());
    }

    let contents: Vec<String> = conversations
        .list_conversation_messages(conversation.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["q0", "a0", "q1", "a1", "q2", "a2"]);

    let stored = conversations
        .find_user_conversation(user.id, conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.updated_at > conversation.updated_at);
}

#[tokio::test]
async fn test_append_exchange_rolls_back_on_failure() {
    let fixture = Fixture::new().await;
    let user = fixture.users().find_or_create("a@x.com", None).await.unwrap();
    let personality = fixture.personality().await;
    let conversation = fixture.conversation(&user, &personality).await;

    sqlx::query(
        "CREATE TRIGGER reject_assistant BEFORE INSERT ON messages WHEN NEW.sender = 'assistant' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(&fixture.pool)
    .await
    .unwrap();

    let result = fixture
        .conversations()
        .append_exchange(conversation.id, "hi".to_owned(), "hello".to_owned())
        .await;

    assert!(matches!(result, Err(ServiceError::Transaction(_))));
    assert_eq!(fixture.message_count().await, 0);

    let stored = fixture
        .conversations()
        .find_user_conversation(user.id, conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.updated_at, conversation.updated_at);
}

#[tokio::test]
async fn test_append_exchange_to_missing_conversation_fails() {
    let fixture = Fixture::new().await;

    let result = fixture
        .conversations()
        .append_exchange(Uuid::new_v4(), "hi".to_owned(), "hello".to_owned())
        .await;

    assert!(matches!(result, Err(ServiceError::Transaction(_))));
    assert_eq!(fixture.message_count().await, 0);
}

#[tokio::test]
async fn test_conversations_are_scoped_to_their_owner() {
    let fixture = Fixture::new().await;
    let owner = fixture.users().find_or_create("owner@x.com", None).await.unwrap();
    let other = fixture.users().find_or_create("other@x.com", None).await.unwrap();
    let personality = fixture.personality().await;
    let conversation = fixture.conversation(&owner, &personality).await;
    let conversations = fixture.conversations();

    assert!(
        conversations
            .find_user_conversation(other.id, conversation.id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(conversations.list_conversations(owner.id).await.unwrap().len(), 1);
    assert!(conversations.list_conversations(other.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_personality_applies_only_supplied_fields() {
    let fixture = Fixture::new().await;
    let personality = fixture.personality().await;
    let personalities = fixture.personalities();

    let unchanged = personalities
        .update_personality(personality.id, PersonalityUpdate::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.name, personality.name);
    assert_eq!(unchanged.system_prompt, personality.system_prompt);

    let updated = personalities
        .update_personality(
            personality.id,
            PersonalityUpdate {
                description: Some(Some("Salty".to_owned())),
                ..PersonalityUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("Salty"));
    assert_eq!(updated.name, "Pirate");

    let missing = personalities
        .update_personality(Uuid::new_v4(), PersonalityUpdate::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_delete_personality_outcomes() {
    let fixture = Fixture::new().await;
    let user = fixture.users().find_or_create("a@x.com", None).await.unwrap();
    let used = fixture.personality().await;
    let unused = fixture.personality().await;
    fixture.conversation(&user, &used).await;
    let personalities = fixture.personalities();

    assert_eq!(
        personalities.delete_personality(used.id).await.unwrap(),
        DeleteOutcome::Referenced
    );
    assert_eq!(
        personalities.delete_personality(unused.id).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        personalities.delete_personality(unused.id).await.unwrap(),
        DeleteOutcome::NotFound
    );
    assert_eq!(personalities.list_personalities().await.unwrap().len(), 1);
}
