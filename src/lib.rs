//! Personality chat backend - Library exports for testing
//!
//! (c) Softlandia 2025

pub mod api;
pub mod core;
pub mod infrastructure;

use crate::core::services::{ChatConversationService, DbPersonalityRegistry};
use crate::infrastructure::repositories::{
    DbConversationRepository, DbPersonalityRepository, DbUserRepository,
};
use di::{Injectable, ServiceCollection};

/// Registers repositories and services. The database connection and a
/// `CompletionClient` must be added by the caller.
pub fn add_services(services: &mut ServiceCollection) -> &mut ServiceCollection {
    services
        .add(DbUserRepository::scoped())
        .add(DbPersonalityRepository::scoped())
        .add(DbConversationRepository::scoped())
        .add(ChatConversationService::scoped())
        .add(DbPersonalityRegistry::scoped())
}
