//! Business logic: completion client, services and their DI interfaces.

pub mod completion;
pub mod errors;
pub mod services;
pub mod traits;
