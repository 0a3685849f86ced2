//! Pooled SQLite connection

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use std::ops::{Deref, DerefMut};

pub struct DatabaseConnection {
    connection: SqlitePool,
}

impl DatabaseConnection {
    /// Connects to `DATABASE_URL` and brings the schema up to date.
    pub async fn from_env() -> anyhow::Result<DatabaseConnection> {
        dotenvy::dotenv().ok();
        let connection_string =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;

        Self::migrated(pool).await
    }

    /// Wraps an existing pool after running the embedded migrations on it.
    pub async fn migrated(pool: SqlitePool) -> anyhow::Result<DatabaseConnection> {
        sqlx::migrate!().run(&pool).await?;

        Ok(DatabaseConnection { connection: pool })
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for DatabaseConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
