//! Persistence layer: the three record sets of the port lifecycle.

pub use sea_orm;

use sea_orm::{Database, DatabaseConnection};

pub mod entities;

/// Connects to the session database (`postgres://` in production,
/// `sqlite::memory:` in tests).
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, sea_orm::DbErr> {
    Database::connect(database_url).await
}
