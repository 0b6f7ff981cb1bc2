//! Database module - SQLite storage for characters and attacks

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

#[cfg(test)]
pub mod test_utils;

/// Database handle wrapping SQLite connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    /// If path is None, uses in-memory database (for testing)
    pub async fn new(path: Option<&str>) -> Result<Self> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                created TEXT NOT NULL,
                level INTEGER NOT NULL,
                initiative INTEGER NOT NULL,
                strength INTEGER NOT NULL,
                dexterity INTEGER NOT NULL,
                constitution INTEGER NOT NULL,
                intelligence INTEGER NOT NULL,
                wisdom INTEGER NOT NULL,
                charisma INTEGER NOT NULL,
                proficiencies TEXT NOT NULL DEFAULT '',
                race TEXT,
                class TEXT,
                portrait TEXT NOT NULL,
                UNIQUE(owner_id, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Attacks die with their character
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attacks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                character_id INTEGER NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                requires_attack_roll INTEGER NOT NULL,
                requires_saving_throw INTEGER NOT NULL,
                attribute TEXT,
                save_target TEXT,
                proficient INTEGER NOT NULL,
                flat_modifier INTEGER NOT NULL DEFAULT 0,
                damage TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(character_id, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_characters_owner ON characters(owner_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_attacks_character ON attacks(character_id)")
            .execute(&self.pool)
            .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_creation() {
        let db = Database::new(None).await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_run() {
        let db = Database::new(None).await.unwrap();

        let result: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM characters")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 0);

        let result: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM attacks")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 0);
    }

    #[tokio::test]
    async fn test_file_database_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cantrip.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new(Some(path)).await.unwrap();
            sqlx::query(
                "INSERT INTO characters (owner_id, name, created, level, initiative, strength, dexterity, constitution, intelligence, wisdom, charisma, portrait)
                 VALUES ('u1', 'Kept', '2024-01-01', 1, 0, 10, 10, 10, 10, 10, 10, 'p')",
            )
            .execute(db.pool())
            .await
            .unwrap();
            db.pool().close().await;
        }

        // Migrations are idempotent and data survives
        let db = Database::new(Some(path)).await.unwrap();
        let (count,): (i32,) = sqlx::query_as("SELECT COUNT(*) FROM characters")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
