//! Attack persistence

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use super::AttackDefinition;
use crate::character::Ability;

/// Attack storage errors
#[derive(Debug, Error)]
pub enum AttackError {
    #[error("this character already has an attack named \"{0}\"")]
    Exists(String),

    #[error("no attack named \"{0}\"")]
    NotFound(String),

    #[error("stored attack is corrupt: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Attack storage with database backing
pub struct AttackStore {
    pool: SqlitePool,
}

impl AttackStore {
    /// Create a new attack store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a finished definition, returning its row id
    pub async fn create(&self, attack: &AttackDefinition) -> Result<i64, AttackError> {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM attacks WHERE character_id = ? AND name = ?")
                .bind(attack.character_id)
                .bind(&attack.name)
                .fetch_optional(&self.pool)
                .await?;

        if existing.is_some() {
            return Err(AttackError::Exists(attack.name.clone()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO attacks (character_id, name, requires_attack_roll, requires_saving_throw,
                attribute, save_target, proficient, flat_modifier, damage)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attack.character_id)
        .bind(&attack.name)
        .bind(attack.requires_attack_roll)
        .bind(attack.requires_saving_throw)
        .bind(attack.attribute.map(|a| a.name()))
        .bind(attack.save_target.map(|a| a.name()))
        .bind(attack.proficient)
        .bind(attack.flat_modifier)
        .bind(&attack.damage)
        .execute(&self.pool)
        .await?;

        info!(
            "Saved attack '{}' for character {}",
            attack.name, attack.character_id
        );
        Ok(result.last_insert_rowid())
    }

    /// All attacks of a character, oldest first
    pub async fn list(&self, character_id: i64) -> Result<Vec<AttackDefinition>, AttackError> {
        let rows: Vec<AttackRow> = sqlx::query_as(
            r#"
            SELECT character_id, name, requires_attack_roll, requires_saving_throw,
                attribute, save_target, proficient, flat_modifier, damage
            FROM attacks WHERE character_id = ? ORDER BY id
            "#,
        )
        .bind(character_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttackRow::into_attack).collect()
    }

    /// Get one attack by name
    pub async fn get(
        &self,
        character_id: i64,
        name: &str,
    ) -> Result<Option<AttackDefinition>, AttackError> {
        let row: Option<AttackRow> = sqlx::query_as(
            r#"
            SELECT character_id, name, requires_attack_roll, requires_saving_throw,
                attribute, save_target, proficient, flat_modifier, damage
            FROM attacks WHERE character_id = ? AND name = ?
            "#,
        )
        .bind(character_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttackRow::into_attack).transpose()
    }

    /// Get one attack by name, failing when it does not exist
    pub async fn require(&self, character_id: i64, name: &str) -> Result<AttackDefinition, AttackError> {
        self.get(character_id, name)
            .await?
            .ok_or_else(|| AttackError::NotFound(name.to_string()))
    }

    /// Delete an attack
    pub async fn delete(&self, character_id: i64, name: &str) -> Result<bool, AttackError> {
        let result = sqlx::query("DELETE FROM attacks WHERE character_id = ? AND name = ?")
            .bind(character_id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Row type for SQLite queries
#[derive(sqlx::FromRow)]
struct AttackRow {
    character_id: i64,
    name: String,
    requires_attack_roll: bool,
    requires_saving_throw: bool,
    attribute: Option<String>,
    save_target: Option<String>,
    proficient: bool,
    flat_modifier: i32,
    damage: String,
}

impl AttackRow {
    fn into_attack(self) -> Result<AttackDefinition, AttackError> {
        Ok(AttackDefinition {
            character_id: self.character_id,
            name: self.name,
            requires_attack_roll: self.requires_attack_roll,
            requires_saving_throw: self.requires_saving_throw,
            attribute: parse_ability(self.attribute)?,
            save_target: parse_ability(self.save_target)?,
            proficient: self.proficient,
            flat_modifier: self.flat_modifier,
            damage: self.damage,
        })
    }
}

fn parse_ability(value: Option<String>) -> Result<Option<Ability>, AttackError> {
    value
        .map(|v| v.parse::<Ability>().map_err(AttackError::Corrupt))
        .transpose()
}
