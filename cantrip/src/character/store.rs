//! Character persistence

use sqlx::SqlitePool;
use tracing::info;

use super::{
    AbilityScores, Character, CharacterError, NewCharacter, Skill, DEFAULT_PORTRAIT_URL,
    MAX_TEXT_LEN,
};

/// Suffix appended when an owner reuses a character name
const NEXT_OF_KIN_SUFFIX: &str = " Jr.";

/// A freshly created character, plus the name the caller asked for when it had to change
#[derive(Debug, Clone)]
pub struct CreatedCharacter {
    pub character: Character,
    pub requested_name: Option<String>,
}

/// Character storage with database backing
pub struct CharacterStore {
    pool: SqlitePool,
}

impl CharacterStore {
    /// Create a new character store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a character for `owner_id`, renaming to "<name> Jr." on collisions
    pub async fn create(
        &self,
        owner_id: &str,
        new: &NewCharacter,
        max_characters: usize,
    ) -> Result<CreatedCharacter, CharacterError> {
        let proficiencies = new.validate()?;
        let requested = new.name.trim().to_string();

        let mut tx = self.pool.begin().await?;

        let existing: Vec<(String,)> = sqlx::query_as("SELECT name FROM characters WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_all(&mut *tx)
            .await?;
        let existing: Vec<String> = existing.into_iter().map(|(n,)| n).collect();

        if existing.len() >= max_characters {
            return Err(CharacterError::TooManyCharacters {
                max: max_characters,
            });
        }

        let mut name = requested.clone();
        while existing.contains(&name) {
            name.push_str(NEXT_OF_KIN_SUFFIX);
        }
        if name.chars().count() > MAX_TEXT_LEN {
            return Err(CharacterError::InvalidField {
                field: "name",
                reason: format!(
                    "\"{}\" is taken and the renamed character would exceed {} characters",
                    requested, MAX_TEXT_LEN
                ),
            });
        }

        let created = chrono::Utc::now().date_naive();
        let portrait = new
            .portrait
            .clone()
            .unwrap_or_else(|| DEFAULT_PORTRAIT_URL.to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO characters (owner_id, name, created, level, initiative,
                strength, dexterity, constitution, intelligence, wisdom, charisma,
                proficiencies, race, class, portrait)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner_id)
        .bind(&name)
        .bind(created.format("%Y-%m-%d").to_string())
        .bind(new.level)
        .bind(new.initiative)
        .bind(new.abilities.strength)
        .bind(new.abilities.dexterity)
        .bind(new.abilities.constitution)
        .bind(new.abilities.intelligence)
        .bind(new.abilities.wisdom)
        .bind(new.abilities.charisma)
        .bind(encode_skills(&proficiencies))
        .bind(&new.race)
        .bind(&new.class)
        .bind(&portrait)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Created character '{}' for owner {}", name, owner_id);

        let character = Character {
            id: result.last_insert_rowid(),
            owner_id: owner_id.to_string(),
            name: name.clone(),
            created,
            level: new.level,
            initiative: new.initiative,
            abilities: new.abilities,
            proficiencies,
            race: new.race.clone(),
            class: new.class.clone(),
            portrait,
        };

        Ok(CreatedCharacter {
            character,
            requested_name: (name != requested).then_some(requested),
        })
    }

    /// Names of every character an owner has, oldest first
    pub async fn names(&self, owner_id: &str) -> Result<Vec<String>, CharacterError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM characters WHERE owner_id = ? ORDER BY id")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(n,)| n).collect())
    }

    /// Get an owner's character by name
    pub async fn get(&self, owner_id: &str, name: &str) -> Result<Option<Character>, CharacterError> {
        let row: Option<CharacterRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, name, created, level, initiative,
                strength, dexterity, constitution, intelligence, wisdom, charisma,
                proficiencies, race, class, portrait
            FROM characters WHERE owner_id = ? AND name = ?
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CharacterRow::into_character).transpose()
    }

    /// Get an owner's character by name, failing when it does not exist
    pub async fn require(&self, owner_id: &str, name: &str) -> Result<Character, CharacterError> {
        self.get(owner_id, name)
            .await?
            .ok_or_else(|| CharacterError::NotFound(name.to_string()))
    }

    /// Delete a character (and, through the foreign key, its attacks)
    pub async fn delete(&self, owner_id: &str, name: &str) -> Result<bool, CharacterError> {
        let result = sqlx::query("DELETE FROM characters WHERE owner_id = ? AND name = ?")
            .bind(owner_id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted character '{}' for owner {}", name, owner_id);
        }
        Ok(deleted)
    }
}

fn encode_skills(skills: &[Skill]) -> String {
    skills.iter().map(|s| s.key()).collect::<Vec<_>>().join(",")
}

fn decode_skills(text: &str) -> Result<Vec<Skill>, CharacterError> {
    let mut skills = text
        .split(',')
        .filter(|k| !k.is_empty())
        .map(|k| Skill::from_key(k).ok_or_else(|| CharacterError::Corrupt(format!("skill {}", k))))
        .collect::<Result<Vec<_>, _>>()?;
    skills.sort();
    Ok(skills)
}

/// Row type for SQLite queries
#[derive(sqlx::FromRow)]
struct CharacterRow {
    id: i64,
    owner_id: String,
    name: String,
    created: String,
    level: i32,
    initiative: i32,
    strength: i32,
    dexterity: i32,
    constitution: i32,
    intelligence: i32,
    wisdom: i32,
    charisma: i32,
    proficiencies: String,
    race: Option<String>,
    class: Option<String>,
    portrait: String,
}

impl CharacterRow {
    fn into_character(self) -> Result<Character, CharacterError> {
        let created = chrono::NaiveDate::parse_from_str(&self.created, "%Y-%m-%d")
            .map_err(|e| CharacterError::Corrupt(format!("created date {}: {}", self.created, e)))?;

        Ok(Character {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            created,
            level: self.level,
            initiative: self.initiative,
            abilities: AbilityScores::new(
                self.strength,
                self.dexterity,
                self.constitution,
                self.intelligence,
                self.wisdom,
                self.charisma,
            ),
            proficiencies: decode_skills(&self.proficiencies)?,
            race: self.race,
            class: self.class,
            portrait: self.portrait,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_pool;

    fn sheet(name: &str) -> NewCharacter {
        NewCharacter {
            name: name.to_string(),
            level: 5,
            initiative: 1,
            abilities: AbilityScores::new(10, 14, 12, 16, 13, 8),
            proficiencies: Some("Arcana, History".to_string()),
            race: Some("Elf".to_string()),
            class: Some("Wizard".to_string()),
            portrait: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = CharacterStore::new(test_pool().await);

        let created = store.create("u1", &sheet("Elara"), 5).await.unwrap();
        assert!(created.requested_name.is_none());
        assert_eq!(created.character.portrait, DEFAULT_PORTRAIT_URL);

        let loaded = store.get("u1", "Elara").await.unwrap().unwrap();
        assert_eq!(loaded.id, created.character.id);
        assert_eq!(loaded.level, 5);
        assert_eq!(loaded.abilities.intelligence, 16);
        assert_eq!(loaded.proficiencies, vec![Skill::Arcana, Skill::History]);
        assert_eq!(loaded.summary(), "Level 5 Elf Wizard");
    }

    #[tokio::test]
    async fn test_duplicate_names_get_suffix() {
        let store = CharacterStore::new(test_pool().await);

        store.create("u1", &sheet("Bob"), 5).await.unwrap();
        let second = store.create("u1", &sheet("Bob"), 5).await.unwrap();
        let third = store.create("u1", &sheet("Bob"), 5).await.unwrap();

        assert_eq!(second.character.name, "Bob Jr.");
        assert_eq!(second.requested_name.as_deref(), Some("Bob"));
        assert_eq!(third.character.name, "Bob Jr. Jr.");

        // Another owner may reuse the name freely
        let other = store.create("u2", &sheet("Bob"), 5).await.unwrap();
        assert_eq!(other.character.name, "Bob");
    }

    #[tokio::test]
    async fn test_renamed_name_stays_within_limit() {
        let store = CharacterStore::new(test_pool().await);
        let long = "a".repeat(MAX_TEXT_LEN - 2);

        store.create("u1", &sheet(&long), 5).await.unwrap();
        let err = store.create("u1", &sheet(&long), 5).await.unwrap_err();
        assert!(matches!(err, CharacterError::InvalidField { field: "name", .. }));
        assert_eq!(store.names("u1").await.unwrap(), vec![long.clone()]);

        // exactly at the limit after renaming
        let fits = "b".repeat(MAX_TEXT_LEN - NEXT_OF_KIN_SUFFIX.len());
        store.create("u1", &sheet(&fits), 5).await.unwrap();
        let renamed = store.create("u1", &sheet(&fits), 5).await.unwrap();
        assert_eq!(renamed.character.name.chars().count(), MAX_TEXT_LEN);
    }

    #[tokio::test]
    async fn test_character_limit() {
        let store = CharacterStore::new(test_pool().await);

        for i in 0..2 {
            store.create("u1", &sheet(&format!("Hero {}", i)), 2).await.unwrap();
        }
        let err = store.create("u1", &sheet("One Too Many"), 2).await.unwrap_err();
        assert!(matches!(err, CharacterError::TooManyCharacters { max: 2 }));
        assert_eq!(store.names("u1").await.unwrap(), vec!["Hero 0", "Hero 1"]);
    }

    #[tokio::test]
    async fn test_invalid_sheet_not_stored() {
        let store = CharacterStore::new(test_pool().await);

        let mut bad = sheet("Broken");
        bad.proficiencies = Some("basket weaving".to_string());
        assert!(matches!(
            store.create("u1", &bad, 5).await,
            Err(CharacterError::UnknownSkill(_))
        ));
        assert!(store.names("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = CharacterStore::new(test_pool().await);

        store.create("u1", &sheet("Gone"), 5).await.unwrap();
        assert!(store.delete("u1", "Gone").await.unwrap());
        assert!(!store.delete("u1", "Gone").await.unwrap());
        assert!(matches!(
            store.require("u1", "Gone").await,
            Err(CharacterError::NotFound(_))
        ));
    }
}
