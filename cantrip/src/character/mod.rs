//! Character sheets
//!
//! Provides:
//! - Ability scores and the derived modifier / proficiency arithmetic
//! - Skill proficiencies parsed from free-form user text
//! - Validation of new character sheets
//! - Persistence via [`CharacterStore`]

mod store;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use store::{CharacterStore, CreatedCharacter};

/// Portrait used when a sheet is created without one
pub const DEFAULT_PORTRAIT_URL: &str =
    "https://bitbucket.org/comp-350-2/cantrip-discord-bot/raw/947ae7ddbb6e2396ee55864c991e5a2935331ee6/assets/default_portrait.png";

/// Longest accepted free-text field
pub const MAX_TEXT_LEN: usize = 255;

/// Character sheet errors
#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("you can only have {max} characters saved at a time")]
    TooManyCharacters { max: usize },

    #[error("you do not have a character named \"{0}\"")]
    NotFound(String),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown skill \"{0}\"")]
    UnknownSkill(String),

    #[error("stored character is corrupt: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    /// Abilities an attack can be keyed off. Constitution never drives an attack or save DC.
    pub const ATTACK_ATTRIBUTES: [Ability; 5] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    /// Whether this ability may be chosen as an attack attribute
    pub fn is_attack_attribute(&self) -> bool {
        *self != Ability::Constitution
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Ability {
    type Err = String;

    /// Accepts full names or abbreviations, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ability::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s) || a.abbreviation().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown ability: {}", s))
    }
}

/// Ability modifier for a raw score: floor((score - 10) / 2)
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// Proficiency bonus for a level; 0 for levels below 1
pub fn proficiency_bonus(level: i32) -> i32 {
    if level >= 1 {
        (level - 1) / 4 + 2
    } else {
        0
    }
}

/// Raw ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    pub fn new(
        strength: i32,
        dexterity: i32,
        constitution: i32,
        intelligence: i32,
        wisdom: i32,
        charisma: i32,
    ) -> Self {
        Self {
            strength,
            dexterity,
            constitution,
            intelligence,
            wisdom,
            charisma,
        }
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// The read-only numbers an attack resolution needs from a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterAbilityBlock {
    pub level: i32,
    pub scores: AbilityScores,
}

impl CharacterAbilityBlock {
    pub fn new(level: i32, scores: AbilityScores) -> Self {
        Self { level, scores }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        self.scores.modifier(ability)
    }

    pub fn proficiency_bonus(&self) -> i32 {
        proficiency_bonus(self.level)
    }
}

/// Skills a character can be proficient in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    Acrobatics,
    AnimalHandling,
    Arcana,
    Athletics,
    Deception,
    History,
    Insight,
    Intimidation,
    Investigation,
    Medicine,
    Nature,
    Perception,
    Performance,
    Persuasion,
    Religion,
    SleightOfHand,
    Stealth,
    Survival,
}

impl Skill {
    /// All skills in canonical (alphabetical) order
    pub const ALL: [Skill; 18] = [
        Skill::Acrobatics,
        Skill::AnimalHandling,
        Skill::Arcana,
        Skill::Athletics,
        Skill::Deception,
        Skill::History,
        Skill::Insight,
        Skill::Intimidation,
        Skill::Investigation,
        Skill::Medicine,
        Skill::Nature,
        Skill::Perception,
        Skill::Performance,
        Skill::Persuasion,
        Skill::Religion,
        Skill::SleightOfHand,
        Skill::Stealth,
        Skill::Survival,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Acrobatics => "Acrobatics",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Arcana => "Arcana",
            Skill::Athletics => "Athletics",
            Skill::Deception => "Deception",
            Skill::History => "History",
            Skill::Insight => "Insight",
            Skill::Intimidation => "Intimidation",
            Skill::Investigation => "Investigation",
            Skill::Medicine => "Medicine",
            Skill::Nature => "Nature",
            Skill::Perception => "Perception",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
            Skill::Religion => "Religion",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Survival => "Survival",
        }
    }

    /// Lowercase name without spaces, as stored
    pub fn key(&self) -> String {
        self.name().to_lowercase().replace(' ', "")
    }

    pub fn from_key(key: &str) -> Option<Skill> {
        Skill::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything except letters and commas
static NON_SKILL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z,]").expect("skill regex is valid"));

/// Parse "Acrobatics, animal handling" style input into canonical, de-duplicated skills
pub fn parse_proficiencies(text: &str) -> Result<Vec<Skill>, CharacterError> {
    let lowered = text.to_lowercase();
    let cleaned = NON_SKILL_CHARS.replace_all(&lowered, "");

    let mut skills = Vec::new();
    for key in cleaned.split(',').filter(|k| !k.is_empty()) {
        let skill = Skill::from_key(key).ok_or_else(|| CharacterError::UnknownSkill(key.to_string()))?;
        skills.push(skill);
    }
    skills.sort();
    skills.dedup();
    Ok(skills)
}

/// Render skills as "Acrobatics, Animal Handling"
pub fn format_proficiencies(skills: &[Skill]) -> String {
    skills.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
}

/// A request to create a character sheet
#[derive(Debug, Clone, Deserialize)]
pub struct NewCharacter {
    pub name: String,
    pub level: i32,
    pub initiative: i32,
    pub abilities: AbilityScores,
    /// Comma separated skill names
    #[serde(default)]
    pub proficiencies: Option<String>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub portrait: Option<String>,
}

impl NewCharacter {
    /// Check field ranges and parse proficiencies
    pub fn validate(&self) -> Result<Vec<Skill>, CharacterError> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_TEXT_LEN {
            return Err(invalid("name", format!("must be 1 to {} characters", MAX_TEXT_LEN)));
        }
        check_range("level", self.level, 1, 20)?;
        check_range("initiative", self.initiative, -20, 20)?;
        for ability in Ability::ALL {
            let field = match ability {
                Ability::Strength => "strength",
                Ability::Dexterity => "dexterity",
                Ability::Constitution => "constitution",
                Ability::Intelligence => "intelligence",
                Ability::Wisdom => "wisdom",
                Ability::Charisma => "charisma",
            };
            check_range(field, self.abilities.get(ability), 1, 30)?;
        }
        for (field, value) in [
            ("race", &self.race),
            ("class", &self.class),
            ("portrait", &self.portrait),
        ] {
            if value.as_ref().is_some_and(|v| v.chars().count() > MAX_TEXT_LEN) {
                return Err(invalid(field, format!("must be at most {} characters", MAX_TEXT_LEN)));
            }
        }

        match &self.proficiencies {
            Some(text) => parse_proficiencies(text),
            None => Ok(Vec::new()),
        }
    }
}

fn invalid(field: &'static str, reason: String) -> CharacterError {
    CharacterError::InvalidField { field, reason }
}

fn check_range(field: &'static str, value: i32, min: i32, max: i32) -> Result<(), CharacterError> {
    if value < min || value > max {
        return Err(invalid(field, format!("{} is outside {}..={}", value, min, max)));
    }
    Ok(())
}

/// A stored character sheet
#[derive(Debug, Clone, Serialize)]
pub struct Character {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    pub created: chrono::NaiveDate,
    pub level: i32,
    pub initiative: i32,
    pub abilities: AbilityScores,
    pub proficiencies: Vec<Skill>,
    pub race: Option<String>,
    pub class: Option<String>,
    pub portrait: String,
}

impl Character {
    pub fn ability_block(&self) -> CharacterAbilityBlock {
        CharacterAbilityBlock::new(self.level, self.abilities)
    }

    /// "Level 3 Elf Wizard"
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("Level {}", self.level)];
        parts.extend(self.race.iter().cloned());
        parts.extend(self.class.iter().cloned());
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(20), 5);
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(30), 10);
    }

    #[test]
    fn test_proficiency_bonus() {
        assert_eq!(proficiency_bonus(1), 2);
        assert_eq!(proficiency_bonus(4), 2);
        assert_eq!(proficiency_bonus(5), 3);
        assert_eq!(proficiency_bonus(9), 4);
        assert_eq!(proficiency_bonus(17), 6);
        assert_eq!(proficiency_bonus(20), 6);
        assert_eq!(proficiency_bonus(0), 0);
        assert_eq!(proficiency_bonus(-3), 0);
    }

    #[test]
    fn test_ability_parsing() {
        assert_eq!("strength".parse::<Ability>(), Ok(Ability::Strength));
        assert_eq!("WIS".parse::<Ability>(), Ok(Ability::Wisdom));
        assert_eq!(" Charisma ".parse::<Ability>(), Ok(Ability::Charisma));
        assert!("luck".parse::<Ability>().is_err());
    }

    #[test]
    fn test_attack_attributes_exclude_constitution() {
        assert_eq!(Ability::ATTACK_ATTRIBUTES.len(), 5);
        assert!(!Ability::ATTACK_ATTRIBUTES.contains(&Ability::Constitution));
        assert!(!Ability::Constitution.is_attack_attribute());
        assert!(Ability::Dexterity.is_attack_attribute());
    }

    #[test]
    fn test_parse_proficiencies() {
        let skills = parse_proficiencies("Stealth, Animal Handling,  sleight of hand!,").unwrap();
        assert_eq!(
            skills,
            vec![Skill::AnimalHandling, Skill::SleightOfHand, Skill::Stealth]
        );
        assert_eq!(
            format_proficiencies(&skills),
            "Animal Handling, Sleight of Hand, Stealth"
        );
    }

    #[test]
    fn test_parse_proficiencies_dedup_and_unknown() {
        assert_eq!(
            parse_proficiencies("arcana, Arcana").unwrap(),
            vec![Skill::Arcana]
        );
        assert!(matches!(
            parse_proficiencies("arcana, juggling"),
            Err(CharacterError::UnknownSkill(k)) if k == "juggling"
        ));
        assert!(parse_proficiencies("").unwrap().is_empty());
    }

    #[test]
    fn test_skill_keys_round_trip() {
        for skill in Skill::ALL {
            assert_eq!(Skill::from_key(&skill.key()), Some(skill));
        }
    }

    fn sheet() -> NewCharacter {
        NewCharacter {
            name: "Thorin".to_string(),
            level: 3,
            initiative: 2,
            abilities: AbilityScores::new(16, 12, 14, 8, 10, 13),
            proficiencies: Some("Athletics".to_string()),
            race: Some("Dwarf".to_string()),
            class: Some("Fighter".to_string()),
            portrait: None,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(sheet().validate().unwrap(), vec![Skill::Athletics]);
    }

    #[test]
    fn test_validate_ranges() {
        let mut c = sheet();
        c.level = 21;
        assert!(matches!(
            c.validate(),
            Err(CharacterError::InvalidField { field: "level", .. })
        ));

        let mut c = sheet();
        c.abilities.wisdom = 0;
        assert!(matches!(
            c.validate(),
            Err(CharacterError::InvalidField { field: "wisdom", .. })
        ));

        let mut c = sheet();
        c.name = "   ".to_string();
        assert!(matches!(
            c.validate(),
            Err(CharacterError::InvalidField { field: "name", .. })
        ));

        let mut c = sheet();
        c.race = Some("x".repeat(256));
        assert!(matches!(
            c.validate(),
            Err(CharacterError::InvalidField { field: "race", .. })
        ));
    }

    #[test]
    fn test_ability_block() {
        let block = CharacterAbilityBlock::new(5, AbilityScores::new(16, 12, 14, 8, 10, 13));
        assert_eq!(block.modifier(Ability::Strength), 3);
        assert_eq!(block.modifier(Ability::Intelligence), -1);
        assert_eq!(block.proficiency_bonus(), 3);
    }
}
