//! Character sheet and saved attack endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{attack_error, character_error, error_response, AppState};
use crate::attack::AttackDefinition;
use crate::character::{Character, NewCharacter};

/// Build characters router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/characters", post(create_character))
        .route("/characters/{owner}", get(list_characters))
        .route(
            "/characters/{owner}/{name}",
            get(get_character).delete(delete_character),
        )
        .route("/characters/{owner}/{name}/attacks", get(list_attacks))
        .route(
            "/characters/{owner}/{name}/attacks/{attack}",
            axum::routing::delete(delete_attack),
        )
}

/// Character creation request
#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    pub owner_id: String,
    #[serde(flatten)]
    pub character: NewCharacter,
}

#[derive(Debug, Serialize)]
pub struct CreateCharacterResponse {
    pub character: Character,
    /// Set when the requested name was taken and the character was renamed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CharacterView {
    pub summary: String,
    #[serde(flatten)]
    pub character: Character,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Create a character sheet
async fn create_character(
    State(state): State<AppState>,
    Json(req): Json<CreateCharacterRequest>,
) -> impl IntoResponse {
    match state
        .characters
        .create(&req.owner_id, &req.character, state.config.max_characters)
        .await
    {
        Ok(created) => (
            StatusCode::CREATED,
            Json(CreateCharacterResponse {
                character: created.character,
                renamed_from: created.requested_name,
            }),
        )
            .into_response(),
        Err(e) => character_error(e),
    }
}

/// Names of an owner's characters
async fn list_characters(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> impl IntoResponse {
    match state.characters.names(&owner).await {
        Ok(names) => (StatusCode::OK, Json(names)).into_response(),
        Err(e) => character_error(e),
    }
}

/// One character sheet
async fn get_character(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.characters.require(&owner, &name).await {
        Ok(character) => (
            StatusCode::OK,
            Json(CharacterView {
                summary: character.summary(),
                character,
            }),
        )
            .into_response(),
        Err(e) => character_error(e),
    }
}

/// Delete a character and every attack it owns
async fn delete_character(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.characters.delete(&owner, &name).await {
        Ok(true) => (StatusCode::OK, Json(DeletedResponse { deleted: true })).into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            format!("you do not have a character named \"{}\"", name),
        ),
        Err(e) => character_error(e),
    }
}

/// Saved attacks of a character
async fn list_attacks(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let character = match state.characters.require(&owner, &name).await {
        Ok(c) => c,
        Err(e) => return character_error(e),
    };

    match state.attacks.list(character.id).await {
        Ok(attacks) => (StatusCode::OK, Json::<Vec<AttackDefinition>>(attacks)).into_response(),
        Err(e) => attack_error(e),
    }
}

/// Delete one saved attack
async fn delete_attack(
    State(state): State<AppState>,
    Path((owner, name, attack)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let character = match state.characters.require(&owner, &name).await {
        Ok(c) => c,
        Err(e) => return character_error(e),
    };

    match state.attacks.delete(character.id, &attack).await {
        Ok(true) => (StatusCode::OK, Json(DeletedResponse { deleted: true })).into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            format!("no attack named \"{}\"", attack),
        ),
        Err(e) => attack_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{send, test_app};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn sheet(owner: &str, name: &str) -> Value {
        json!({
            "owner_id": owner,
            "name": name,
            "level": 3,
            "initiative": 2,
            "abilities": {
                "strength": 8, "dexterity": 14, "constitution": 12,
                "intelligence": 16, "wisdom": 10, "charisma": 10
            },
            "proficiencies": "Arcana, history",
            "race": "Elf",
            "class": "Wizard"
        })
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let app = test_app().await;

        let (status, body) = send(&app, "POST", "/characters", Some(sheet("u1", "Elara"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["character"]["name"], "Elara");
        assert!(body.get("renamed_from").is_none());

        let (status, body) = send(&app, "GET", "/characters/u1/Elara", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Level 3 Elf Wizard");
        assert_eq!(body["proficiencies"].as_array().unwrap().len(), 2);

        let (_, body) = send(&app, "GET", "/characters/u1", None).await;
        assert_eq!(body, json!(["Elara"]));
    }

    #[tokio::test]
    async fn test_duplicate_name_renamed() {
        let app = test_app().await;
        send(&app, "POST", "/characters", Some(sheet("u1", "Bob"))).await;

        let (status, body) = send(&app, "POST", "/characters", Some(sheet("u1", "Bob"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["character"]["name"], "Bob Jr.");
        assert_eq!(body["renamed_from"], "Bob");
    }

    #[tokio::test]
    async fn test_invalid_sheet() {
        let app = test_app().await;
        let mut bad = sheet("u1", "Bob");
        bad["level"] = json!(21);

        let (status, body) = send(&app, "POST", "/characters", Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("level"));
    }

    #[tokio::test]
    async fn test_delete_character() {
        let app = test_app().await;
        send(&app, "POST", "/characters", Some(sheet("u1", "Bob"))).await;

        let (status, _) = send(&app, "DELETE", "/characters/u1/Bob", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", "/characters/u1/Bob", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/characters/u1/Bob", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_attacks_of_missing_character() {
        let app = test_app().await;
        let (status, _) = send(&app, "GET", "/characters/u1/Nobody/attacks", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
