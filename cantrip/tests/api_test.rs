//! End-to-end tests against a running server

mod common;

use std::time::Duration;

use cantrip::Config;
use common::CantripTest;
use serde_json::{json, Value};

#[tokio::test]
async fn test_server_starts_and_stops() {
    let cantrip = CantripTest::start().await.expect("Failed to start server");
    drop(cantrip);
}

#[tokio::test]
async fn test_health_endpoint() {
    let cantrip = CantripTest::start().await.expect("Failed to start server");

    let resp = cantrip.get("/health").await.expect("Failed to get health");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_roll_endpoint() {
    let cantrip = CantripTest::start().await.expect("Failed to start server");

    let resp = cantrip
        .post("/roll", &json!({"dice": "4d6, d20+5, 2x3"}))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    let rolls = results[0]["result"]["rolls"].as_array().unwrap();
    assert_eq!(rolls.len(), 4);
    assert!(rolls.iter().all(|r| (1..=6).contains(&r.as_u64().unwrap())));

    let total = results[1]["result"]["total"].as_i64().unwrap();
    assert!((6..=25).contains(&total));

    assert_eq!(results[2]["error"]["kind"], "syntax");
    assert!(body["text"]
        .as_str()
        .unwrap()
        .contains("Usage: /roll <number of dice>d<dice type>[+/-<modifier>]"));
}

#[tokio::test]
async fn test_character_limit() {
    let config = Config {
        max_characters: 2,
        ..Config::default()
    };
    let cantrip = CantripTest::start_with(config).await.unwrap();

    cantrip.create_character("u1", "A", 1).await.unwrap();
    cantrip.create_character("u1", "B", 1).await.unwrap();
    assert!(cantrip.create_character("u1", "C", 1).await.is_err());

    // the limit is per owner
    cantrip.create_character("u2", "C", 1).await.unwrap();

    let names: Vec<String> = cantrip.get("/characters/u1").await.unwrap().json().await.unwrap();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test]
async fn test_attack_roll_flow() {
    let cantrip = CantripTest::start().await.unwrap();
    cantrip.create_character("u1", "Brak", 1).await.unwrap();

    let last = cantrip
        .create_attack(
            "u1",
            "Brak",
            "Longsword",
            &[
                json!({"type": "roll_types", "selected": ["attack_roll"]}),
                json!({"type": "attribute", "ability": "Strength"}),
                json!({"type": "proficiency", "proficient": true}),
                json!({"type": "modifiers_and_damage", "modifier": 1, "damage": "1d8+2"}),
            ],
        )
        .await
        .unwrap();
    assert_eq!(last["step"], "complete");
    assert_eq!(last["attack"]["flat_modifier"], 1);

    let start: Value = cantrip
        .post(
            "/resolutions",
            &json!({"owner_id": "u1", "character": "Brak", "attack": "Longsword"}),
        )
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let uri = format!("/resolutions/{}", start["id"].as_str().unwrap());

    let rolled: Value = cantrip
        .post(&uri, &json!({"owner_id": "u1", "event": {"type": "roll"}}))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rolled["step"], "attack_roll_prompt");
    // STR 14 (+2), proficiency +2, flat +1
    assert!(rolled["transcript"][0]
        .as_str()
        .unwrap()
        .starts_with("Attack roll: You rolled 1d20+5: ["));

    // only the owner may answer
    let resp = cantrip
        .post(&uri, &json!({"owner_id": "u2", "event": {"type": "confirm", "yes": true}}))
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let hit: Value = cantrip
        .post(&uri, &json!({"owner_id": "u1", "event": {"type": "confirm", "yes": true}}))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hit["step"], "complete");
    let transcript = hit["transcript"].as_array().unwrap();
    assert_eq!(transcript.len(), 2);
    assert!(transcript[1]
        .as_str()
        .unwrap()
        .starts_with("Damage: You rolled 1d8+2: ["));
}

#[tokio::test]
async fn test_deleting_character_removes_attacks() {
    let cantrip = CantripTest::start().await.unwrap();
    cantrip.create_character("u1", "Vex", 3).await.unwrap();
    cantrip
        .create_attack(
            "u1",
            "Vex",
            "Vicious Mockery",
            &[
                json!({"type": "roll_types", "selected": ["neither"]}),
                json!({"type": "proficiency", "proficient": false}),
                json!({"type": "modifiers_and_damage", "damage": "1d4"}),
            ],
        )
        .await
        .unwrap();

    let resp = cantrip.delete("/characters/u1/Vex").await.unwrap();
    assert_eq!(resp.status(), 200);

    cantrip.create_character("u1", "Vex", 3).await.unwrap();
    let attacks: Vec<Value> = cantrip
        .get("/characters/u1/Vex/attacks")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(attacks.is_empty());
}

#[tokio::test]
async fn test_abandoned_interactions_expire() {
    let config = Config {
        interaction_timeout_secs: 0,
        sweep_interval_secs: 1,
        ..Config::default()
    };
    let cantrip = CantripTest::start_with(config).await.unwrap();
    cantrip.create_character("u1", "Ilsa", 1).await.unwrap();

    let body: Value = cantrip
        .post(
            "/wizards",
            &json!({"owner_id": "u1", "character": "Ilsa", "attack": "Dagger"}),
        )
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cantrip.server().sessions().is_empty().await);

    let resp = cantrip
        .post(
            &format!("/wizards/{}", id),
            &json!({"owner_id": "u1", "event": {"type": "roll_types", "selected": ["neither"]}}),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
