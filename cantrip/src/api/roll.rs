//! Dice rolling endpoint

use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::{error_response, AppState};
use crate::dice::{format_batch, roll_batch, DiceParseError, RollResult};

/// Build roll router
pub fn router() -> Router<AppState> {
    Router::new().route("/roll", post(roll))
}

/// Roll request: one or more comma-separated dice expressions
#[derive(Debug, Deserialize)]
pub struct RollRequest {
    pub dice: String,
}

/// Outcome of one expression in the batch
#[derive(Debug, Serialize)]
pub struct RollEntry {
    pub line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RollResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DiceParseError>,
}

#[derive(Debug, Serialize)]
pub struct RollResponse {
    pub results: Vec<RollEntry>,
    /// Every line joined, as the chat front-end would post it
    pub text: String,
}

async fn roll(Json(req): Json<RollRequest>) -> impl IntoResponse {
    if req.dice.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no dice to roll");
    }

    let outcomes = {
        let mut rng = rand::rng();
        roll_batch(&req.dice, &mut rng)
    };
    let text = format_batch(&outcomes);

    let results = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(result) => RollEntry {
                line: result.to_string(),
                result: Some(result),
                error: None,
            },
            Err(e) => RollEntry {
                line: e.to_string(),
                result: None,
                error: Some(e),
            },
        })
        .collect();

    (StatusCode::OK, Json(RollResponse { results, text })).into_response()
}
