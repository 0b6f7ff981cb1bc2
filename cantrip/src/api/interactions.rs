//! Attack wizard and attack resolution endpoints
//!
//! Each interaction lives in the session manager until it finishes or
//! expires. Only the user that started an interaction may advance it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{attack_error, character_error, error_response, interaction_error, AppState};
use crate::attack::{
    AttackDefinition, AttackError, AttackWizard, ResolutionEvent, ResolutionStep, WizardEvent,
    WizardStep,
};
use crate::session::InteractionKind;

/// Build interactions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wizards", post(start_wizard))
        .route(
            "/wizards/{id}",
            get(wizard_status).post(advance_wizard).delete(cancel_wizard),
        )
        .route("/resolutions", post(start_resolution))
        .route(
            "/resolutions/{id}",
            post(advance_resolution).delete(cancel_resolution),
        )
}

/// Identifies the caller on reads and cancellations
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

/// Start creating an attack for one of the owner's characters
#[derive(Debug, Deserialize)]
pub struct StartWizardRequest {
    pub owner_id: String,
    pub character: String,
    pub attack: String,
}

#[derive(Debug, Deserialize)]
pub struct WizardEventRequest {
    pub owner_id: String,
    pub event: WizardEvent,
}

#[derive(Debug, Serialize)]
pub struct WizardResponse {
    pub id: Uuid,
    pub step: WizardStep,
    pub prompt: &'static str,
    /// The saved attack, once the wizard completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackDefinition>,
}

/// Use one of the owner's saved attacks
#[derive(Debug, Deserialize)]
pub struct StartResolutionRequest {
    pub owner_id: String,
    pub character: String,
    pub attack: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolutionEventRequest {
    pub owner_id: String,
    pub event: ResolutionEvent,
}

#[derive(Debug, Serialize)]
pub struct ResolutionResponse {
    pub id: Uuid,
    pub step: ResolutionStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<&'static str>,
    pub transcript: Vec<String>,
}

async fn start_wizard(
    State(state): State<AppState>,
    Json(req): Json<StartWizardRequest>,
) -> impl IntoResponse {
    let character = match state.characters.require(&req.owner_id, &req.character).await {
        Ok(c) => c,
        Err(e) => return character_error(e),
    };

    match state.attacks.get(character.id, req.attack.trim()).await {
        Ok(None) => {}
        Ok(Some(existing)) => return attack_error(AttackError::Exists(existing.name)),
        Err(e) => return attack_error(e),
    }

    let wizard = match AttackWizard::start(character.id, &req.attack) {
        Ok(w) => w,
        Err(e) => return interaction_error(e),
    };

    let step = wizard.step();
    let id = state.sessions.start_wizard(&req.owner_id, wizard).await;

    (
        StatusCode::CREATED,
        Json(WizardResponse {
            id,
            step,
            prompt: step.prompt(),
            attack: None,
        }),
    )
        .into_response()
}

async fn advance_wizard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<WizardEventRequest>,
) -> impl IntoResponse {
    let progress = match state.sessions.advance_wizard(id, &req.owner_id, req.event).await {
        Ok(p) => p,
        Err(e) => return interaction_error(e),
    };

    // The wizard stays registered until the attack is stored, so a failed
    // save sends it back to its last step instead of losing the selections
    if let Some(definition) = &progress.definition {
        if let Err(e) = state.attacks.create(definition).await {
            if let Err(reopen) = state.sessions.reopen_wizard(id, &req.owner_id).await {
                warn!("Could not reopen wizard {}: {}", id, reopen);
            }
            return attack_error(e);
        }
        if let Err(e) = state.sessions.finish_wizard(id, &req.owner_id).await {
            warn!("Could not finish wizard {}: {}", id, e);
        }
        info!(
            "Attack '{}' saved for character {}",
            definition.name, definition.character_id
        );
    }

    (
        StatusCode::OK,
        Json(WizardResponse {
            id,
            step: progress.step,
            prompt: progress.step.prompt(),
            attack: progress.definition,
        }),
    )
        .into_response()
}

/// Where a wizard currently stands
async fn wizard_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> impl IntoResponse {
    match state.sessions.wizard_step(id, &query.owner_id).await {
        Ok(step) => (
            StatusCode::OK,
            Json(WizardResponse {
                id,
                step,
                prompt: step.prompt(),
                attack: None,
            }),
        )
            .into_response(),
        Err(e) => interaction_error(e),
    }
}

/// Abandon a wizard
async fn cancel_wizard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> impl IntoResponse {
    cancel(&state, id, &query.owner_id, InteractionKind::Wizard).await
}

/// Abandon a resolution
async fn cancel_resolution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> impl IntoResponse {
    cancel(&state, id, &query.owner_id, InteractionKind::Resolution).await
}

async fn cancel(state: &AppState, id: Uuid, owner_id: &str, kind: InteractionKind) -> Response {
    match state.sessions.cancel(id, owner_id, kind).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => interaction_error(e),
    }
}

async fn start_resolution(
    State(state): State<AppState>,
    Json(req): Json<StartResolutionRequest>,
) -> impl IntoResponse {
    let character = match state.characters.require(&req.owner_id, &req.character).await {
        Ok(c) => c,
        Err(e) => return character_error(e),
    };

    let attack = match state.attacks.require(character.id, &req.attack).await {
        Ok(a) => a,
        Err(e) => return attack_error(e),
    };

    let (id, progress) = state
        .sessions
        .start_resolution(&req.owner_id, attack, character.ability_block())
        .await;

    (
        StatusCode::CREATED,
        Json(ResolutionResponse {
            id,
            step: progress.step,
            prompt: progress.step.prompt(),
            transcript: progress.transcript,
        }),
    )
        .into_response()
}

async fn advance_resolution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolutionEventRequest>,
) -> impl IntoResponse {
    match state.sessions.advance_resolution(id, &req.owner_id, req.event).await {
        Ok(progress) => (
            StatusCode::OK,
            Json(ResolutionResponse {
                id,
                step: progress.step,
                prompt: progress.step.prompt(),
                transcript: progress.transcript,
            }),
        )
            .into_response(),
        Err(e) => interaction_error(e),
    }
}
