//! HTTP API module - dice, characters, attack wizards and resolutions

mod characters;
mod interactions;
mod roll;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::attack::{AttackError, AttackStore, InteractionError};
use crate::character::{CharacterError, CharacterStore};
use crate::config::Config;
use crate::db::Database;
use crate::session::InteractionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub characters: Arc<CharacterStore>,
    pub attacks: Arc<AttackStore>,
    pub sessions: Arc<InteractionManager>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        Self {
            characters: Arc::new(CharacterStore::new(db.pool().clone())),
            attacks: Arc::new(AttackStore::new(db.pool().clone())),
            sessions: InteractionManager::shared(),
            config: Arc::new(config),
            db,
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .merge(roll::router())
        .merge(characters::router())
        .merge(interactions::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Browser front-ends may be served from anywhere
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "cantrip",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "ok",
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                database: "error",
            }),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn character_error(e: CharacterError) -> Response {
    let status = match e {
        CharacterError::TooManyCharacters { .. } => StatusCode::CONFLICT,
        CharacterError::NotFound(_) => StatusCode::NOT_FOUND,
        CharacterError::InvalidField { .. } | CharacterError::UnknownSkill(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CharacterError::Corrupt(_) | CharacterError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e)
}

fn attack_error(e: AttackError) -> Response {
    let status = match e {
        AttackError::Exists(_) => StatusCode::CONFLICT,
        AttackError::NotFound(_) => StatusCode::NOT_FOUND,
        AttackError::Corrupt(_) | AttackError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

fn interaction_error(e: InteractionError) -> Response {
    let status = match e {
        InteractionError::NotFound(_) => StatusCode::NOT_FOUND,
        InteractionError::NotOwner => StatusCode::FORBIDDEN,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, e)
}
