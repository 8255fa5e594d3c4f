use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::Role;
use crate::routes::auth::AuthUser;
use crate::routes::envelope::{user_document, Envelope};
use crate::services::auth_service;
use crate::state::AppState;

/// Mounted at the top level (not nested) so both `/api/auths` and
/// `/api/auths/` resolve.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auths", post(sign_in).put(assign_role))
        .route("/api/auths/", post(sign_in).put(assign_role))
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub full_url: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

fn parse_role(raw: Option<&str>) -> Result<Option<Role>, AppError> {
    raw.map(str::parse::<Role>).transpose()
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<Envelope<SignInRequest>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("POST /api/auths - SSO sign-in");
    let input = body.into_inner();
    let full_url = input
        .full_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Full URL is required".into()))?;
    let role = parse_role(input.role.as_deref())?;

    let signed = auth_service::sign_in(
        state.store.as_ref(),
        state.identity.as_ref(),
        &state.tokens,
        &state.admins,
        &full_url,
        role,
    )
    .await
    .map_err(|e| {
        error!("Sign-in failed: {}", e);
        e
    })?;

    let mut doc = user_document(&signed.user)?;
    doc["meta"] = json!({
        "access_token": signed.token.access_token,
        "token_type": signed.token.token_type,
        "expires_in": signed.token.expires_in,
        "created": signed.created,
    });
    let status = if signed.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(doc)))
}

pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<Envelope<AssignRoleRequest>>,
) -> Result<Json<Value>, AppError> {
    info!("PUT /api/auths - Assigning role for user {}", auth.id());
    let role: Role = body.into_inner().role.parse()?;
    let user = auth_service::assign_role(state.store.as_ref(), &state.admins, auth.id(), role)
        .await
        .map_err(|e| {
            error!("Failed to assign role to user {}: {}", auth.id(), e);
            e
        })?;

    // the old token still names the previous role
    let token = state.tokens.issue(&user, chrono::Utc::now())?;
    let mut doc = user_document(&user)?;
    doc["meta"] = json!({
        "access_token": token.access_token,
        "token_type": token.token_type,
        "expires_in": token.expires_in,
        "created": false,
    });
    Ok(Json(doc))
}
