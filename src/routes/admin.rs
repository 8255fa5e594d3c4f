use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{DealAction, Role};
use crate::routes::auth::AuthUser;
use crate::routes::envelope::{
    collection, deal_document, investment_document, meeting_document, plain_document, user_document,
    Envelope,
};
use crate::services::{admin_service, dashboard_service, deal_service, investment_service, meeting_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users))
        .route("/users/:id/", get(get_user).delete(delete_user))
        .route("/deals/", get(list_deals))
        .route("/:id/deals/", put(review_deal).delete(delete_deal))
        .route("/investments/", get(list_investments))
        .route("/:id/investments/", delete(delete_investment))
        .route("/meetings/", get(list_meetings))
        .route("/:id/meetings/", delete(delete_meeting))
        .route("/dashboard/", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub action: String,
}

pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, AppError> {
    auth.require_role(Role::Admin)?;
    info!("GET /api/admin/users - Listing users");
    let users = admin_service::list_users(state.store.as_ref()).await.map_err(|e| {
        error!("Failed to list users: {}", e);
        e
    })?;
    collection(&users, user_document)
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_role(Role::Admin)?;
    info!("GET /api/admin/users/{} - Fetching user", id);
    let user = admin_service::get_user(state.store.as_ref(), id).await.map_err(|e| {
        error!("Failed to fetch user {}: {}", id, e);
        e
    })?;
    Ok(Json(user_document(&user)?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;
    info!("DELETE /api/admin/users/{} - Deleting user", id);
    admin_service::delete_user(state.store.as_ref(), id).await.map_err(|e| {
        error!("Failed to delete user {}: {}", id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_deals(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, AppError> {
    auth.require_role(Role::Admin)?;
    info!("GET /api/admin/deals - Listing deals");
    let deals = deal_service::list_all(state.store.as_ref()).await.map_err(|e| {
        error!("Failed to list deals: {}", e);
        e
    })?;
    collection(&deals, deal_document)
}

pub async fn review_deal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(deal_id): Path<Uuid>,
    Json(body): Json<Envelope<ReviewRequest>>,
) -> Result<Json<Value>, AppError> {
    auth.require_role(Role::Admin)?;
    let action: DealAction = body.into_inner().action.parse()?;
    info!("PUT /api/admin/{}/deals - {:?}", deal_id, action);
    let deal = deal_service::review(state.store.as_ref(), state.notifier.as_ref(), deal_id, action)
        .await
        .map_err(|e| {
            error!("Failed to review deal {}: {}", deal_id, e);
            e
        })?;
    Ok(Json(deal_document(&deal)?))
}

pub async fn delete_deal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(deal_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;
    info!("DELETE /api/admin/{}/deals - Deleting deal", deal_id);
    deal_service::delete(state.store.as_ref(), deal_id).await.map_err(|e| {
        error!("Failed to delete deal {}: {}", deal_id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_investments(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, AppError> {
    auth.require_role(Role::Admin)?;
    info!("GET /api/admin/investments - Listing investments");
    let investments = investment_service::list_all(state.store.as_ref()).await.map_err(|e| {
        error!("Failed to list investments: {}", e);
        e
    })?;
    collection(&investments, investment_document)
}

pub async fn delete_investment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(investment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;
    info!("DELETE /api/admin/{}/investments - Deleting investment", investment_id);
    investment_service::delete(state.store.as_ref(), investment_id)
        .await
        .map_err(|e| {
            error!("Failed to delete investment {}: {}", investment_id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_meetings(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, AppError> {
    auth.require_role(Role::Admin)?;
    info!("GET /api/admin/meetings - Listing meetings");
    let meetings = meeting_service::list_all(state.store.as_ref()).await.map_err(|e| {
        error!("Failed to list meetings: {}", e);
        e
    })?;
    collection(&meetings, meeting_document)
}

pub async fn delete_meeting(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;
    info!("DELETE /api/admin/{}/meetings - Deleting meeting", meeting_id);
    meeting_service::delete(state.store.as_ref(), meeting_id).await.map_err(|e| {
        error!("Failed to delete meeting {}: {}", meeting_id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, AppError> {
    auth.require_role(Role::Admin)?;
    info!("GET /api/admin/dashboard - Building dashboard");
    let dashboard = dashboard_service::admin(state.store.as_ref()).await.map_err(|e| {
        error!("Failed to build admin dashboard: {}", e);
        e
    })?;
    Ok(Json(plain_document(&dashboard)?))
}
