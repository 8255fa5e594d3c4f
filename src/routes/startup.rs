use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateDeal, Role, UpdateDeal, UpdateStartupProfile};
use crate::routes::auth::AuthUser;
use crate::routes::envelope::{
    collection, deal_document, investment_document, meeting_document, plain_document, user_document,
    Envelope,
};
use crate::services::{dashboard_service, deal_service, investment_service, meeting_service, profile_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/profile/", get(get_profile).put(update_profile))
        .route("/:id/deals/", get(list_deals).post(create_deal))
        .route("/:id/deals/:deal_id/", get(get_deal).put(update_deal).delete(delete_deal))
        .route("/:id/investments/", get(list_investments))
        .route("/:id/meetings/", get(list_meetings))
        .route("/:id/dashboard/", get(dashboard))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("GET /api/startup/{}/profile - Fetching profile", id);
    let user = profile_service::get_profile(state.store.as_ref(), id, Role::Startup).await?;
    Ok(Json(user_document(&user)?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<Envelope<UpdateStartupProfile>>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("PUT /api/startup/{}/profile - Updating profile", id);
    let user = profile_service::update_startup_profile(state.store.as_ref(), id, body.into_inner())
        .await
        .map_err(|e| {
            error!("Failed to update startup {} profile: {}", id, e);
            e
        })?;
    Ok(Json(user_document(&user)?))
}

pub async fn list_deals(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("GET /api/startup/{}/deals - Listing deals", id);
    let deals = deal_service::list_for_startup(state.store.as_ref(), id).await?;
    collection(&deals, deal_document)
}

pub async fn create_deal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<Envelope<CreateDeal>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("POST /api/startup/{}/deals - Creating deal", id);
    let deal = deal_service::create(state.store.as_ref(), id, body.into_inner())
        .await
        .map_err(|e| {
            error!("Failed to create deal for startup {}: {}", id, e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(deal_document(&deal)?)))
}

pub async fn get_deal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, deal_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("GET /api/startup/{}/deals/{} - Fetching deal", id, deal_id);
    let deal = deal_service::fetch_for_startup(state.store.as_ref(), id, deal_id).await?;
    Ok(Json(deal_document(&deal)?))
}

pub async fn update_deal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, deal_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<Envelope<UpdateDeal>>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("PUT /api/startup/{}/deals/{} - Updating deal", id, deal_id);
    let deal = deal_service::update(state.store.as_ref(), id, deal_id, body.into_inner())
        .await
        .map_err(|e| {
            error!("Failed to update deal {}: {}", deal_id, e);
            e
        })?;
    Ok(Json(deal_document(&deal)?))
}

pub async fn delete_deal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, deal_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("DELETE /api/startup/{}/deals/{} - Deleting deal", id, deal_id);
    deal_service::delete_for_startup(state.store.as_ref(), id, deal_id)
        .await
        .map_err(|e| {
            error!("Failed to delete deal {}: {}", deal_id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_investments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("GET /api/startup/{}/investments - Listing investments", id);
    let investments = investment_service::list_for_startup(state.store.as_ref(), id).await?;
    collection(&investments, investment_document)
}

pub async fn list_meetings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("GET /api/startup/{}/meetings - Listing meetings", id);
    let meetings = meeting_service::list_for_startup(state.store.as_ref(), id).await?;
    collection(&meetings, meeting_document)
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Startup, id)?;
    info!("GET /api/startup/{}/dashboard - Building dashboard", id);
    let dashboard = dashboard_service::startup(state.store.as_ref(), id).await.map_err(|e| {
        error!("Failed to build startup {} dashboard: {}", id, e);
        e
    })?;
    Ok(Json(plain_document(&dashboard)?))
}
