use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateInvestment, Role, ScheduleMeeting, UpdateInvestorProfile};
use crate::routes::auth::AuthUser;
use crate::routes::envelope::{
    collection, deal_document, investment_document, meeting_document, plain_document, user_document,
    Envelope,
};
use crate::services::throttle::ThrottleScope;
use crate::services::{
    dashboard_service, dataroom_service, deal_service, investment_service, meeting_service, profile_service,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/profile/", get(get_profile).put(update_profile))
        .route("/:id/deals/", get(list_deals))
        .route("/:id/deals/:deal_id/request-dataroom/", post(request_dataroom))
        .route("/:id/investments/", get(list_investments))
        .route("/:id/investments/:deal_id/", post(create_investment))
        .route("/:id/investment/:investment_id/", get(get_investment))
        .route("/:id/schedule-meeting/:startup_id/", post(schedule_meeting))
        .route("/:id/meetings/", get(list_meetings))
        .route("/:id/dashboard/", get(dashboard))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("GET /api/investor/{}/profile - Fetching profile", id);
    let user = profile_service::get_profile(state.store.as_ref(), id, Role::Investor).await?;
    Ok(Json(user_document(&user)?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<Envelope<UpdateInvestorProfile>>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("PUT /api/investor/{}/profile - Updating profile", id);
    let user = profile_service::update_investor_profile(state.store.as_ref(), id, body.into_inner())
        .await
        .map_err(|e| {
            error!("Failed to update investor {} profile: {}", id, e);
            e
        })?;
    Ok(Json(user_document(&user)?))
}

pub async fn list_deals(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("GET /api/investor/{}/deals - Listing approved deals", id);
    let deals = deal_service::list_approved(state.store.as_ref()).await?;
    collection(&deals, deal_document)
}

pub async fn request_dataroom(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, deal_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("POST /api/investor/{}/deals/{}/request-dataroom - Requesting dataroom", id, deal_id);
    state.throttles.acquire(ThrottleScope::Dataroom, id, Utc::now())?;
    let outcome = dataroom_service::request_access(state.store.as_ref(), state.notifier.as_ref(), id, deal_id)
        .await
        .map_err(|e| {
            error!("Dataroom request by investor {} for deal {} failed: {}", id, deal_id, e);
            e
        })?;
    Ok(Json(plain_document(&outcome)?))
}

pub async fn list_investments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("GET /api/investor/{}/investments - Listing investments", id);
    let investments = investment_service::list_for_investor(state.store.as_ref(), id).await?;
    collection(&investments, investment_document)
}

pub async fn create_investment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, deal_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<Envelope<CreateInvestment>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("POST /api/investor/{}/investments/{} - Creating investment", id, deal_id);
    let investment = investment_service::invest(
        state.store.as_ref(),
        state.notifier.as_ref(),
        &state.fee_rate,
        id,
        deal_id,
        body.into_inner(),
    )
    .await
    .map_err(|e| {
        error!("Investment by {} in deal {} failed: {}", id, deal_id, e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(investment_document(&investment)?)))
}

pub async fn get_investment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, investment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("GET /api/investor/{}/investment/{} - Fetching investment", id, investment_id);
    let investment = investment_service::fetch_for_investor(state.store.as_ref(), id, investment_id).await?;
    Ok(Json(investment_document(&investment)?))
}

pub async fn schedule_meeting(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, startup_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<Envelope<ScheduleMeeting>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("POST /api/investor/{}/schedule-meeting/{} - Scheduling meeting", id, startup_id);
    state.throttles.acquire(ThrottleScope::Meeting, id, Utc::now())?;
    let meeting = meeting_service::schedule(
        state.store.as_ref(),
        state.calendar_booking(),
        id,
        startup_id,
        body.into_inner(),
    )
    .await
    .map_err(|e| {
        error!("Meeting between investor {} and startup {} not scheduled: {}", id, startup_id, e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(meeting_document(&meeting)?)))
}

pub async fn list_meetings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("GET /api/investor/{}/meetings - Listing meetings", id);
    let meetings = meeting_service::list_for_investor(state.store.as_ref(), id).await?;
    collection(&meetings, meeting_document)
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_self(Role::Investor, id)?;
    info!("GET /api/investor/{}/dashboard - Building dashboard", id);
    let dashboard = dashboard_service::investor(state.store.as_ref(), id).await.map_err(|e| {
        error!("Failed to build investor {} dashboard: {}", id, e);
        e
    })?;
    Ok(Json(plain_document(&dashboard)?))
}
