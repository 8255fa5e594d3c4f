use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::dashboard::{AdminDashboard, InvestorDashboard, StartupDashboard};
use crate::models::{DealStatus, Role, UserView};
use crate::services::profile_service;
use crate::store::{DealFilter, InvestmentFilter, MeetingFilter, Store};

const RECENT: usize = 5;

pub async fn admin(store: &dyn Store) -> Result<AdminDashboard, AppError> {
    let now = Utc::now();
    let statistics = store.platform_statistics(now).await?;

    let recent_users = store
        .list_users()
        .await?
        .iter()
        .take(RECENT)
        .map(UserView::from)
        .collect();
    let mut recent_deals = store.list_deals(DealFilter::default()).await?;
    recent_deals.truncate(RECENT);
    let mut recent_investments = store.list_investments(InvestmentFilter::default()).await?;
    recent_investments.truncate(RECENT);
    let mut upcoming_meetings = store
        .list_meetings(MeetingFilter {
            starting_after: Some(now),
            ..Default::default()
        })
        .await?;
    upcoming_meetings.truncate(RECENT);

    Ok(AdminDashboard {
        statistics,
        recent_users,
        recent_deals,
        recent_investments,
        upcoming_meetings,
    })
}

pub async fn investor(store: &dyn Store, investor_id: Uuid) -> Result<InvestorDashboard, AppError> {
    let user = profile_service::require(store, investor_id, Role::Investor).await?;
    let (total_invested, available_funds) = user
        .investor()
        .map(|acc| (acc.total_invested.clone(), acc.available_funds.clone()))
        .unwrap_or_else(|| (BigDecimal::zero(), BigDecimal::zero()));

    let investments = store
        .list_investments(InvestmentFilter {
            investor_id: Some(investor_id),
            ..Default::default()
        })
        .await?;
    let active_deals = store
        .list_deals(DealFilter {
            startup_id: None,
            status: Some(DealStatus::Approved),
        })
        .await?;
    let mut upcoming_meetings = store
        .list_meetings(MeetingFilter {
            investor_id: Some(investor_id),
            starting_after: Some(Utc::now()),
            ..Default::default()
        })
        .await?;
    upcoming_meetings.truncate(RECENT);

    Ok(InvestorDashboard {
        profile: UserView::from(&user),
        total_invested,
        available_funds,
        investment_count: investments.len(),
        investments,
        active_deals,
        upcoming_meetings,
    })
}

pub async fn startup(store: &dyn Store, startup_id: Uuid) -> Result<StartupDashboard, AppError> {
    let user = profile_service::require(store, startup_id, Role::Startup).await?;
    let (total_raised, fundraising_goal) = user
        .startup()
        .map(|acc| (acc.total_raised.clone(), acc.fundraising_goal.clone()))
        .unwrap_or_else(|| (BigDecimal::zero(), BigDecimal::zero()));

    let deals = store
        .list_deals(DealFilter {
            startup_id: Some(startup_id),
            status: None,
        })
        .await?;
    let active_deals = deals
        .iter()
        .filter(|d| d.status == DealStatus::Approved)
        .cloned()
        .collect();
    let mut recent_investments = store
        .list_investments(InvestmentFilter {
            startup_id: Some(startup_id),
            ..Default::default()
        })
        .await?;
    recent_investments.truncate(RECENT);
    let mut upcoming_meetings = store
        .list_meetings(MeetingFilter {
            startup_id: Some(startup_id),
            starting_after: Some(Utc::now()),
            ..Default::default()
        })
        .await?;
    upcoming_meetings.truncate(RECENT);

    Ok(StartupDashboard {
        profile: UserView::from(&user),
        total_raised,
        fundraising_goal,
        deal_count: deals.len(),
        deals,
        active_deals,
        recent_investments,
        upcoming_meetings,
    })
}
