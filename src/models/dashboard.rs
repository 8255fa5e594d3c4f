use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::models::{Deal, Investment, Meeting, UserView};

/// Platform-wide counters shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PlatformStatistics {
    pub total_users: i64,
    pub new_users_last_30_days: i64,
    pub total_deals: i64,
    pub active_deals: i64,
    pub pending_deals: i64,
    pub total_investments: i64,
    pub total_investment_amount: BigDecimal,
    pub total_meetings: i64,
    pub upcoming_meetings: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub statistics: PlatformStatistics,
    pub recent_users: Vec<UserView>,
    pub recent_deals: Vec<Deal>,
    pub recent_investments: Vec<Investment>,
    pub upcoming_meetings: Vec<Meeting>,
}

#[derive(Debug, Serialize)]
pub struct InvestorDashboard {
    pub profile: UserView,
    pub total_invested: BigDecimal,
    pub available_funds: BigDecimal,
    pub investment_count: usize,
    pub investments: Vec<Investment>,
    pub active_deals: Vec<Deal>,
    pub upcoming_meetings: Vec<Meeting>,
}

#[derive(Debug, Serialize)]
pub struct StartupDashboard {
    pub profile: UserView,
    pub total_raised: BigDecimal,
    pub fundraising_goal: BigDecimal,
    pub deal_count: usize,
    pub deals: Vec<Deal>,
    pub active_deals: Vec<Deal>,
    pub recent_investments: Vec<Investment>,
    pub upcoming_meetings: Vec<Meeting>,
}
