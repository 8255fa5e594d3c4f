pub mod admin_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod dataroom_service;
pub mod deal_service;
pub mod investment_service;
pub mod ledger;
pub mod meeting_service;
pub mod notification_service;
pub mod profile_service;
pub mod throttle;
