pub mod user_queries;
pub mod deal_queries;
pub mod investment_queries;
pub mod meeting_queries;
pub mod statistics_queries;
