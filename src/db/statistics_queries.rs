use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::models::dashboard::PlatformStatistics;

pub async fn platform_statistics(pool: &PgPool, now: DateTime<Utc>) -> Result<PlatformStatistics, sqlx::Error> {
    sqlx::query_as::<_, PlatformStatistics>(
        "SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE created_at >= $1) AS new_users_last_30_days,
            (SELECT COUNT(*) FROM deals) AS total_deals,
            (SELECT COUNT(*) FROM deals WHERE status = 'approved') AS active_deals,
            (SELECT COUNT(*) FROM deals WHERE status = 'pending') AS pending_deals,
            (SELECT COUNT(*) FROM investments) AS total_investments,
            (SELECT COALESCE(SUM(investment_amount), 0) FROM investments) AS total_investment_amount,
            (SELECT COUNT(*) FROM meetings) AS total_meetings,
            (SELECT COUNT(*) FROM meetings WHERE start_time > $2) AS upcoming_meetings",
    )
    .bind(now - Duration::days(30))
    .bind(now)
    .fetch_one(pool)
    .await
}
