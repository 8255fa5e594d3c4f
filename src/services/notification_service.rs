use tracing::warn;

use crate::external::notifier::{Email, Notifier};
use crate::models::{Deal, DealStatus, Investment, User};

// ==============================================================================
// Message builders
// ==============================================================================

const SIGNATURE: &str = "Best regards,\nThe B2D Ventures Team";

/// Notice to the startup after an admin decision on its deal.
pub fn deal_decision(startup: &User, deal: &Deal) -> Email {
    let outcome = match deal.status {
        DealStatus::Approved => format!(
            "Your deal '{}' has been approved. Congratulations! Your deal is now live on our platform.",
            deal.name
        ),
        DealStatus::Rejected => format!(
            "Your deal '{}' has been rejected. We apologize for any inconvenience. \
             If you have any questions, please contact our support team.",
            deal.name
        ),
        _ => format!("There has been an update regarding your deal '{}'.", deal.name),
    };
    Email::new(
        &startup.email,
        format!("Deal Update: {}", deal.name),
        format!("Dear {},\n\n{}\n\n{}", startup.username, outcome, SIGNATURE),
    )
}

pub fn investment_confirmation(investor: &User, deal: &Deal, investment: &Investment) -> Email {
    Email::new(
        &investor.email,
        format!("Investment Confirmation: {}", deal.name),
        format!(
            "Dear {},\n\n\
             Your investment of ${} in {} has been successfully processed.\n\n\
             Investment details:\n\
             - Deal: {}\n\
             - Amount: ${}\n\
             - Platform fee: ${}\n\
             - Net investment: ${}\n\n\
             Thank you for your investment!\n\n{}",
            investor.username,
            investment.investment_amount,
            deal.name,
            deal.name,
            investment.investment_amount,
            investment.platform_fee,
            investment.net_amount,
            SIGNATURE
        ),
    )
}

/// `deal` must carry the counters as of right after the investment.
pub fn new_investment_notice(startup: &User, deal: &Deal, investment: &Investment) -> Email {
    Email::new(
        &startup.email,
        format!("New Investment Received: {}", deal.name),
        format!(
            "Dear {},\n\n\
             Great news! Your deal {} has received a new investment.\n\n\
             Investment details:\n\
             - Amount: ${} (after platform fee)\n\
             - Total amount raised: ${}\n\
             - Total investors: {}\n\n\
             Congratulations on your progress!\n\n{}",
            startup.username, deal.name, investment.net_amount, deal.raised, deal.investor_count, SIGNATURE
        ),
    )
}

pub fn dataroom_link(investor: &User, deal: &Deal, dataroom_url: &str) -> Email {
    Email::new(
        &investor.email,
        format!("Dataroom Access: {}", deal.name),
        format!(
            "Dear {},\n\n\
             You requested access to the dataroom of {}. The files are available at:\n\n{}\n\n{}",
            investor.username, deal.name, dataroom_url, SIGNATURE
        ),
    )
}

/// Deliver without failing the caller; returns whether delivery succeeded.
pub async fn send_best_effort(notifier: &dyn Notifier, email: &Email) -> bool {
    let delivered = notifier.notify(email).await;
    if !delivered {
        warn!("Notification '{}' to {} was not delivered", email.subject, email.to);
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateDeal, Role, RoleProfile};
    use crate::services::ledger::{default_fee_rate, settle};
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use std::str::FromStr;

    #[test]
    fn test_investment_messages_use_settled_numbers() {
        let mut investor = User::new("ivy@example.com".into(), "Ivy".into(), RoleProfile::default_for(Role::Investor, ""));
        investor.investor_mut().unwrap().available_funds = BigDecimal::from_str("10000").unwrap();
        let mut startup = User::new("acme@example.com".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        let mut deal = Deal::new(startup.id, CreateDeal { name: "Seed".into(), ..Default::default() });
        deal.status = DealStatus::Approved;

        let investment = settle(
            &mut investor,
            &mut startup,
            &mut deal,
            &BigDecimal::from_str("5000").unwrap(),
            &default_fee_rate(),
            Utc::now(),
        )
        .unwrap();

        let confirmation = investment_confirmation(&investor, &deal, &investment);
        assert_eq!(confirmation.to, "ivy@example.com");
        assert!(confirmation.body.contains("Platform fee: $150.00"));
        assert!(confirmation.body.contains("Net investment: $4850.00"));

        let notice = new_investment_notice(&startup, &deal, &investment);
        assert_eq!(notice.subject, "New Investment Received: Seed");
        assert!(notice.body.contains("Total investors: 1"));
    }

    #[test]
    fn test_decision_wording_follows_status() {
        let startup = User::new("acme@example.com".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        let mut deal = Deal::new(startup.id, CreateDeal { name: "Seed".into(), ..Default::default() });
        deal.status = DealStatus::Rejected;
        let email = deal_decision(&startup, &deal);
        assert_eq!(email.subject, "Deal Update: Seed");
        assert!(email.body.contains("has been rejected"));
    }
}
