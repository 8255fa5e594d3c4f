use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Deal, DealStatus, Investment, User};

// ==============================================================================
// Investment settlement
// ==============================================================================

/// Platform fee as a fraction of the gross amount (3%).
pub fn default_fee_rate() -> BigDecimal {
    BigDecimal::new(3.into(), 2)
}

/// Exclusive ceiling for money columns stored as NUMERIC(15, 2).
pub fn max_amount() -> BigDecimal {
    BigDecimal::from(10_000_000_000_000i64)
}

/// Exclusive ceiling for `price_per_unit`, stored as NUMERIC(10, 2).
pub fn max_unit_price() -> BigDecimal {
    BigDecimal::from(100_000_000i64)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    #[error("Investor with id {0} does not exist")]
    InvestorUnavailable(Uuid),
    #[error("Deal with id {0} does not exist")]
    DealUnavailable(Uuid),
    #[error("Investment amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Investment amount cannot have more than 2 decimal places")]
    TooPrecise,
    #[error("Investment amount is too large")]
    AmountTooLarge,
    #[error("The minimum investment amount for this deal is ${minimum}")]
    BelowMinimum { minimum: BigDecimal },
    #[error("Insufficient funds for investment: available ${available}, requested ${requested}")]
    InsufficientFunds {
        available: BigDecimal,
        requested: BigDecimal,
    },
    #[error("Investment exceeds the remaining deal allocation of ${remaining}")]
    AllocationExceeded { remaining: BigDecimal },
    #[error("Investment exceeds the startup's remaining fundraising goal of ${remaining}")]
    GoalExceeded { remaining: BigDecimal },
}

/// Fee and net split of a gross amount, both at 2 decimal places.
pub fn split_fee(amount: &BigDecimal, fee_rate: &BigDecimal) -> (BigDecimal, BigDecimal) {
    let fee = (amount * fee_rate).round(2).with_scale(2);
    let net = (amount - &fee).with_scale(2);
    (fee, net)
}

/// Apply one investment to the three ledger rows.
///
/// All checks run before any field is written, so on `Err` the inputs are
/// untouched. Callers must hold exclusive access to the three rows for the
/// duration of the call and persist all of them (plus the returned
/// investment) as one unit.
pub fn settle(
    investor: &mut User,
    startup: &mut User,
    deal: &mut Deal,
    amount: &BigDecimal,
    fee_rate: &BigDecimal,
    now: DateTime<Utc>,
) -> Result<Investment, SettlementError> {
    let investor_id = investor.id;
    let investor_acc = investor
        .investor_mut()
        .ok_or(SettlementError::InvestorUnavailable(investor_id))?;

    if deal.status != DealStatus::Approved || deal.startup_id != startup.id {
        return Err(SettlementError::DealUnavailable(deal.id));
    }
    let startup_acc = startup
        .startup_mut()
        .ok_or(SettlementError::DealUnavailable(deal.id))?;

    if *amount <= BigDecimal::zero() {
        return Err(SettlementError::NonPositiveAmount);
    }
    if amount.round(2) != *amount {
        return Err(SettlementError::TooPrecise);
    }
    let ceiling = max_amount();
    if *amount >= ceiling || &investor_acc.total_invested + amount >= ceiling {
        return Err(SettlementError::AmountTooLarge);
    }
    if *amount < deal.minimum_investment {
        return Err(SettlementError::BelowMinimum {
            minimum: deal.minimum_investment.clone(),
        });
    }
    if investor_acc.available_funds < *amount {
        return Err(SettlementError::InsufficientFunds {
            available: investor_acc.available_funds.clone(),
            requested: amount.clone(),
        });
    }

    let (fee, net) = split_fee(amount, fee_rate);

    // a zero ceiling means none was set
    if deal.allocation > BigDecimal::zero() && &deal.raised + &net > deal.allocation {
        return Err(SettlementError::AllocationExceeded {
            remaining: &deal.allocation - &deal.raised,
        });
    }
    if &deal.raised + &net >= ceiling || &startup_acc.total_raised + &net >= ceiling {
        return Err(SettlementError::AmountTooLarge);
    }
    let goal = &startup_acc.fundraising_goal;
    if *goal > BigDecimal::zero() && &startup_acc.total_raised + &net > *goal {
        return Err(SettlementError::GoalExceeded {
            remaining: goal - &startup_acc.total_raised,
        });
    }

    investor_acc.available_funds = &investor_acc.available_funds - amount;
    investor_acc.total_invested = &investor_acc.total_invested + amount;
    startup_acc.total_raised = &startup_acc.total_raised + &net;
    deal.raised = &deal.raised + &net;
    deal.investor_count += 1;

    investor.updated_at = now;
    startup.updated_at = now;
    deal.updated_at = now;

    Ok(Investment {
        id: Uuid::new_v4(),
        investor_id,
        deal_id: deal.id,
        investment_amount: amount.with_scale(2),
        platform_fee: fee,
        net_amount: net,
        investment_date: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateDeal, Role, RoleProfile};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn investor_with(funds: &str) -> User {
        let mut user = User::new(
            "inv@example.com".into(),
            "Ivy".into(),
            RoleProfile::default_for(Role::Investor, "Ivy"),
        );
        user.investor_mut().unwrap().available_funds = dec(funds);
        user
    }

    fn startup() -> User {
        User::new(
            "founder@acme.io".into(),
            "Acme".into(),
            RoleProfile::default_for(Role::Startup, "Acme"),
        )
    }

    fn approved_deal(startup: &User, minimum: &str) -> Deal {
        let mut deal = Deal::new(
            startup.id,
            CreateDeal {
                name: "Series A".into(),
                minimum_investment: Some(dec(minimum)),
                ..Default::default()
            },
        );
        deal.status = DealStatus::Approved;
        deal
    }

    #[test]
    fn test_fee_split() {
        let (fee, net) = split_fee(&dec("5000"), &default_fee_rate());
        assert_eq!(fee, dec("150.00"));
        assert_eq!(net, dec("4850.00"));

        let (fee, net) = split_fee(&dec("1000.01"), &default_fee_rate());
        assert_eq!(fee, dec("30.00"));
        assert_eq!(net, dec("970.01"));

        let (fee, _) = split_fee(&dec("16.50"), &default_fee_rate());
        assert_eq!(fee, dec("0.50"));
    }

    #[test]
    fn test_settle_reference_scenario() {
        let mut investor = investor_with("10000");
        let mut startup = startup();
        let mut deal = approved_deal(&startup, "1000");

        let investment = settle(
            &mut investor,
            &mut startup,
            &mut deal,
            &dec("5000"),
            &default_fee_rate(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(investment.investment_amount, dec("5000"));
        assert_eq!(investment.platform_fee, dec("150"));
        assert_eq!(investment.deal_id, deal.id);
        assert_eq!(deal.raised, dec("4850.00"));
        assert_eq!(deal.investor_count, 1);
        let acc = investor.investor().unwrap();
        assert_eq!(acc.total_invested, dec("5000"));
        assert_eq!(acc.available_funds, dec("5000"));
        assert_eq!(startup.startup().unwrap().total_raised, dec("4850"));
    }

    #[test]
    fn test_below_minimum_names_minimum() {
        let mut investor = investor_with("10000");
        let mut startup = startup();
        let mut deal = approved_deal(&startup, "1000");

        let err = settle(
            &mut investor,
            &mut startup,
            &mut deal,
            &dec("999.99"),
            &default_fee_rate(),
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, SettlementError::BelowMinimum { .. }));
        assert!(err.to_string().contains("1000"), "message was {}", err);
        assert_eq!(deal.investor_count, 0);
    }

    #[test]
    fn test_amount_must_fit_money_column() {
        let mut investor = investor_with("9999999999999.99");
        let mut startup = startup();
        let mut deal = approved_deal(&startup, "0");

        let err = settle(
            &mut investor,
            &mut startup,
            &mut deal,
            &dec("10000000000000"),
            &default_fee_rate(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, SettlementError::AmountTooLarge);

        investor.investor_mut().unwrap().total_invested = dec("9999999999000");
        let err = settle(
            &mut investor,
            &mut startup,
            &mut deal,
            &dec("1000"),
            &default_fee_rate(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, SettlementError::AmountTooLarge);
        assert_eq!(deal.investor_count, 0);
        assert_eq!(deal.raised, BigDecimal::zero());
    }

    #[test]
    fn test_unapproved_deal_is_unavailable() {
        for status in [DealStatus::Pending, DealStatus::Rejected, DealStatus::Closed] {
            let mut investor = investor_with("10000");
            let mut startup = startup();
            let mut deal = approved_deal(&startup, "0");
            deal.status = status;
            let err = settle(
                &mut investor,
                &mut startup,
                &mut deal,
                &dec("100"),
                &default_fee_rate(),
                Utc::now(),
            )
            .unwrap_err();
            assert_eq!(err, SettlementError::DealUnavailable(deal.id));
        }
    }

    #[test]
    fn test_insufficient_funds_leaves_rows_untouched() {
        let mut investor = investor_with("500");
        let mut startup = startup();
        let mut deal = approved_deal(&startup, "100");
        let before = (investor.clone(), startup.clone(), deal.clone());

        let err = settle(
            &mut investor,
            &mut startup,
            &mut deal,
            &dec("600"),
            &default_fee_rate(),
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, SettlementError::InsufficientFunds { .. }));
        assert_eq!((investor, startup, deal), before);
    }

    #[test]
    fn test_ceilings() {
        let mut investor = investor_with("100000");
        let mut startup = startup();
        let mut deal = approved_deal(&startup, "0");
        deal.allocation = dec("1000");

        // 1000 gross is 970 net, fits
        settle(&mut investor, &mut startup, &mut deal, &dec("1000"), &default_fee_rate(), Utc::now()).unwrap();
        let err = settle(&mut investor, &mut startup, &mut deal, &dec("100"), &default_fee_rate(), Utc::now())
            .unwrap_err();
        assert_eq!(err, SettlementError::AllocationExceeded { remaining: dec("30") });

        deal.allocation = BigDecimal::zero();
        startup.startup_mut().unwrap().fundraising_goal = dec("1000");
        let err = settle(&mut investor, &mut startup, &mut deal, &dec("100"), &default_fee_rate(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, SettlementError::GoalExceeded { .. }));
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let mut investor = investor_with("1000");
        let mut startup = startup();
        let mut deal = approved_deal(&startup, "0");
        for (amount, expected) in [
            ("0", SettlementError::NonPositiveAmount),
            ("-5", SettlementError::NonPositiveAmount),
            ("10.001", SettlementError::TooPrecise),
        ] {
            let err = settle(&mut investor, &mut startup, &mut deal, &dec(amount), &default_fee_rate(), Utc::now())
                .unwrap_err();
            assert_eq!(err, expected);
        }
    }

    #[test]
    fn test_non_investor_cannot_settle() {
        let mut not_investor = startup();
        let mut startup = startup();
        let mut deal = approved_deal(&startup, "0");
        let err = settle(&mut not_investor, &mut startup, &mut deal, &dec("10"), &default_fee_rate(), Utc::now())
            .unwrap_err();
        assert_eq!(err, SettlementError::InvestorUnavailable(not_investor.id));
    }
}
