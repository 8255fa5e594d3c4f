use bigdecimal::BigDecimal;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::notifier::Notifier;
use crate::models::{CreateInvestment, Investment, Role};
use crate::services::{notification_service, profile_service};
use crate::store::{InvestmentFilter, Store};

/// Commit an investment, then tell both parties about it.
///
/// The ledger update is all-or-nothing (see `ledger::settle`). Emails go out
/// only after the commit and their failure never affects the result.
pub async fn invest(
    store: &dyn Store,
    notifier: &dyn Notifier,
    fee_rate: &BigDecimal,
    investor_id: Uuid,
    deal_id: Uuid,
    input: CreateInvestment,
) -> Result<Investment, AppError> {
    let settlement = store
        .record_investment(investor_id, deal_id, &input.investment_amount, fee_rate)
        .await?;

    info!(
        "Investment {} committed: investor {} -> deal {} (gross {}, fee {}, net {})",
        settlement.investment.id,
        investor_id,
        deal_id,
        settlement.investment.investment_amount,
        settlement.investment.platform_fee,
        settlement.investment.net_amount
    );

    let to_investor = notification_service::investment_confirmation(
        &settlement.investor,
        &settlement.deal,
        &settlement.investment,
    );
    notification_service::send_best_effort(notifier, &to_investor).await;

    let to_startup = notification_service::new_investment_notice(
        &settlement.startup,
        &settlement.deal,
        &settlement.investment,
    );
    notification_service::send_best_effort(notifier, &to_startup).await;

    Ok(settlement.investment)
}

pub async fn list_for_investor(store: &dyn Store, investor_id: Uuid) -> Result<Vec<Investment>, AppError> {
    profile_service::require(store, investor_id, Role::Investor).await?;
    store
        .list_investments(InvestmentFilter {
            investor_id: Some(investor_id),
            ..Default::default()
        })
        .await
}

pub async fn fetch_for_investor(
    store: &dyn Store,
    investor_id: Uuid,
    investment_id: Uuid,
) -> Result<Investment, AppError> {
    profile_service::require(store, investor_id, Role::Investor).await?;
    store
        .find_investment(investment_id)
        .await?
        .filter(|i| i.investor_id == investor_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Investment with id {} does not exist for this investor",
                investment_id
            ))
        })
}

pub async fn list_for_startup(store: &dyn Store, startup_id: Uuid) -> Result<Vec<Investment>, AppError> {
    profile_service::require(store, startup_id, Role::Startup).await?;
    store
        .list_investments(InvestmentFilter {
            startup_id: Some(startup_id),
            ..Default::default()
        })
        .await
}

pub async fn list_all(store: &dyn Store) -> Result<Vec<Investment>, AppError> {
    store.list_investments(InvestmentFilter::default()).await
}

/// Admin override. Aggregate counters on the deal and accounts are left as-is.
pub async fn delete(store: &dyn Store, investment_id: Uuid) -> Result<(), AppError> {
    match store.delete_investment(investment_id).await? {
        0 => Err(AppError::NotFound(format!("Investment with id {} does not exist", investment_id))),
        _ => Ok(()),
    }
}
