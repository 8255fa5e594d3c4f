use bigdecimal::{BigDecimal, Zero};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::notifier::Notifier;
use crate::models::{CreateDeal, Deal, DealAction, DealStatus, Role, UpdateDeal};
use crate::services::ledger::{max_amount, max_unit_price};
use crate::services::{notification_service, profile_service};
use crate::store::{DealFilter, Store};

fn deal_not_found(deal_id: Uuid) -> AppError {
    AppError::NotFound(format!("Deal with id {} does not exist", deal_id))
}

fn not_found_for_startup(deal_id: Uuid) -> AppError {
    AppError::NotFound(format!("Deal with id {} does not exist for this startup", deal_id))
}

/// Field rules shared by create and update, checked on the merged deal.
fn validate(deal: &Deal) -> Result<(), AppError> {
    if deal.name.trim().is_empty() {
        return Err(AppError::Validation("Deal name cannot be empty".into()));
    }
    for (field, value, ceiling) in [
        ("allocation", &deal.allocation, max_amount()),
        ("price_per_unit", &deal.price_per_unit, max_unit_price()),
        ("minimum_investment", &deal.minimum_investment, max_amount()),
    ] {
        if *value < BigDecimal::zero() {
            return Err(AppError::Validation(format!("{} cannot be negative", field)));
        }
        if value.round(2) != *value {
            return Err(AppError::Validation(format!("{} cannot have more than 2 decimal places", field)));
        }
        if *value >= ceiling {
            return Err(AppError::Validation(format!("{} is too large", field)));
        }
    }
    if deal.end_date < deal.start_date {
        return Err(AppError::Validation("end_date cannot be before start_date".into()));
    }
    Ok(())
}

pub async fn create(store: &dyn Store, startup_id: Uuid, input: CreateDeal) -> Result<Deal, AppError> {
    profile_service::require(store, startup_id, Role::Startup).await?;
    let deal = Deal::new(startup_id, input);
    validate(&deal)?;
    let deal = store.insert_deal(&deal).await?;
    info!("Deal {} created by startup {} (pending review)", deal.id, startup_id);
    Ok(deal)
}

pub async fn list_for_startup(store: &dyn Store, startup_id: Uuid) -> Result<Vec<Deal>, AppError> {
    profile_service::require(store, startup_id, Role::Startup).await?;
    store
        .list_deals(DealFilter {
            startup_id: Some(startup_id),
            status: None,
        })
        .await
}

pub async fn fetch_for_startup(store: &dyn Store, startup_id: Uuid, deal_id: Uuid) -> Result<Deal, AppError> {
    profile_service::require(store, startup_id, Role::Startup).await?;
    store
        .find_deal(deal_id)
        .await?
        .filter(|d| d.startup_id == startup_id)
        .ok_or_else(|| not_found_for_startup(deal_id))
}

/// Partial update by the owning startup. Status and counters are not writable.
pub async fn update(
    store: &dyn Store,
    startup_id: Uuid,
    deal_id: Uuid,
    input: UpdateDeal,
) -> Result<Deal, AppError> {
    profile_service::require(store, startup_id, Role::Startup).await?;
    let deal = store
        .modify_deal(
            deal_id,
            Box::new(move |deal: &mut Deal| {
                if deal.startup_id != startup_id {
                    return Err(not_found_for_startup(deal_id));
                }
                deal.apply(input);
                validate(deal)
            }),
        )
        .await?
        .ok_or_else(|| not_found_for_startup(deal_id))?;
    info!("Deal {} updated by startup {}", deal_id, startup_id);
    Ok(deal)
}

pub async fn delete_for_startup(store: &dyn Store, startup_id: Uuid, deal_id: Uuid) -> Result<(), AppError> {
    fetch_for_startup(store, startup_id, deal_id).await?;
    delete(store, deal_id).await
}

pub async fn delete(store: &dyn Store, deal_id: Uuid) -> Result<(), AppError> {
    match store.delete_deal(deal_id).await? {
        0 => Err(deal_not_found(deal_id)),
        _ => {
            info!("Deal {} deleted", deal_id);
            Ok(())
        }
    }
}

pub async fn list_all(store: &dyn Store) -> Result<Vec<Deal>, AppError> {
    store.list_deals(DealFilter::default()).await
}

/// Deals open for investment.
pub async fn list_approved(store: &dyn Store) -> Result<Vec<Deal>, AppError> {
    store
        .list_deals(DealFilter {
            startup_id: None,
            status: Some(DealStatus::Approved),
        })
        .await
}

/// Admin decision. The transition is checked against the status held under
/// the row lock, so of two racing decisions only one can apply.
pub async fn review(
    store: &dyn Store,
    notifier: &dyn Notifier,
    deal_id: Uuid,
    action: DealAction,
) -> Result<Deal, AppError> {
    let deal = store
        .modify_deal(
            deal_id,
            Box::new(move |deal: &mut Deal| {
                let next = action.target(deal.status).ok_or_else(|| {
                    let verb = match action {
                        DealAction::Approve => "approved",
                        DealAction::Reject => "rejected",
                        DealAction::Close => "closed",
                    };
                    AppError::Validation(format!("Deal is {} and cannot be {}", deal.status, verb))
                })?;
                deal.status = next;
                deal.updated_at = chrono::Utc::now();
                Ok(())
            }),
        )
        .await?
        .ok_or_else(|| deal_not_found(deal_id))?;

    info!("Deal {} is now {}", deal_id, deal.status);

    if matches!(deal.status, DealStatus::Approved | DealStatus::Rejected) {
        match store.find_user(deal.startup_id).await? {
            Some(startup) => {
                let email = notification_service::deal_decision(&startup, &deal);
                notification_service::send_best_effort(notifier, &email).await;
            }
            None => warn!("Startup {} of deal {} vanished before notification", deal.startup_id, deal_id),
        }
    }

    Ok(deal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fakes::RecordingNotifier;
    use crate::models::{RoleProfile, User};
    use crate::store::{MemoryStore, UserStore};
    use chrono::{Duration, Utc};

    async fn startup(store: &MemoryStore) -> User {
        let user = User::new("acme@example.com".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        store.insert_user(&user).await.unwrap();
        user
    }

    fn named(name: &str) -> CreateDeal {
        CreateDeal {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let store = MemoryStore::new();
        let s = startup(&store).await;

        assert!(matches!(create(&store, s.id, named("  ")).await, Err(AppError::Validation(_))));

        let now = Utc::now();
        let backwards = CreateDeal {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
            ..named("Seed")
        };
        assert!(matches!(create(&store, s.id, backwards).await, Err(AppError::Validation(_))));

        let deal = create(&store, s.id, named("Seed")).await.unwrap();
        assert_eq!(deal.status, DealStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_rejects_amounts_beyond_column_range() {
        let store = MemoryStore::new();
        let s = startup(&store).await;

        let huge_allocation = CreateDeal {
            allocation: Some(BigDecimal::from(10_000_000_000_000i64)),
            ..named("Seed")
        };
        let err = create(&store, s.id, huge_allocation).await.unwrap_err();
        assert_eq!(err.to_string(), "allocation is too large");

        let pricey = CreateDeal {
            price_per_unit: Some(BigDecimal::from(100_000_000i64)),
            ..named("Seed")
        };
        let err = create(&store, s.id, pricey).await.unwrap_err();
        assert_eq!(err.to_string(), "price_per_unit is too large");

        let largest = CreateDeal {
            allocation: Some(BigDecimal::from(9_999_999_999_999i64)),
            price_per_unit: Some(BigDecimal::from(99_999_999i64)),
            ..named("Seed")
        };
        assert!(create(&store, s.id, largest).await.is_ok());
    }

    #[tokio::test]
    async fn test_review_transitions_and_notifies() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let s = startup(&store).await;
        let deal = create(&store, s.id, named("Seed")).await.unwrap();

        let approved = review(&store, &notifier, deal.id, DealAction::Approve).await.unwrap();
        assert_eq!(approved.status, DealStatus::Approved);
        assert_eq!(notifier.sent_to(&s.email).len(), 1);

        // a second decision on an already decided deal is refused
        let err = review(&store, &notifier, deal.id, DealAction::Reject).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let closed = review(&store, &notifier, deal.id, DealAction::Close).await.unwrap();
        assert_eq!(closed.status, DealStatus::Closed);
        assert_eq!(notifier.sent().len(), 1);

        let err = review(&store, &notifier, Uuid::new_v4(), DealAction::Approve).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = startup(&store).await;
        let other = User::new("other@example.com".into(), "Other".into(), RoleProfile::default_for(Role::Startup, "Other"));
        store.insert_user(&other).await.unwrap();
        let deal = create(&store, owner.id, named("Seed")).await.unwrap();

        let patch = || UpdateDeal {
            description: Some("Now with more detail".into()),
            ..Default::default()
        };
        let err = update(&store, other.id, deal.id, patch()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let updated = update(&store, owner.id, deal.id, patch()).await.unwrap();
        assert_eq!(updated.description, "Now with more detail");
        assert_eq!(updated.status, DealStatus::Pending);

        assert!(delete_for_startup(&store, other.id, deal.id).await.is_err());
        delete_for_startup(&store, owner.id, deal.id).await.unwrap();
        assert!(matches!(delete(&store, deal.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_investors_only_see_approved_deals() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let s = startup(&store).await;
        let pending = create(&store, s.id, named("Pending")).await.unwrap();
        let live = create(&store, s.id, named("Live")).await.unwrap();
        review(&store, &notifier, live.id, DealAction::Approve).await.unwrap();

        let visible = list_approved(&store).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, live.id);
        assert_ne!(visible[0].id, pending.id);
        assert_eq!(list_all(&store).await.unwrap().len(), 2);
    }
}
