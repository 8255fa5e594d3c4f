use bigdecimal::{BigDecimal, Zero};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Role, UpdateInvestorProfile, UpdateStartupProfile, User};
use crate::services::ledger::max_amount;
use crate::store::Store;

fn missing(role: Role, id: Uuid) -> AppError {
    let label = match role {
        Role::Admin => "Admin",
        Role::Investor => "Investor",
        Role::Startup => "Startup",
        Role::Unassigned => "User",
    };
    AppError::NotFound(format!("{} with id {} does not exist", label, id))
}

fn validate_amount(field: &str, value: &BigDecimal) -> Result<(), AppError> {
    if *value < BigDecimal::zero() {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    if value.round(2) != *value {
        return Err(AppError::Validation(format!("{} cannot have more than 2 decimal places", field)));
    }
    if *value >= max_amount() {
        return Err(AppError::Validation(format!("{} is too large", field)));
    }
    Ok(())
}

fn validate_username(username: &Option<String>) -> Result<(), AppError> {
    match username {
        Some(name) if name.trim().is_empty() => Err(AppError::Validation("Username cannot be empty".into())),
        _ => Ok(()),
    }
}

/// The user with `id`, provided it currently holds `role`.
pub async fn require(store: &dyn Store, id: Uuid, role: Role) -> Result<User, AppError> {
    store
        .find_user(id)
        .await?
        .filter(|u| u.role() == role)
        .ok_or_else(|| missing(role, id))
}

pub async fn get_profile(store: &dyn Store, id: Uuid, role: Role) -> Result<User, AppError> {
    require(store, id, role).await
}

/// `total_invested` is read-only; only the settlement path moves it.
pub async fn update_investor_profile(
    store: &dyn Store,
    id: Uuid,
    input: UpdateInvestorProfile,
) -> Result<User, AppError> {
    validate_username(&input.username)?;
    if let Some(funds) = &input.available_funds {
        validate_amount("available_funds", funds)?;
    }

    let updated = store
        .modify_user(
            id,
            Box::new(move |user: &mut User| {
                let acc = user.investor_mut().ok_or_else(|| missing(Role::Investor, id))?;
                if let Some(funds) = input.available_funds {
                    acc.available_funds = funds.with_scale(2);
                }
                if let Some(name) = input.username {
                    user.username = name;
                }
                user.updated_at = chrono::Utc::now();
                Ok(())
            }),
        )
        .await?
        .ok_or_else(|| missing(Role::Investor, id))?;

    info!("Investor {} profile updated", id);
    Ok(updated)
}

/// `total_raised` is read-only; the goal may not drop below it.
pub async fn update_startup_profile(
    store: &dyn Store,
    id: Uuid,
    input: UpdateStartupProfile,
) -> Result<User, AppError> {
    validate_username(&input.username)?;
    if let Some(goal) = &input.fundraising_goal {
        validate_amount("fundraising_goal", goal)?;
    }
    if matches!(&input.name, Some(name) if name.trim().is_empty()) {
        return Err(AppError::Validation("Startup name cannot be empty".into()));
    }

    let updated = store
        .modify_user(
            id,
            Box::new(move |user: &mut User| {
                let acc = user.startup_mut().ok_or_else(|| missing(Role::Startup, id))?;
                if let Some(goal) = input.fundraising_goal {
                    if goal < acc.total_raised {
                        return Err(AppError::Validation(format!(
                            "fundraising_goal cannot be lower than the amount already raised (${})",
                            acc.total_raised
                        )));
                    }
                    acc.fundraising_goal = goal.with_scale(2);
                }
                if let Some(name) = input.name {
                    acc.name = name;
                }
                if let Some(description) = input.description {
                    acc.description = description;
                }
                if let Some(name) = input.username {
                    user.username = name;
                }
                user.updated_at = chrono::Utc::now();
                Ok(())
            }),
        )
        .await?
        .ok_or_else(|| missing(Role::Startup, id))?;

    info!("Startup {} profile updated", id);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoleProfile;
    use crate::store::{MemoryStore, UserStore};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_profile_lookup_checks_role() {
        let store = MemoryStore::new();
        let startup = User::new("acme@example.com".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        store.insert_user(&startup).await.unwrap();

        assert!(get_profile(&store, startup.id, Role::Startup).await.is_ok());
        let err = get_profile(&store, startup.id, Role::Investor).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Investor with id {} does not exist", startup.id));
    }

    #[tokio::test]
    async fn test_investor_can_set_funds_but_not_negative() {
        let store = MemoryStore::new();
        let investor = User::new("ivy@example.com".into(), "Ivy".into(), RoleProfile::default_for(Role::Investor, ""));
        store.insert_user(&investor).await.unwrap();

        let updated = update_investor_profile(
            &store,
            investor.id,
            UpdateInvestorProfile {
                available_funds: Some(dec("2500")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.investor().unwrap().available_funds, dec("2500"));

        let err = update_investor_profile(
            &store,
            investor.id,
            UpdateInvestorProfile {
                available_funds: Some(dec("-1")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_amounts_must_fit_money_column() {
        let store = MemoryStore::new();
        let investor = User::new("ivy@example.com".into(), "Ivy".into(), RoleProfile::default_for(Role::Investor, ""));
        let startup = User::new("acme@example.com".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        store.insert_user(&investor).await.unwrap();
        store.insert_user(&startup).await.unwrap();

        let err = update_investor_profile(
            &store,
            investor.id,
            UpdateInvestorProfile {
                available_funds: Some(dec("10000000000000")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "available_funds is too large");

        let err = update_startup_profile(
            &store,
            startup.id,
            UpdateStartupProfile {
                fundraising_goal: Some(dec("1e20")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "fundraising_goal is too large");

        let updated = update_investor_profile(
            &store,
            investor.id,
            UpdateInvestorProfile {
                available_funds: Some(dec("9999999999999.99")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.investor().unwrap().available_funds, dec("9999999999999.99"));
    }

    #[tokio::test]
    async fn test_goal_cannot_drop_below_raised() {
        let store = MemoryStore::new();
        let mut startup = User::new("acme@example.com".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        startup.startup_mut().unwrap().total_raised = dec("4850");
        store.insert_user(&startup).await.unwrap();

        let err = update_startup_profile(
            &store,
            startup.id,
            UpdateStartupProfile {
                fundraising_goal: Some(dec("1000")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = update_startup_profile(
            &store,
            startup.id,
            UpdateStartupProfile {
                fundraising_goal: Some(dec("50000")),
                description: Some("Rockets".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let acc = updated.startup().unwrap();
        assert_eq!(acc.fundraising_goal, dec("50000"));
        assert_eq!(acc.description, "Rockets");
    }
}
