use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Investor,
    Startup,
    Unassigned,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Investor => "investor",
            Role::Startup => "startup",
            Role::Unassigned => "unassigned",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "investor" => Ok(Role::Investor),
            "startup" => Ok(Role::Startup),
            "unassigned" => Ok(Role::Unassigned),
            _ => Err(AppError::Validation("Invalid role provided".into())),
        }
    }
}

// Balances held by an investor. Only the settlement path moves money out of
// `available_funds` and into `total_invested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorAccount {
    pub available_funds: BigDecimal,
    pub total_invested: BigDecimal,
}

impl Default for InvestorAccount {
    fn default() -> Self {
        Self {
            available_funds: BigDecimal::zero(),
            total_invested: BigDecimal::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupAccount {
    pub name: String,
    pub description: String,
    pub fundraising_goal: BigDecimal,
    pub total_raised: BigDecimal,
}

impl StartupAccount {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fundraising_goal: BigDecimal::zero(),
            total_raised: BigDecimal::zero(),
        }
    }
}

/// Role-specific payload of a [`User`]. The variant *is* the role.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleProfile {
    Admin { permission: String },
    Investor(InvestorAccount),
    Startup(StartupAccount),
    Unassigned,
}

impl RoleProfile {
    /// Fresh profile for a user who just picked `role`.
    pub fn default_for(role: Role, display_name: &str) -> Self {
        match role {
            Role::Admin => RoleProfile::Admin { permission: "full".to_string() },
            Role::Investor => RoleProfile::Investor(InvestorAccount::default()),
            Role::Startup => RoleProfile::Startup(StartupAccount::named(display_name)),
            Role::Unassigned => RoleProfile::Unassigned,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Admin { .. } => Role::Admin,
            RoleProfile::Investor(_) => Role::Investor,
            RoleProfile::Startup(_) => Role::Startup,
            RoleProfile::Unassigned => Role::Unassigned,
        }
    }

    pub fn columns(&self) -> ProfileColumns {
        let mut cols = ProfileColumns {
            role: self.role().as_str(),
            ..ProfileColumns::default()
        };
        match self {
            RoleProfile::Admin { permission } => cols.permission = Some(permission.clone()),
            RoleProfile::Investor(acc) => {
                cols.available_funds = Some(acc.available_funds.clone());
                cols.total_invested = Some(acc.total_invested.clone());
            }
            RoleProfile::Startup(acc) => {
                cols.startup_name = Some(acc.name.clone());
                cols.description = Some(acc.description.clone());
                cols.fundraising_goal = Some(acc.fundraising_goal.clone());
                cols.total_raised = Some(acc.total_raised.clone());
            }
            RoleProfile::Unassigned => {}
        }
        cols
    }
}

/// Flat column values of a profile, as stored in the `users` table.
#[derive(Debug, Default)]
pub struct ProfileColumns {
    pub role: &'static str,
    pub permission: Option<String>,
    pub available_funds: Option<BigDecimal>,
    pub total_invested: Option<BigDecimal>,
    pub startup_name: Option<String>,
    pub description: Option<String>,
    pub fundraising_goal: Option<BigDecimal>,
    pub total_raised: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub refresh_token: Option<String>,
    pub profile: RoleProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, username: String, profile: RoleProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            refresh_token: None,
            profile,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn investor(&self) -> Option<&InvestorAccount> {
        match &self.profile {
            RoleProfile::Investor(acc) => Some(acc),
            _ => None,
        }
    }

    pub fn startup(&self) -> Option<&StartupAccount> {
        match &self.profile {
            RoleProfile::Startup(acc) => Some(acc),
            _ => None,
        }
    }

    pub fn investor_mut(&mut self) -> Option<&mut InvestorAccount> {
        match &mut self.profile {
            RoleProfile::Investor(acc) => Some(acc),
            _ => None,
        }
    }

    pub fn startup_mut(&mut self) -> Option<&mut StartupAccount> {
        match &mut self.profile {
            RoleProfile::Startup(acc) => Some(acc),
            _ => None,
        }
    }
}

// Raw `users` row; every role-specific column is nullable.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: String,
    pub refresh_token: Option<String>,
    pub permission: Option<String>,
    pub available_funds: Option<BigDecimal>,
    pub total_invested: Option<BigDecimal>,
    pub startup_name: Option<String>,
    pub description: Option<String>,
    pub fundraising_goal: Option<BigDecimal>,
    pub total_raised: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let missing = |col: &str| AppError::Internal(format!("user {} has no {}", row.id, col));
        let profile = match row.role.parse::<Role>()? {
            Role::Admin => RoleProfile::Admin {
                permission: row.permission.clone().unwrap_or_default(),
            },
            Role::Investor => RoleProfile::Investor(InvestorAccount {
                available_funds: row.available_funds.clone().ok_or_else(|| missing("available_funds"))?,
                total_invested: row.total_invested.clone().ok_or_else(|| missing("total_invested"))?,
            }),
            Role::Startup => RoleProfile::Startup(StartupAccount {
                name: row.startup_name.clone().ok_or_else(|| missing("startup_name"))?,
                description: row.description.clone().unwrap_or_default(),
                fundraising_goal: row.fundraising_goal.clone().ok_or_else(|| missing("fundraising_goal"))?,
                total_raised: row.total_raised.clone().ok_or_else(|| missing("total_raised"))?,
            }),
            Role::Unassigned => RoleProfile::Unassigned,
        };
        Ok(User {
            id: row.id,
            email: row.email,
            username: row.username,
            refresh_token: row.refresh_token,
            profile,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Public representation of a user, shaped by role.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ProfileDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProfileDetails {
    Admin {
        permission: String,
    },
    Investor {
        available_funds: BigDecimal,
        total_invested: BigDecimal,
    },
    Startup {
        name: String,
        description: String,
        fundraising_goal: BigDecimal,
        total_raised: BigDecimal,
    },
    Unassigned {},
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        let details = match &user.profile {
            RoleProfile::Admin { permission } => ProfileDetails::Admin {
                permission: permission.clone(),
            },
            RoleProfile::Investor(acc) => ProfileDetails::Investor {
                available_funds: acc.available_funds.clone(),
                total_invested: acc.total_invested.clone(),
            },
            RoleProfile::Startup(acc) => ProfileDetails::Startup {
                name: acc.name.clone(),
                description: acc.description.clone(),
                fundraising_goal: acc.fundraising_goal.clone(),
                total_raised: acc.total_raised.clone(),
            },
            RoleProfile::Unassigned => ProfileDetails::Unassigned {},
        };
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role(),
            created_at: user.created_at,
            details,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInvestorProfile {
    pub username: Option<String>,
    pub available_funds: Option<BigDecimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStartupProfile {
    pub username: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub fundraising_goal: Option<BigDecimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_columns_match_role() {
        let cols = RoleProfile::default_for(Role::Investor, "Ann").columns();
        assert_eq!(cols.role, "investor");
        assert_eq!(cols.available_funds, Some(BigDecimal::zero()));
        assert!(cols.startup_name.is_none());

        let cols = RoleProfile::default_for(Role::Startup, "Acme").columns();
        assert_eq!(cols.startup_name.as_deref(), Some("Acme"));
        assert!(cols.available_funds.is_none());
    }

    #[test]
    fn test_row_without_investor_columns_is_rejected() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            username: "a".into(),
            role: "investor".into(),
            refresh_token: None,
            permission: None,
            available_funds: None,
            total_invested: None,
            startup_name: None,
            description: None,
            fundraising_goal: None,
            total_raised: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(User::try_from(row), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_view_flattens_role_details() {
        let user = User::new(
            "s@acme.io".into(),
            "Acme".into(),
            RoleProfile::default_for(Role::Startup, "Acme"),
        );
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert_eq!(json["role"], "startup");
        assert_eq!(json["name"], "Acme");
        assert!(json.get("available_funds").is_none());
        assert!(json.get("refresh_token").is_none());
    }
}
