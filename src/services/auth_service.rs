use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::identity::{IdentityError, IdentityProvider};
use crate::models::{Role, RoleProfile, User};
use crate::store::Store;

// ==============================================================================
// Access tokens
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// HS256 signing and verification of bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, AppError> {
        let claims = Claims {
            sub: user.id,
            role: user.role(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))?;
        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.ttl.num_seconds(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }
}

// ==============================================================================
// Single sign-on
// ==============================================================================

/// Emails allowed to take the admin role through sign-in or role
/// assignment. Empty means nobody can.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    emails: Arc<HashSet<String>>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails: Arc::new(emails) }
    }

    pub fn permits(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    fn check(&self, role: Role, email: &str) -> Result<(), AppError> {
        if role == Role::Admin && !self.permits(email) {
            warn!("Admin role refused for {}", email);
            return Err(AppError::Forbidden(format!("{} may not register as admin", email)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: User,
    pub token: IssuedToken,
    pub created: bool,
}

/// The `code` query parameter of the provider's redirect URL.
pub fn extract_authorization_code(full_url: &str) -> Result<String, AppError> {
    let parsed = url::Url::parse(full_url)
        .map_err(|_| AppError::Validation("Authorization code not found in URL".into()))?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Validation("Authorization code not found in URL".into()))
}

fn identity_failure(e: IdentityError) -> AppError {
    match e {
        IdentityError::BadResponse(msg) => AppError::Validation(format!("Authorization error: {}", msg)),
        other => AppError::External(format!("Identity provider unavailable: {}", other)),
    }
}

fn role_conflict(user: &User) -> AppError {
    AppError::Conflict(format!("User {} is already registered as {}", user.email, user.role()))
}

/// Create or authenticate a user from the provider's redirect URL.
///
/// A new user gets the default profile of `role` (unassigned when absent).
/// An existing user keeps their role; asking for a different one is a
/// conflict, except for unassigned users, who take the requested role.
/// The admin role is only granted to emails on `admins`.
pub async fn sign_in(
    store: &dyn Store,
    identity: &dyn IdentityProvider,
    keys: &TokenKeys,
    admins: &AdminAllowList,
    full_url: &str,
    role: Option<Role>,
) -> Result<SignIn, AppError> {
    if role == Some(Role::Unassigned) {
        return Err(AppError::Validation("Invalid role provided".into()));
    }
    let code = extract_authorization_code(full_url)?;
    let grant = identity.exchange_code(&code).await.map_err(identity_failure)?;
    let profile = identity
        .fetch_profile(&grant.access_token)
        .await
        .map_err(identity_failure)?;
    if let Some(role) = role {
        admins.check(role, &profile.email)?;
    }

    let (user, created) = match store.find_user_by_email(&profile.email).await? {
        Some(existing) => {
            let requested = role.filter(|r| *r != existing.role());
            if requested.is_some() && existing.role() != Role::Unassigned {
                return Err(role_conflict(&existing));
            }
            if requested.is_none() && grant.refresh_token.is_none() {
                (existing, false)
            } else {
                let refresh_token = grant.refresh_token.clone();
                let updated = store
                    .modify_user(
                        existing.id,
                        Box::new(move |user: &mut User| {
                            if let Some(role) = requested {
                                if user.role() != Role::Unassigned {
                                    return Err(role_conflict(user));
                                }
                                user.profile = RoleProfile::default_for(role, &user.username);
                            }
                            if refresh_token.is_some() {
                                user.refresh_token = refresh_token;
                            }
                            user.updated_at = Utc::now();
                            Ok(())
                        }),
                    )
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User with id {} does not exist", existing.id)))?;
                (updated, false)
            }
        }
        None => {
            let username = profile
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| profile.email.split('@').next().unwrap_or_default().to_string());
            let role = role.unwrap_or(Role::Unassigned);
            let mut user = User::new(profile.email.clone(), username.clone(), RoleProfile::default_for(role, &username));
            user.refresh_token = grant.refresh_token.clone();
            (store.insert_user(&user).await?, true)
        }
    };

    if user.refresh_token.is_none() {
        warn!("User {} has no refresh token; calendar booking will be unavailable", user.id);
    }
    info!(
        "User {} signed in as {} ({})",
        user.id,
        user.role(),
        if created { "new" } else { "existing" }
    );

    let token = keys.issue(&user, Utc::now())?;
    Ok(SignIn { user, token, created })
}

/// Give an unassigned user their role.
pub async fn assign_role(
    store: &dyn Store,
    admins: &AdminAllowList,
    user_id: Uuid,
    role: Role,
) -> Result<User, AppError> {
    if role == Role::Unassigned {
        return Err(AppError::Validation("Invalid role provided".into()));
    }
    let admins = admins.clone();
    let user = store
        .modify_user(
            user_id,
            Box::new(move |user: &mut User| {
                if user.role() != Role::Unassigned {
                    return Err(role_conflict(user));
                }
                admins.check(role, &user.email)?;
                user.profile = RoleProfile::default_for(role, &user.username);
                user.updated_at = Utc::now();
                Ok(())
            }),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} does not exist", user_id)))?;
    info!("User {} assigned role {}", user_id, role);
    Ok(user)
}
