use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Role, User};
use crate::state::AppState;

/// The user behind a valid `Authorization: Bearer <token>` header, loaded
/// fresh from the store so role changes and deletions apply immediately.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let claims = state.tokens.verify(token)?;
        let user = state.store.find_user(claims.sub).await?.ok_or_else(|| {
            warn!("Token presented for unknown user {}", claims.sub);
            AppError::Unauthorized
        })?;
        Ok(AuthUser(user))
    }
}

fn forbidden() -> AppError {
    AppError::Forbidden("You do not have permission to perform this action.".into())
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.0.role() == role {
            Ok(())
        } else {
            Err(forbidden())
        }
    }

    /// The caller must hold `role` and be the user named in the path.
    pub fn require_self(&self, role: Role, path_id: Uuid) -> Result<(), AppError> {
        self.require_role(role)?;
        if self.0.id == path_id {
            Ok(())
        } else {
            Err(forbidden())
        }
    }
}
