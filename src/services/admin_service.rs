use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::User;
use crate::store::Store;

pub async fn list_users(store: &dyn Store) -> Result<Vec<User>, AppError> {
    store.list_users().await
}

pub async fn get_user(store: &dyn Store, user_id: Uuid) -> Result<User, AppError> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} does not exist", user_id)))
}

/// Removes the user together with their deals, investments and meetings.
pub async fn delete_user(store: &dyn Store, user_id: Uuid) -> Result<(), AppError> {
    match store.delete_user(user_id).await? {
        0 => Err(AppError::NotFound(format!("User with id {} does not exist", user_id))),
        _ => {
            info!("User {} deleted", user_id);
            Ok(())
        }
    }
}
