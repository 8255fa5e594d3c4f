use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::notifier::Notifier;
use crate::models::Role;
use crate::services::{notification_service, profile_service};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataroomDelivery {
    pub delivered: bool,
    pub message: String,
}

/// Email the deal's dataroom link to the requesting investor.
pub async fn request_access(
    store: &dyn Store,
    notifier: &dyn Notifier,
    investor_id: Uuid,
    deal_id: Uuid,
) -> Result<DataroomDelivery, AppError> {
    let investor = profile_service::require(store, investor_id, Role::Investor).await?;
    let deal = store
        .find_deal(deal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Deal with id {} does not exist", deal_id)))?;

    let url = deal
        .dataroom_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No dataroom file available for this deal.".into()))?;

    let email = notification_service::dataroom_link(&investor, &deal, url);
    let delivered = notification_service::send_best_effort(notifier, &email).await;
    info!(
        "Dataroom of deal {} requested by investor {} (delivered: {})",
        deal_id, investor_id, delivered
    );

    let message = if delivered {
        "Dataroom sent successfully to your email"
    } else {
        "Dataroom email could not be delivered, please try again later"
    };
    Ok(DataroomDelivery {
        delivered,
        message: message.to_string(),
    })
}
