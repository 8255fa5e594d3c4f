use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::external::calendar::CalendarProvider;
use crate::external::identity::IdentityProvider;
use crate::external::notifier::Notifier;
use crate::services::auth_service::{AdminAllowList, TokenKeys};
use crate::services::meeting_service::CalendarBooking;
use crate::services::throttle::Throttles;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub identity: Arc<dyn IdentityProvider>,
    /// `None` when calendar integration is disabled.
    pub calendar: Option<Arc<dyn CalendarProvider>>,
    pub tokens: TokenKeys,
    pub admins: AdminAllowList,
    pub throttles: Throttles,
    pub fee_rate: BigDecimal,
}

impl AppState {
    pub fn calendar_booking(&self) -> Option<CalendarBooking<'_>> {
        self.calendar.as_deref().map(|calendar| CalendarBooking {
            identity: self.identity.as_ref(),
            calendar,
        })
    }
}
