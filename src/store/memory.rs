use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    scheduling_conflict, DealEdit, DealFilter, DealStore, InvestmentFilter, InvestmentStore,
    MeetingFilter, MeetingStore, Settlement, StatisticsStore, UserEdit, UserStore,
};
use crate::errors::AppError;
use crate::models::dashboard::PlatformStatistics;
use crate::models::{Deal, DealStatus, Investment, Meeting, User};
use crate::services::ledger;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    deals: HashMap<Uuid, Deal>,
    investments: HashMap<Uuid, Investment>,
    meetings: HashMap<Uuid, Meeting>,
}

/// Process-local store. One lock guards all tables, which makes every
/// operation serializable; the guard is never held across an await.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let state = self.state.lock();
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock();
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<User, AppError> {
        let mut state = self.state.lock();
        if state.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::Conflict(format!("User with email {} already exists", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn modify_user(&self, id: Uuid, edit: UserEdit<'_>) -> Result<Option<User>, AppError> {
        let mut state = self.state.lock();
        let Some(current) = state.users.get(&id) else {
            return Ok(None);
        };
        let mut draft = current.clone();
        edit(&mut draft)?;
        state.users.insert(id, draft.clone());
        Ok(Some(draft))
    }

    async fn delete_user(&self, id: Uuid) -> Result<u64, AppError> {
        let mut state = self.state.lock();
        if state.users.remove(&id).is_none() {
            return Ok(0);
        }
        state.deals.retain(|_, d| d.startup_id != id);
        let State { deals, investments, .. } = &mut *state;
        investments.retain(|_, i| i.investor_id != id && deals.contains_key(&i.deal_id));
        state.meetings.retain(|_, m| m.investor_id != id && m.startup_id != id);
        Ok(1)
    }
}

#[async_trait]
impl DealStore for MemoryStore {
    async fn list_deals(&self, filter: DealFilter) -> Result<Vec<Deal>, AppError> {
        let state = self.state.lock();
        let mut deals: Vec<Deal> = state
            .deals
            .values()
            .filter(|d| filter.startup_id.map_or(true, |s| d.startup_id == s))
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .cloned()
            .collect();
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn find_deal(&self, id: Uuid) -> Result<Option<Deal>, AppError> {
        Ok(self.state.lock().deals.get(&id).cloned())
    }

    async fn insert_deal(&self, deal: &Deal) -> Result<Deal, AppError> {
        let mut state = self.state.lock();
        if !state.users.contains_key(&deal.startup_id) {
            return Err(AppError::NotFound(format!("Startup with id {} does not exist", deal.startup_id)));
        }
        state.deals.insert(deal.id, deal.clone());
        Ok(deal.clone())
    }

    async fn modify_deal(&self, id: Uuid, edit: DealEdit<'_>) -> Result<Option<Deal>, AppError> {
        let mut state = self.state.lock();
        let Some(current) = state.deals.get(&id) else {
            return Ok(None);
        };
        let mut draft = current.clone();
        edit(&mut draft)?;
        state.deals.insert(id, draft.clone());
        Ok(Some(draft))
    }

    async fn delete_deal(&self, id: Uuid) -> Result<u64, AppError> {
        let mut state = self.state.lock();
        if state.deals.remove(&id).is_none() {
            return Ok(0);
        }
        state.investments.retain(|_, i| i.deal_id != id);
        Ok(1)
    }
}

#[async_trait]
impl InvestmentStore for MemoryStore {
    async fn list_investments(&self, filter: InvestmentFilter) -> Result<Vec<Investment>, AppError> {
        let state = self.state.lock();
        let mut investments: Vec<Investment> = state
            .investments
            .values()
            .filter(|i| filter.investor_id.map_or(true, |v| i.investor_id == v))
            .filter(|i| filter.deal_id.map_or(true, |v| i.deal_id == v))
            .filter(|i| {
                filter.startup_id.map_or(true, |v| {
                    state.deals.get(&i.deal_id).map_or(false, |d| d.startup_id == v)
                })
            })
            .cloned()
            .collect();
        investments.sort_by(|a, b| b.investment_date.cmp(&a.investment_date));
        Ok(investments)
    }

    async fn find_investment(&self, id: Uuid) -> Result<Option<Investment>, AppError> {
        Ok(self.state.lock().investments.get(&id).cloned())
    }

    async fn record_investment(
        &self,
        investor_id: Uuid,
        deal_id: Uuid,
        amount: &BigDecimal,
        fee_rate: &BigDecimal,
    ) -> Result<Settlement, AppError> {
        let mut state = self.state.lock();

        // work on copies so a failed settlement leaves the tables as they were
        let mut investor = state
            .users
            .get(&investor_id)
            .cloned()
            .ok_or(ledger::SettlementError::InvestorUnavailable(investor_id))?;
        let mut deal = state
            .deals
            .get(&deal_id)
            .cloned()
            .ok_or(ledger::SettlementError::DealUnavailable(deal_id))?;
        let mut startup = state
            .users
            .get(&deal.startup_id)
            .cloned()
            .ok_or(ledger::SettlementError::DealUnavailable(deal_id))?;

        let investment = ledger::settle(&mut investor, &mut startup, &mut deal, amount, fee_rate, Utc::now())?;

        state.users.insert(investor.id, investor.clone());
        state.users.insert(startup.id, startup.clone());
        state.deals.insert(deal.id, deal.clone());
        state.investments.insert(investment.id, investment.clone());

        Ok(Settlement {
            investment,
            investor,
            startup,
            deal,
        })
    }

    async fn delete_investment(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(self.state.lock().investments.remove(&id).map_or(0, |_| 1))
    }
}

fn overlapping(
    state: &State,
    investor_id: Uuid,
    startup_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Meeting> {
    let mut found: Vec<Meeting> = state
        .meetings
        .values()
        .filter(|m| m.investor_id == investor_id || m.startup_id == startup_id)
        .filter(|m| m.overlaps(start, end))
        .cloned()
        .collect();
    found.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    found
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn list_meetings(&self, filter: MeetingFilter) -> Result<Vec<Meeting>, AppError> {
        let state = self.state.lock();
        let mut meetings: Vec<Meeting> = state
            .meetings
            .values()
            .filter(|m| filter.investor_id.map_or(true, |v| m.investor_id == v))
            .filter(|m| filter.startup_id.map_or(true, |v| m.startup_id == v))
            .filter(|m| filter.starting_after.map_or(true, |t| m.start_time > t))
            .cloned()
            .collect();
        meetings.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(meetings)
    }

    async fn find_overlapping_meetings(
        &self,
        investor_id: Uuid,
        startup_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, AppError> {
        let state = self.state.lock();
        Ok(overlapping(&state, investor_id, startup_id, start, end))
    }

    async fn insert_meeting(&self, meeting: &Meeting) -> Result<Meeting, AppError> {
        let mut state = self.state.lock();
        for party in [meeting.investor_id, meeting.startup_id] {
            if !state.users.contains_key(&party) {
                return Err(AppError::NotFound(format!("User with id {} does not exist", party)));
            }
        }
        let clashes = overlapping(
            &state,
            meeting.investor_id,
            meeting.startup_id,
            meeting.start_time,
            meeting.end_time,
        );
        if !clashes.is_empty() {
            return Err(scheduling_conflict());
        }
        state.meetings.insert(meeting.id, meeting.clone());
        Ok(meeting.clone())
    }

    async fn delete_meeting(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(self.state.lock().meetings.remove(&id).map_or(0, |_| 1))
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn platform_statistics(&self, now: DateTime<Utc>) -> Result<PlatformStatistics, AppError> {
        let state = self.state.lock();
        let month_ago = now - Duration::days(30);
        let count_deals = |status: DealStatus| state.deals.values().filter(|d| d.status == status).count() as i64;
        Ok(PlatformStatistics {
            total_users: state.users.len() as i64,
            new_users_last_30_days: state.users.values().filter(|u| u.created_at >= month_ago).count() as i64,
            total_deals: state.deals.len() as i64,
            active_deals: count_deals(DealStatus::Approved),
            pending_deals: count_deals(DealStatus::Pending),
            total_investments: state.investments.len() as i64,
            total_investment_amount: state
                .investments
                .values()
                .fold(BigDecimal::zero(), |acc, i| acc + &i.investment_amount),
            total_meetings: state.meetings.len() as i64,
            upcoming_meetings: state.meetings.values().filter(|m| m.start_time > now).count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateDeal, Role, RoleProfile};
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    async fn seed(store: &MemoryStore, investors: usize) -> (Vec<Uuid>, Uuid) {
        let startup = User::new("s@acme.io".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        store.insert_user(&startup).await.unwrap();
        let mut deal = Deal::new(
            startup.id,
            CreateDeal {
                name: "Seed".into(),
                minimum_investment: Some(dec("100")),
                ..Default::default()
            },
        );
        deal.status = DealStatus::Approved;
        store.insert_deal(&deal).await.unwrap();

        let mut ids = Vec::new();
        for n in 0..investors {
            let mut user = User::new(
                format!("inv{}@example.com", n),
                format!("Investor {}", n),
                RoleProfile::default_for(Role::Investor, ""),
            );
            user.investor_mut().unwrap().available_funds = dec("5000");
            store.insert_user(&user).await.unwrap();
            ids.push(user.id);
        }
        (ids, deal.id)
    }

    #[tokio::test]
    async fn test_concurrent_investments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let (investors, deal_id) = seed(&store, 10).await;

        let handles: Vec<_> = investors
            .into_iter()
            .map(|investor_id| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .record_investment(investor_id, deal_id, &dec("1000"), &ledger::default_fee_rate())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let deal = store.find_deal(deal_id).await.unwrap().unwrap();
        assert_eq!(deal.investor_count, 10);
        assert_eq!(deal.raised, dec("9700"));
        let all = store
            .list_investments(InvestmentFilter { deal_id: Some(deal_id), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(all.len(), 10);
    }

    #[tokio::test]
    async fn test_failed_settlement_persists_nothing() {
        let store = MemoryStore::new();
        let (investors, deal_id) = seed(&store, 1).await;

        let err = store
            .record_investment(investors[0], deal_id, &dec("50"), &ledger::default_fee_rate())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let deal = store.find_deal(deal_id).await.unwrap().unwrap();
        assert_eq!(deal.investor_count, 0);
        assert!(store.list_investments(InvestmentFilter::default()).await.unwrap().is_empty());
        let investor = store.find_user(investors[0]).await.unwrap().unwrap();
        assert_eq!(investor.investor().unwrap().available_funds, dec("5000"));
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let store = MemoryStore::new();
        let (investors, deal_id) = seed(&store, 1).await;

        let err = store
            .record_investment(Uuid::new_v4(), deal_id, &dec("500"), &ledger::default_fee_rate())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = store
            .record_investment(investors[0], Uuid::new_v4(), &dec("500"), &ledger::default_fee_rate())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = MemoryStore::new();
        let (investors, deal_id) = seed(&store, 1).await;
        store
            .record_investment(investors[0], deal_id, &dec("500"), &ledger::default_fee_rate())
            .await
            .unwrap();
        let deal = store.find_deal(deal_id).await.unwrap().unwrap();

        assert_eq!(store.delete_user(deal.startup_id).await.unwrap(), 1);
        assert!(store.find_deal(deal_id).await.unwrap().is_none());
        assert!(store.list_investments(InvestmentFilter::default()).await.unwrap().is_empty());
        assert_eq!(store.delete_user(deal.startup_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_meeting_rejects_overlap_atomically() {
        let store = MemoryStore::new();
        let (investors, deal_id) = seed(&store, 2).await;
        let startup_id = store.find_deal(deal_id).await.unwrap().unwrap().startup_id;
        let start = Utc::now() + Duration::days(1);
        let meeting = |investor_id| Meeting {
            id: Uuid::new_v4(),
            investor_id,
            startup_id,
            title: "Intro".into(),
            description: String::new(),
            start_time: start,
            end_time: start + Duration::hours(1),
            calendar_event_id: None,
            created_at: Utc::now(),
        };

        store.insert_meeting(&meeting(investors[0])).await.unwrap();
        // same startup, same slot
        let err = store.insert_meeting(&meeting(investors[1])).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
