//! `{data: {attributes: ...}}` request bodies and `{type, id, attributes}`
//! response documents.

use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Deal, Investment, Meeting, User, UserView};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Attributes<T>,
}

#[derive(Debug, Deserialize)]
pub struct Attributes<T> {
    pub attributes: T,
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        self.data.attributes
    }
}

fn attributes<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("failed to serialize response: {}", e)))
}

pub fn document(kind: &str, id: Uuid, value: &impl Serialize) -> Result<Value, AppError> {
    Ok(json!({ "type": kind, "id": id, "attributes": attributes(value)? }))
}

/// `{attributes}` for documents that are not a single stored resource.
pub fn plain_document(value: &impl Serialize) -> Result<Value, AppError> {
    Ok(json!({ "attributes": attributes(value)? }))
}

pub fn user_document(user: &User) -> Result<Value, AppError> {
    document(user.role().as_str(), user.id, &UserView::from(user))
}

pub fn deal_document(deal: &Deal) -> Result<Value, AppError> {
    document("deal", deal.id, deal)
}

pub fn investment_document(investment: &Investment) -> Result<Value, AppError> {
    document("investment", investment.id, investment)
}

pub fn meeting_document(meeting: &Meeting) -> Result<Value, AppError> {
    document("meeting", meeting.id, meeting)
}

/// `{data: [...]}` built with one of the `*_document` functions.
pub fn collection<T>(items: &[T], to_doc: impl Fn(&T) -> Result<Value, AppError>) -> Result<Json<Value>, AppError> {
    let data = items.iter().map(to_doc).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(json!({ "data": data })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateDeal, Role, RoleProfile};

    #[test]
    fn test_request_envelope_unwraps_attributes() {
        let body = r#"{"data":{"attributes":{"investment_amount":"5000"}}}"#;
        let parsed: Envelope<crate::models::CreateInvestment> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_inner().investment_amount.to_string(), "5000");
    }

    #[test]
    fn test_documents_carry_type_and_id() {
        let user = User::new("ivy@example.com".into(), "Ivy".into(), RoleProfile::default_for(Role::Investor, ""));
        let doc = user_document(&user).unwrap();
        assert_eq!(doc["type"], "investor");
        assert_eq!(doc["id"], user.id.to_string());
        assert_eq!(doc["attributes"]["email"], "ivy@example.com");

        let deal = Deal::new(user.id, CreateDeal { name: "Seed".into(), ..Default::default() });
        let Json(list) = collection(std::slice::from_ref(&deal), deal_document).unwrap();
        assert_eq!(list["data"][0]["type"], "deal");
        assert_eq!(list["data"][0]["attributes"]["status"], "pending");
    }
}
