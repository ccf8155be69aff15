//! Test data factories for creating valid test fixtures.
//!
//! Each factory creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    billing_event::{BillingEvent, BillingEventData},
    company::Company,
    member::{Member, MemberStatus, Permission},
    subscription::{Subscription, SubscriptionStatus},
};

pub fn create_test_company(overrides: impl FnOnce(&mut Company)) -> Company {
    let mut company = Company {
        id: Uuid::new_v4(),
        name: "Acme Inc".to_string(),
        created_at: Some(test_datetime()),
    };
    overrides(&mut company);
    company
}

pub fn create_test_member(company_id: Uuid, overrides: impl FnOnce(&mut Member)) -> Member {
    let mut member = Member {
        id: Uuid::new_v4(),
        company_id,
        user_id: Uuid::new_v4(),
        permissions: vec![Permission::Edit, Permission::View],
        status: MemberStatus::Active,
        entitled: true,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut member);
    member
}

pub fn create_test_subscription(
    company_id: Uuid,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        company_id,
        status: SubscriptionStatus::Active,
        provider_subscription_id: format!("sub_test{}", Uuid::new_v4().simple()),
        provider_customer_id: format!("cus_test{}", Uuid::new_v4().simple()),
        // Relative to the wall clock so trial-window checks behave.
        current_period_end: Some(chrono::Utc::now().naive_utc() + chrono::Duration::days(30)),
        last_event_at: test_datetime(),
        consecutive_failures: 0,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut subscription);
    subscription
}

/// Assemble a billing event from its provider-side parts.
pub fn billing_event(
    id: &str,
    event_type: &str,
    created: i64,
    object: serde_json::Value,
) -> BillingEvent {
    BillingEvent {
        id: id.to_string(),
        event_type: event_type.to_string(),
        created,
        data: BillingEventData { object },
    }
}

/// Provider subscription object as it appears in `data.object` of
/// subscription lifecycle events. Carries the company attribution in
/// metadata the same way the checkout flow stamps it.
pub fn subscription_object(
    company_id: Uuid,
    provider_subscription_id: &str,
    status: &str,
) -> serde_json::Value {
    serde_json::json!({
        "id": provider_subscription_id,
        "object": "subscription",
        "status": status,
        "customer": "cus_test123",
        "current_period_end": 1709251200,
        "metadata": { "company_id": company_id.to_string() }
    })
}

/// Provider invoice object as it appears in `data.object` of payment events.
pub fn invoice_object(provider_subscription_id: &str, period_end: i64) -> serde_json::Value {
    serde_json::json!({
        "id": "in_test123",
        "object": "invoice",
        "subscription": provider_subscription_id,
        "customer": "cus_test123",
        "amount_due": 4900,
        "period_end": period_end
    })
}

/// Returns a consistent test datetime (2024-01-15 12:00:00 UTC).
pub fn test_datetime() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-01-15 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_factory_applies_overrides() {
        let company = create_test_company(|c| c.name = "Initech".to_string());
        assert_eq!(company.name, "Initech");
    }

    #[test]
    fn member_factory_defaults_to_entitled_editor() {
        let company_id = Uuid::new_v4();
        let member = create_test_member(company_id, |_| {});
        assert_eq!(member.company_id, company_id);
        assert!(member.entitled);
        assert!(member.permissions.contains(&Permission::Edit));
    }

    #[test]
    fn subscription_object_carries_company_metadata() {
        let company_id = Uuid::new_v4();
        let object = subscription_object(company_id, "sub_1", "active");
        assert_eq!(
            object["metadata"]["company_id"].as_str().unwrap(),
            company_id.to_string()
        );
    }
}
