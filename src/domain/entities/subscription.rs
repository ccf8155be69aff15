use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }

    /// Map a provider-reported status string.
    /// Unknown statuses become Incomplete - never grant access by default.
    pub fn from_provider(s: &str) -> Self {
        match s {
            "trialing" => SubscriptionStatus::Trialing,
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "incomplete" => SubscriptionStatus::Incomplete,
            _ => SubscriptionStatus::Incomplete,
        }
    }

    /// Whether this status grants access to gated capabilities.
    pub fn is_entitled(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub company_id: Uuid,
    pub status: SubscriptionStatus,
    pub provider_subscription_id: String,
    pub provider_customer_id: String,
    pub current_period_end: Option<NaiveDateTime>,
    /// Timestamp of the last billing event applied to this row. Events older
    /// than this are stale and must not overwrite the status.
    pub last_event_at: NaiveDateTime,
    pub consecutive_failures: i32,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Subscription {
    /// Whether the subscription grants access at the given instant.
    /// Trialing subscriptions expire with their period end.
    pub fn entitled_at(&self, now: NaiveDateTime) -> bool {
        match self.status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trialing => self
                .current_period_end
                .map(|end| now <= end)
                .unwrap_or(false),
            _ => false,
        }
    }
}
