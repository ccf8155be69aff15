use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// Convert a provider Unix timestamp to NaiveDateTime.
pub fn timestamp_to_naive(secs: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

/// A signature-verified billing event as delivered by the payment provider.
/// Immutable once received; `id` is the deduplication key.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix timestamp the provider assigned when the event occurred.
    pub created: i64,
    pub data: BillingEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventKind {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionCanceled,
    PaymentFailed,
    PaymentSucceeded,
    Unrecognized,
}

impl BillingEvent {
    pub fn kind(&self) -> BillingEventKind {
        match self.event_type.as_str() {
            "customer.subscription.created" => BillingEventKind::SubscriptionCreated,
            "customer.subscription.updated" => BillingEventKind::SubscriptionUpdated,
            "customer.subscription.deleted" => BillingEventKind::SubscriptionCanceled,
            "invoice.payment_failed" => BillingEventKind::PaymentFailed,
            // invoice.payment_succeeded is the newer event name, invoice.paid
            // still arrives from older Stripe webhook configurations
            "invoice.paid" | "invoice.payment_succeeded" => BillingEventKind::PaymentSucceeded,
            _ => BillingEventKind::Unrecognized,
        }
    }

    pub fn occurred_at(&self) -> Option<NaiveDateTime> {
        timestamp_to_naive(self.created)
    }
}

/// Outcome recorded for each distinct event id, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, strum::Display)]
#[sqlx(type_name = "event_outcome", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventOutcome {
    Applied,
    Ignored,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ProcessedEventRecord {
    pub event_id: String,
    pub event_type: String,
    pub outcome: EventOutcome,
    pub processed_at: Option<NaiveDateTime>,
}
