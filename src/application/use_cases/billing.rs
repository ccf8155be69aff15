use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        billing_event::{timestamp_to_naive, BillingEvent, BillingEventKind, EventOutcome},
        subscription::{Subscription, SubscriptionStatus},
    },
};

// ============================================================================
// Store Traits
// ============================================================================

/// Result of claiming an event id for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClaim {
    FirstSeen,
    AlreadyProcessed,
}

/// How a webhook delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Processed(EventOutcome),
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub company_id: Uuid,
    pub status: SubscriptionStatus,
    pub provider_subscription_id: String,
    pub provider_customer_id: String,
    pub current_period_end: Option<NaiveDateTime>,
    pub last_event_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct SubscriptionPatch {
    pub id: Uuid,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<NaiveDateTime>,
    pub last_event_at: NaiveDateTime,
    pub consecutive_failures: i32,
}

/// Transactional persistence boundary for one billing event.
///
/// All reads and writes issued through one unit of work commit atomically;
/// dropping it without commit rolls everything back.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn BillingUnitOfWork>>;
}

#[async_trait]
pub trait BillingUnitOfWork: Send {
    /// Insert-first idempotency claim on the event id. Relies on a
    /// storage-level uniqueness guarantee, not read-then-write: concurrent
    /// deliveries of the same id serialize on the unique key and exactly one
    /// observes `FirstSeen`.
    async fn try_claim(&mut self, event_id: &str, event_type: &str) -> AppResult<EventClaim>;

    /// Overwrite the outcome recorded by `try_claim` (which assumes
    /// `applied`). Must be called before commit, never after.
    async fn record_outcome(&mut self, event_id: &str, outcome: EventOutcome) -> AppResult<()>;

    async fn company_exists(&mut self, company_id: Uuid) -> AppResult<bool>;

    async fn subscription_by_company(
        &mut self,
        company_id: Uuid,
    ) -> AppResult<Option<Subscription>>;

    async fn subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>>;

    async fn insert_subscription(&mut self, new: &NewSubscription) -> AppResult<Subscription>;

    async fn update_subscription(&mut self, patch: &SubscriptionPatch) -> AppResult<()>;

    /// Flip the billing-derived entitlement flag for every member of the
    /// company. Returns the number of members touched.
    async fn set_company_entitlement(
        &mut self,
        company_id: Uuid,
        entitled: bool,
    ) -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Debug, Clone)]
pub struct BillingSettings {
    /// Consecutive payment failures tolerated before member entitlement is
    /// demoted.
    pub grace_period_failures: i32,
    /// Upper bound on the persistence work for one event. Expiry surfaces as
    /// `PersistenceTimeout` and a retryable response to the provider.
    pub persistence_timeout: std::time::Duration,
}

#[derive(Clone)]
pub struct BillingUseCases {
    store: Arc<dyn BillingStore>,
    settings: BillingSettings,
}

impl BillingUseCases {
    pub fn new(store: Arc<dyn BillingStore>, settings: BillingSettings) -> Self {
        Self { store, settings }
    }

    /// Apply one verified billing event exactly once.
    ///
    /// The idempotency claim, the subscription/member mutation and the outcome
    /// record share a single transaction: a transient failure rolls the whole
    /// event back and the provider's redelivery starts from scratch.
    pub async fn process_event(&self, event: &BillingEvent) -> AppResult<EventDisposition> {
        match tokio::time::timeout(self.settings.persistence_timeout, self.apply(event)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::PersistenceTimeout),
        }
    }

    async fn apply(&self, event: &BillingEvent) -> AppResult<EventDisposition> {
        let occurred_at = event.occurred_at().ok_or_else(|| {
            AppError::InvalidPayload("event carries an unusable timestamp".into())
        })?;

        let mut uow = self.store.begin().await?;

        if uow.try_claim(&event.id, &event.event_type).await? == EventClaim::AlreadyProcessed {
            debug!(event_id = %event.id, "event already processed, acknowledging redelivery");
            return Ok(EventDisposition::Duplicate);
        }

        let outcome = match event.kind() {
            BillingEventKind::SubscriptionCreated => {
                self.apply_subscription_created(uow.as_mut(), event, occurred_at)
                    .await?
            }
            BillingEventKind::SubscriptionUpdated => {
                self.apply_subscription_update(uow.as_mut(), event, occurred_at, None)
                    .await?
            }
            BillingEventKind::SubscriptionCanceled => {
                self.apply_subscription_update(
                    uow.as_mut(),
                    event,
                    occurred_at,
                    Some(SubscriptionStatus::Canceled),
                )
                .await?
            }
            BillingEventKind::PaymentFailed => {
                self.apply_payment_failed(uow.as_mut(), event, occurred_at)
                    .await?
            }
            BillingEventKind::PaymentSucceeded => {
                self.apply_payment_succeeded(uow.as_mut(), event, occurred_at)
                    .await?
            }
            BillingEventKind::Unrecognized => {
                debug!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "unhandled billing event type"
                );
                EventOutcome::Ignored
            }
        };

        if outcome != EventOutcome::Applied {
            uow.record_outcome(&event.id, outcome).await?;
        }
        uow.commit().await?;

        Ok(EventDisposition::Processed(outcome))
    }

    // ========================================================================
    // Event Handlers
    // ========================================================================

    async fn apply_subscription_created(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        event: &BillingEvent,
        occurred_at: NaiveDateTime,
    ) -> AppResult<EventOutcome> {
        let object = &event.data.object;
        let provider_subscription_id = object["id"].as_str().unwrap_or("");
        if provider_subscription_id.is_empty() {
            warn!(event_id = %event.id, "subscription event without a subscription id");
            return Ok(EventOutcome::Failed);
        }

        let company_id = object["metadata"]["company_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok());
        let Some(company_id) = company_id else {
            warn!(
                event_id = %event.id,
                provider_subscription_id,
                "subscription event without a usable company_id in metadata"
            );
            return Ok(EventOutcome::Failed);
        };

        if !uow.company_exists(company_id).await? {
            warn!(
                event_id = %event.id,
                company_id = %company_id,
                "billing event refers to an unknown company"
            );
            return Ok(EventOutcome::Failed);
        }

        // A manually replayed create must not produce a second subscription
        // for the company.
        if uow.subscription_by_company(company_id).await?.is_some() {
            warn!(
                event_id = %event.id,
                company_id = %company_id,
                "company already owns a subscription, refusing duplicate create"
            );
            return Ok(EventOutcome::Failed);
        }

        let status = SubscriptionStatus::from_provider(object["status"].as_str().unwrap_or(""));
        let subscription = uow
            .insert_subscription(&NewSubscription {
                company_id,
                status,
                provider_subscription_id: provider_subscription_id.to_string(),
                provider_customer_id: object["customer"].as_str().unwrap_or("").to_string(),
                current_period_end: object["current_period_end"]
                    .as_i64()
                    .and_then(timestamp_to_naive),
                last_event_at: occurred_at,
            })
            .await?;

        let members = uow
            .set_company_entitlement(company_id, status.is_entitled())
            .await?;

        info!(
            event_id = %event.id,
            company_id = %company_id,
            subscription_id = %subscription.id,
            status = %status,
            members,
            "subscription created from billing event"
        );
        Ok(EventOutcome::Applied)
    }

    async fn apply_subscription_update(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        event: &BillingEvent,
        occurred_at: NaiveDateTime,
        forced_status: Option<SubscriptionStatus>,
    ) -> AppResult<EventOutcome> {
        let object = &event.data.object;
        let provider_subscription_id = object["id"].as_str().unwrap_or("");

        let Some(subscription) = uow
            .subscription_by_provider_id(provider_subscription_id)
            .await?
        else {
            warn!(
                event_id = %event.id,
                provider_subscription_id,
                "subscription not found for billing event, skipping"
            );
            return Ok(EventOutcome::Failed);
        };

        if occurred_at < subscription.last_event_at {
            debug!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                "stale event older than last applied state, ignoring"
            );
            return Ok(EventOutcome::Ignored);
        }

        let status = forced_status.unwrap_or_else(|| {
            SubscriptionStatus::from_provider(object["status"].as_str().unwrap_or(""))
        });
        let entitled = status.is_entitled();

        uow.update_subscription(&SubscriptionPatch {
            id: subscription.id,
            status,
            current_period_end: object["current_period_end"]
                .as_i64()
                .and_then(timestamp_to_naive)
                .or(subscription.current_period_end),
            last_event_at: occurred_at,
            consecutive_failures: if entitled {
                0
            } else {
                subscription.consecutive_failures
            },
        })
        .await?;

        // Grace policy: a non-entitled status only demotes members on terminal
        // cancellation. past_due and incomplete leave entitlement untouched.
        if entitled {
            uow.set_company_entitlement(subscription.company_id, true)
                .await?;
        } else if status == SubscriptionStatus::Canceled {
            uow.set_company_entitlement(subscription.company_id, false)
                .await?;
        }

        info!(
            event_id = %event.id,
            subscription_id = %subscription.id,
            previous_status = %subscription.status,
            status = %status,
            "subscription status reconciled"
        );
        Ok(EventOutcome::Applied)
    }

    async fn apply_payment_failed(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        event: &BillingEvent,
        occurred_at: NaiveDateTime,
    ) -> AppResult<EventOutcome> {
        let invoice = &event.data.object;
        let provider_subscription_id = invoice["subscription"].as_str().unwrap_or("");

        let Some(subscription) = uow
            .subscription_by_provider_id(provider_subscription_id)
            .await?
        else {
            warn!(
                event_id = %event.id,
                provider_subscription_id,
                "payment failure for unknown subscription, skipping"
            );
            return Ok(EventOutcome::Failed);
        };

        if occurred_at < subscription.last_event_at {
            debug!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                "stale payment failure, ignoring"
            );
            return Ok(EventOutcome::Ignored);
        }

        let failures = subscription.consecutive_failures + 1;
        uow.update_subscription(&SubscriptionPatch {
            id: subscription.id,
            status: SubscriptionStatus::PastDue,
            current_period_end: subscription.current_period_end,
            last_event_at: occurred_at,
            consecutive_failures: failures,
        })
        .await?;

        if failures >= self.settings.grace_period_failures {
            let members = uow
                .set_company_entitlement(subscription.company_id, false)
                .await?;
            warn!(
                event_id = %event.id,
                company_id = %subscription.company_id,
                failures,
                members,
                "grace period exhausted, member entitlement demoted"
            );
        } else {
            info!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                failures,
                grace_limit = self.settings.grace_period_failures,
                "payment failed within grace period"
            );
        }
        Ok(EventOutcome::Applied)
    }

    async fn apply_payment_succeeded(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        event: &BillingEvent,
        occurred_at: NaiveDateTime,
    ) -> AppResult<EventOutcome> {
        let invoice = &event.data.object;
        let provider_subscription_id = invoice["subscription"].as_str().unwrap_or("");

        let Some(subscription) = uow
            .subscription_by_provider_id(provider_subscription_id)
            .await?
        else {
            warn!(
                event_id = %event.id,
                provider_subscription_id,
                "payment success for unknown subscription, skipping"
            );
            return Ok(EventOutcome::Failed);
        };

        if occurred_at < subscription.last_event_at {
            debug!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                "stale payment success, ignoring"
            );
            return Ok(EventOutcome::Ignored);
        }

        uow.update_subscription(&SubscriptionPatch {
            id: subscription.id,
            status: SubscriptionStatus::Active,
            current_period_end: invoice["period_end"]
                .as_i64()
                .and_then(timestamp_to_naive)
                .or(subscription.current_period_end),
            last_event_at: occurred_at,
            consecutive_failures: 0,
        })
        .await?;

        let members = uow
            .set_company_entitlement(subscription.company_id, true)
            .await?;

        info!(
            event_id = %event.id,
            subscription_id = %subscription.id,
            members,
            "payment succeeded, subscription renewed"
        );
        Ok(EventOutcome::Applied)
    }
}
