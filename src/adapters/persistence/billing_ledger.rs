use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{
        subscription::{row_to_subscription, SELECT_COLS},
        PostgresPersistence,
    },
    app_error::{AppError, AppResult},
    application::use_cases::billing::{
        BillingStore, BillingUnitOfWork, EventClaim, NewSubscription, SubscriptionPatch,
    },
    domain::entities::{billing_event::EventOutcome, subscription::Subscription},
};

#[async_trait]
impl BillingStore for PostgresPersistence {
    async fn begin(&self) -> AppResult<Box<dyn BillingUnitOfWork>> {
        let tx = self.pool().begin().await.map_err(AppError::from)?;
        Ok(Box::new(PgBillingUnitOfWork { tx }))
    }
}

/// One database transaction spanning the idempotency claim, the
/// subscription/member mutation and the outcome record for a single event.
/// Dropping without commit rolls everything back.
struct PgBillingUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingUnitOfWork for PgBillingUnitOfWork {
    async fn try_claim(&mut self, event_id: &str, event_type: &str) -> AppResult<EventClaim> {
        // Insert-first: the unique key on event_id serializes concurrent
        // deliveries of the same event. A competing transaction blocks here
        // until the winner commits, then lands on the conflict arm.
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type, outcome)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(EventOutcome::Applied)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(if result.rows_affected() == 0 {
            EventClaim::AlreadyProcessed
        } else {
            EventClaim::FirstSeen
        })
    }

    async fn record_outcome(&mut self, event_id: &str, outcome: EventOutcome) -> AppResult<()> {
        sqlx::query("UPDATE processed_events SET outcome = $2 WHERE event_id = $1")
            .bind(event_id)
            .bind(outcome)
            .execute(&mut *self.tx)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn company_exists(&mut self, company_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1)")
            .bind(company_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(AppError::from)?;
        Ok(exists)
    }

    async fn subscription_by_company(
        &mut self,
        company_id: Uuid,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE company_id = $1 FOR UPDATE",
            SELECT_COLS
        ))
        .bind(company_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE provider_subscription_id = $1 FOR UPDATE",
            SELECT_COLS
        ))
        .bind(provider_subscription_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn insert_subscription(&mut self, new: &NewSubscription) -> AppResult<Subscription> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions
                (id, company_id, status, provider_subscription_id, provider_customer_id,
                 current_period_end, last_event_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(new.company_id)
        .bind(new.status)
        .bind(&new.provider_subscription_id)
        .bind(&new.provider_customer_id)
        .bind(new.current_period_end)
        .bind(new.last_event_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn update_subscription(&mut self, patch: &SubscriptionPatch) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                current_period_end = $3,
                last_event_at = $4,
                consecutive_failures = $5,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            "#,
        )
        .bind(patch.id)
        .bind(patch.status)
        .bind(patch.current_period_end)
        .bind(patch.last_event_at)
        .bind(patch.consecutive_failures)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_company_entitlement(
        &mut self,
        company_id: Uuid,
        entitled: bool,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE members SET
                entitled = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .bind(entitled)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(AppError::from)
    }
}
