use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::entitlement::SubscriptionRepo,
    domain::entities::subscription::Subscription,
};

pub(crate) const SELECT_COLS: &str = r#"
    id, company_id, status, provider_subscription_id, provider_customer_id,
    current_period_end, last_event_at, consecutive_failures, created_at, updated_at
"#;

pub(crate) fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        company_id: row.get("company_id"),
        status: row.get("status"),
        provider_subscription_id: row.get("provider_subscription_id"),
        provider_customer_id: row.get("provider_customer_id"),
        current_period_end: row.get("current_period_end"),
        last_event_at: row.get("last_event_at"),
        consecutive_failures: row.get("consecutive_failures"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_company(&self, company_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE company_id = $1",
            SELECT_COLS
        ))
        .bind(company_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn get_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE provider_subscription_id = $1",
            SELECT_COLS
        ))
        .bind(provider_subscription_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }
}
