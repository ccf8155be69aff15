use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{
        CheckoutSession, CheckoutSessionRequest, PaymentProviderPort, PortalSession,
    },
    application::use_cases::entitlement::SubscriptionRepo,
    domain::entities::company::Company,
};

#[async_trait]
pub trait CompanyRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Company>>;
}

#[derive(Debug, Clone)]
pub struct StartCheckoutInput {
    pub company_id: Uuid,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub trial_days: Option<i32>,
}

/// Starts provider-hosted checkout and billing-portal sessions.
///
/// Checkout is where the company id gets stamped onto the provider
/// subscription, which is what lets the webhook reconciler attribute
/// subscription events back to a tenant.
#[derive(Clone)]
pub struct CheckoutUseCases {
    company_repo: Arc<dyn CompanyRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    payment_provider: Arc<dyn PaymentProviderPort>,
}

impl CheckoutUseCases {
    pub fn new(
        company_repo: Arc<dyn CompanyRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        payment_provider: Arc<dyn PaymentProviderPort>,
    ) -> Self {
        Self {
            company_repo,
            subscription_repo,
            payment_provider,
        }
    }

    pub async fn start_checkout(&self, input: &StartCheckoutInput) -> AppResult<CheckoutSession> {
        validate_redirect_url(&input.success_url, "success_url")?;
        validate_redirect_url(&input.cancel_url, "cancel_url")?;

        let company = self
            .company_repo
            .get_by_id(input.company_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(subscription) = self
            .subscription_repo
            .get_by_company(company.id)
            .await?
        {
            if subscription.status.is_entitled() {
                return Err(AppError::InvalidInput(
                    "Company already has an active subscription".into(),
                ));
            }
        }

        let session = self
            .payment_provider
            .create_checkout_session(&CheckoutSessionRequest {
                company_id: company.id,
                price_id: input.price_id.clone(),
                success_url: input.success_url.clone(),
                cancel_url: input.cancel_url.clone(),
                trial_days: input.trial_days,
            })
            .await?;

        info!(
            company_id = %company.id,
            session_id = %session.id,
            "checkout session created"
        );
        Ok(session)
    }

    pub async fn open_billing_portal(
        &self,
        company_id: Uuid,
        return_url: &str,
    ) -> AppResult<PortalSession> {
        validate_redirect_url(return_url, "return_url")?;

        let subscription = self
            .subscription_repo
            .get_by_company(company_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.payment_provider
            .create_portal_session(&subscription.provider_customer_id, return_url)
            .await
    }
}

fn validate_redirect_url(value: &str, field: &str) -> AppResult<()> {
    let url =
        Url::parse(value).map_err(|_| AppError::InvalidInput(format!("{field} is not a URL")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::InvalidInput(format!(
            "{field} must be an http(s) URL"
        )));
    }
    Ok(())
}
