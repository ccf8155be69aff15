use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{
        CheckoutSession, CheckoutSessionRequest, PaymentProviderPort, PortalSession,
    },
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Thin Stripe REST client for the hosted checkout and billing-portal flows.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    api_version: String,
}

impl StripeClient {
    pub fn new(secret_key: SecretString, api_version: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            api_version,
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        let response = self
            .client
            .post(format!("{}{}", STRIPE_API_BASE, path))
            .header("Authorization", self.auth_header())
            .header("Stripe-Version", &self.api_version)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::InvalidInput(format!(
                    "Stripe error: {}",
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Internal(format!(
                "Stripe API error: {} - {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Internal(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProviderPort for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession> {
        let company_id = request.company_id.to_string();
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), request.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), company_id.clone()),
            // The reconciler attributes subscription events to the company
            // through this metadata entry.
            (
                "subscription_data[metadata][company_id]".to_string(),
                company_id,
            ),
        ];

        if let Some(days) = request.trial_days {
            if days > 0 {
                params.push((
                    "subscription_data[trial_period_days]".to_string(),
                    days.to_string(),
                ));
            }
        }

        let session: StripeCheckoutSession = self.post_form("/checkout/sessions", &params).await?;
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<PortalSession> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];

        let session: StripePortalSession =
            self.post_form("/billing_portal/sessions", &params).await?;
        Ok(PortalSession { url: session.url })
    }
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripePortalSession {
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}
