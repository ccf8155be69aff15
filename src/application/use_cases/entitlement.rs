use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{capability::Capability, member::Member, subscription::Subscription},
};

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_company(&self, company_id: Uuid) -> AppResult<Option<Subscription>>;
    async fn get_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>>;
}

#[async_trait]
pub trait MemberRepo: Send + Sync {
    async fn get_by_company_and_user(
        &self,
        company_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Member>>;
}

// ============================================================================
// Cache Policy
// ============================================================================

/// Explicit cache configuration evaluated at the call site.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub ttl_ms: u64,
    /// Namespace label carried into trace output.
    pub key: String,
    /// When set, every check reads the persistence layer directly.
    pub skip: bool,
}

impl CachePolicy {
    pub fn disabled(key: &str) -> Self {
        Self {
            ttl_ms: 0,
            key: key.to_string(),
            skip: true,
        }
    }
}

struct CacheEntry {
    entitled: bool,
    expires_at: Instant,
}

// ============================================================================
// Use Cases
// ============================================================================

/// Synchronous entitlement checks for the hot path of business operations.
///
/// This is a pure read: reconciliation is the sole writer of subscription
/// state, and observing a delinquent subscription here only denies the
/// capability.
pub struct EntitlementUseCases {
    subscription_repo: Arc<dyn SubscriptionRepo>,
    member_repo: Arc<dyn MemberRepo>,
    cache_policy: CachePolicy,
    cache: Mutex<HashMap<Uuid, CacheEntry>>,
}

impl EntitlementUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepo>,
        member_repo: Arc<dyn MemberRepo>,
        cache_policy: CachePolicy,
    ) -> Self {
        Self {
            subscription_repo,
            member_repo,
            cache_policy,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the company's subscription currently grants the capability.
    pub async fn is_entitled(&self, company_id: Uuid, capability: Capability) -> AppResult<bool> {
        if !self.cache_policy.skip {
            if let Some(entitled) = self.cached(company_id) {
                trace!(
                    cache_key = %self.cache_policy.key,
                    company_id = %company_id,
                    %capability,
                    entitled,
                    "entitlement served from cache"
                );
                return Ok(entitled);
            }
        }

        let entitled = self
            .subscription_repo
            .get_by_company(company_id)
            .await?
            .map(|sub| sub.entitled_at(chrono::Utc::now().naive_utc()))
            .unwrap_or(false);

        if !self.cache_policy.skip {
            self.cache.lock().unwrap().insert(
                company_id,
                CacheEntry {
                    entitled,
                    expires_at: Instant::now() + Duration::from_millis(self.cache_policy.ttl_ms),
                },
            );
        }

        trace!(company_id = %company_id, %capability, entitled, "entitlement checked");
        Ok(entitled)
    }

    /// Company-level gate combined with the member's own status and
    /// permissions.
    pub async fn member_may(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        capability: Capability,
    ) -> AppResult<bool> {
        if !self.is_entitled(company_id, capability).await? {
            return Ok(false);
        }
        let Some(member) = self
            .member_repo
            .get_by_company_and_user(company_id, user_id)
            .await?
        else {
            return Ok(false);
        };
        Ok(member.may(capability))
    }

    fn cached(&self, company_id: Uuid) -> Option<bool> {
        let cache = self.cache.lock().unwrap();
        cache
            .get(&company_id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.entitled)
    }
}
