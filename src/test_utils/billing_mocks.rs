//! In-memory implementations of the billing persistence traits.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{
        CheckoutSession, CheckoutSessionRequest, PaymentProviderPort, PortalSession,
    },
    application::use_cases::{
        billing::{
            BillingStore, BillingUnitOfWork, EventClaim, NewSubscription, SubscriptionPatch,
        },
        checkout::CompanyRepo,
        entitlement::{MemberRepo, SubscriptionRepo},
    },
    domain::entities::{
        billing_event::{EventOutcome, ProcessedEventRecord},
        company::Company,
        member::Member,
        subscription::Subscription,
    },
};

// ============================================================================
// InMemoryBillingStore
// ============================================================================

#[derive(Default)]
struct LedgerState {
    companies: HashMap<Uuid, Company>,
    subscriptions: HashMap<Uuid, Subscription>,
    members: HashMap<Uuid, Member>,
    processed: HashMap<String, ProcessedEventRecord>,
    /// Event ids claimed by units of work that have not committed yet.
    /// Stands in for the blocking behavior of the unique index.
    claiming: HashSet<String>,
}

/// Shared in-memory stand-in for the Postgres persistence. Implements the
/// read repositories directly and hands out write-behind units of work whose
/// staged mutations become visible only on commit.
#[derive(Clone, Default)]
pub struct InMemoryBillingStore {
    state: Arc<Mutex<LedgerState>>,
    fail_entitlement: Arc<AtomicBool>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_company(&self, company: Company) {
        self.state
            .lock()
            .unwrap()
            .companies
            .insert(company.id, company);
    }

    pub fn seed_member(&self, member: Member) {
        self.state.lock().unwrap().members.insert(member.id, member);
    }

    pub fn seed_subscription(&self, subscription: Subscription) {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub fn subscription_for_company(&self, company_id: Uuid) -> Option<Subscription> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .find(|s| s.company_id == company_id)
            .cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions.len()
    }

    pub fn members_of_company(&self, company_id: Uuid) -> Vec<Member> {
        self.state
            .lock()
            .unwrap()
            .members
            .values()
            .filter(|m| m.company_id == company_id)
            .cloned()
            .collect()
    }

    pub fn processed(&self, event_id: &str) -> Option<ProcessedEventRecord> {
        self.state.lock().unwrap().processed.get(event_id).cloned()
    }

    pub fn processed_count(&self) -> usize {
        self.state.lock().unwrap().processed.len()
    }

    /// Mutate a seeded subscription directly, bypassing the reconciler.
    pub fn update_subscription_for_test(
        &self,
        company_id: Uuid,
        update: impl FnOnce(&mut Subscription),
    ) {
        let mut state = self.state.lock().unwrap();
        let subscription = state
            .subscriptions
            .values_mut()
            .find(|s| s.company_id == company_id)
            .expect("no subscription seeded for company");
        update(subscription);
    }

    /// Make every subsequent entitlement write fail with a database error,
    /// for atomicity tests.
    pub fn fail_entitlement_writes(&self, fail: bool) {
        self.fail_entitlement.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn begin(&self) -> AppResult<Box<dyn BillingUnitOfWork>> {
        Ok(Box::new(InMemoryBillingUow {
            store: self.clone(),
            staged: StagedWrites::default(),
            claims: Vec::new(),
            committed: false,
        }))
    }
}

#[async_trait]
impl SubscriptionRepo for InMemoryBillingStore {
    async fn get_by_company(&self, company_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.subscription_for_company(company_id))
    }

    async fn get_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .find(|s| s.provider_subscription_id == provider_subscription_id)
            .cloned())
    }
}

#[async_trait]
impl MemberRepo for InMemoryBillingStore {
    async fn get_by_company_and_user(
        &self,
        company_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Member>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .members
            .values()
            .find(|m| m.company_id == company_id && m.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl CompanyRepo for InMemoryBillingStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Company>> {
        Ok(self.state.lock().unwrap().companies.get(&id).cloned())
    }
}

// ============================================================================
// InMemoryBillingUow
// ============================================================================

#[derive(Default)]
struct StagedWrites {
    inserted_subscriptions: Vec<Subscription>,
    subscription_patches: Vec<SubscriptionPatch>,
    entitlement_updates: Vec<(Uuid, bool)>,
    processed: Vec<ProcessedEventRecord>,
}

struct InMemoryBillingUow {
    store: InMemoryBillingStore,
    staged: StagedWrites,
    claims: Vec<String>,
    committed: bool,
}

impl InMemoryBillingUow {
    fn patched(&self, mut subscription: Subscription) -> Subscription {
        for patch in &self.staged.subscription_patches {
            if patch.id == subscription.id {
                subscription.status = patch.status;
                subscription.current_period_end = patch.current_period_end;
                subscription.last_event_at = patch.last_event_at;
                subscription.consecutive_failures = patch.consecutive_failures;
            }
        }
        subscription
    }
}

#[async_trait]
impl BillingUnitOfWork for InMemoryBillingUow {
    async fn try_claim(&mut self, event_id: &str, event_type: &str) -> AppResult<EventClaim> {
        let mut state = self.store.state.lock().unwrap();
        if state.processed.contains_key(event_id) || state.claiming.contains(event_id) {
            return Ok(EventClaim::AlreadyProcessed);
        }
        state.claiming.insert(event_id.to_string());
        drop(state);

        self.claims.push(event_id.to_string());
        self.staged.processed.push(ProcessedEventRecord {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            outcome: EventOutcome::Applied,
            processed_at: Some(chrono::Utc::now().naive_utc()),
        });
        Ok(EventClaim::FirstSeen)
    }

    async fn record_outcome(&mut self, event_id: &str, outcome: EventOutcome) -> AppResult<()> {
        let record = self
            .staged
            .processed
            .iter_mut()
            .find(|r| r.event_id == event_id)
            .ok_or_else(|| AppError::Internal("outcome recorded for unclaimed event".into()))?;
        record.outcome = outcome;
        Ok(())
    }

    async fn company_exists(&mut self, company_id: Uuid) -> AppResult<bool> {
        Ok(self
            .store
            .state
            .lock()
            .unwrap()
            .companies
            .contains_key(&company_id))
    }

    async fn subscription_by_company(
        &mut self,
        company_id: Uuid,
    ) -> AppResult<Option<Subscription>> {
        if let Some(staged) = self
            .staged
            .inserted_subscriptions
            .iter()
            .find(|s| s.company_id == company_id)
        {
            return Ok(Some(self.patched(staged.clone())));
        }
        Ok(self
            .store
            .subscription_for_company(company_id)
            .map(|s| self.patched(s)))
    }

    async fn subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        if let Some(staged) = self
            .staged
            .inserted_subscriptions
            .iter()
            .find(|s| s.provider_subscription_id == provider_subscription_id)
        {
            return Ok(Some(self.patched(staged.clone())));
        }
        let shared = self
            .store
            .state
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .find(|s| s.provider_subscription_id == provider_subscription_id)
            .cloned();
        Ok(shared.map(|s| self.patched(s)))
    }

    async fn insert_subscription(&mut self, new: &NewSubscription) -> AppResult<Subscription> {
        let duplicate = {
            let state = self.store.state.lock().unwrap();
            state.subscriptions.values().any(|s| {
                s.company_id == new.company_id
                    || s.provider_subscription_id == new.provider_subscription_id
            })
        } || self.staged.inserted_subscriptions.iter().any(|s| {
            s.company_id == new.company_id
                || s.provider_subscription_id == new.provider_subscription_id
        });
        if duplicate {
            return Err(AppError::Database(
                "duplicate key value violates unique constraint".into(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            status: new.status,
            provider_subscription_id: new.provider_subscription_id.clone(),
            provider_customer_id: new.provider_customer_id.clone(),
            current_period_end: new.current_period_end,
            last_event_at: new.last_event_at,
            consecutive_failures: 0,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.staged.inserted_subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn update_subscription(&mut self, patch: &SubscriptionPatch) -> AppResult<()> {
        self.staged.subscription_patches.push(patch.clone());
        Ok(())
    }

    async fn set_company_entitlement(
        &mut self,
        company_id: Uuid,
        entitled: bool,
    ) -> AppResult<u64> {
        if self.store.fail_entitlement.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "injected entitlement write failure".into(),
            ));
        }
        self.staged.entitlement_updates.push((company_id, entitled));
        let count = self
            .store
            .state
            .lock()
            .unwrap()
            .members
            .values()
            .filter(|m| m.company_id == company_id)
            .count();
        Ok(count as u64)
    }

    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        let now = chrono::Utc::now().naive_utc();
        let mut state = self.store.state.lock().unwrap();

        for subscription in self.staged.inserted_subscriptions.drain(..) {
            state.subscriptions.insert(subscription.id, subscription);
        }
        for patch in self.staged.subscription_patches.drain(..) {
            if let Some(subscription) = state.subscriptions.get_mut(&patch.id) {
                subscription.status = patch.status;
                subscription.current_period_end = patch.current_period_end;
                subscription.last_event_at = patch.last_event_at;
                subscription.consecutive_failures = patch.consecutive_failures;
                subscription.updated_at = Some(now);
            }
        }
        for (company_id, entitled) in self.staged.entitlement_updates.drain(..) {
            for member in state
                .members
                .values_mut()
                .filter(|m| m.company_id == company_id)
            {
                member.entitled = entitled;
                member.updated_at = Some(now);
            }
        }
        for record in self.staged.processed.drain(..) {
            state.processed.insert(record.event_id.clone(), record);
        }
        for claim in self.claims.drain(..) {
            state.claiming.remove(&claim);
        }
        self.committed = true;
        Ok(())
    }
}

impl Drop for InMemoryBillingUow {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Rolled back: release in-flight claims so redelivery can retry.
        let mut state = self.store.state.lock().unwrap();
        for claim in &self.claims {
            state.claiming.remove(claim);
        }
    }
}

// ============================================================================
// StubPaymentProvider
// ============================================================================

/// Canned payment-provider responses for checkout and portal tests.
pub struct StubPaymentProvider {
    checkout_calls: AtomicUsize,
    portal_customers: Mutex<Vec<String>>,
}

impl StubPaymentProvider {
    pub fn new() -> Self {
        Self {
            checkout_calls: AtomicUsize::new(0),
            portal_customers: Mutex::new(Vec::new()),
        }
    }

    pub fn checkout_requests(&self) -> usize {
        self.checkout_calls.load(Ordering::SeqCst)
    }

    pub fn last_portal_customer(&self) -> Option<String> {
        self.portal_customers.lock().unwrap().last().cloned()
    }
}

impl Default for StubPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProviderPort for StubPaymentProvider {
    async fn create_checkout_session(
        &self,
        _request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession> {
        self.checkout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutSession {
            id: "cs_test123".to_string(),
            url: Some("https://checkout.example.com/c/cs_test123".to_string()),
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        _return_url: &str,
    ) -> AppResult<PortalSession> {
        self.portal_customers
            .lock()
            .unwrap()
            .push(customer_id.to_string());
        Ok(PortalSession {
            url: "https://billing.example.com/p/session_test".to_string(),
        })
    }
}
