// ── Session facade ──
//
// Wires one ApiClient, one QueryRegistry, one FreshnessPolicy and one
// MutationCoordinator together and hands out per-resource controllers.
// Everything is Arc-backed: cloning a Session is cheap and all clones
// share the same cache.

use std::sync::Arc;

use chrono::Duration;
use futures::FutureExt;
use larder_api::{
    ApiClient, ListQuery, Milestone, MilestonePayload, MilestoneRequirement, Payment,
    PaymentReport, Recipe, RecipePayload, RequirementPayload, Subscription, SubscriptionPatch,
    TradeOffer, TradeOfferModeration, TransportConfig, Unit, User, UserPatch,
};
use uuid::Uuid;

use crate::cache::QueryRegistry;
use crate::error::SyncError;
use crate::freshness::FreshnessPolicy;
use crate::key::{ParamValue, ResourceKey, ResourceKind};
use crate::list::{ListController, ListFetcher};
use crate::mutation::{MutationCoordinator, MutationIntent};

struct SessionInner {
    api: Arc<ApiClient>,
    registry: Arc<QueryRegistry>,
    policy: FreshnessPolicy,
    coordinator: MutationCoordinator,
}

/// One authenticated connection to the backend plus its client-side
/// cache. Dropping the last clone drops the cache with it; [`end`]
/// clears it eagerly (logout).
///
/// [`end`]: Session::end
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn connect(base_url: &str, transport: &TransportConfig) -> Result<Self, SyncError> {
        Ok(Self::from_client(ApiClient::new(base_url, transport)?))
    }

    pub fn from_client(api: ApiClient) -> Self {
        Self::from_parts(api, FreshnessPolicy::new())
    }

    pub fn from_parts(api: ApiClient, policy: FreshnessPolicy) -> Self {
        let registry = Arc::new(QueryRegistry::new());
        Self {
            inner: Arc::new(SessionInner {
                api: Arc::new(api),
                coordinator: MutationCoordinator::new(Arc::clone(&registry)),
                registry,
                policy,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<QueryRegistry> {
        &self.inner.registry
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Clear all cached state. Call on logout or account switch.
    pub fn end(&self) {
        self.inner.registry.clear();
    }

    /// Evict entries unreferenced for longer than the grace period.
    pub fn sweep(&self, grace: Duration) {
        self.inner.registry.sweep(grace);
    }

    fn controller<T: Send + Sync + 'static>(
        &self,
        kind: ResourceKind,
        fetcher: ListFetcher<T>,
    ) -> ListController<T> {
        ListController::new(
            Arc::clone(&self.inner.registry),
            kind,
            self.inner.policy.stale_after(kind),
            fetcher,
        )
    }

    async fn entity<T, F, Fut>(&self, key: ResourceKey, fetch: F) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Arc<ApiClient>) -> Fut,
        Fut: std::future::Future<Output = Option<T>> + Send + 'static,
    {
        let stale_after = self.inner.policy.stale_after(key.kind);
        let pending = fetch(Arc::clone(&self.inner.api));
        self.inner
            .registry
            .ensure_fresh::<Option<T>, _, _>(&key, stale_after, move || async move {
                Ok::<_, larder_api::Error>(pending.await)
            })
            .await
            .ok()
            .and_then(|cached| (*cached).clone())
    }

    // ── Milestones ───────────────────────────────────────────────────

    pub fn milestones(&self) -> ListController<Milestone> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::Milestones,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_milestones(&query).await) }.boxed()
            }),
        )
    }

    pub async fn milestone(&self, id: Uuid) -> Option<Milestone> {
        let key = ResourceKey::entity(ResourceKind::Milestones, id);
        self.entity(key, move |api| async move { api.milestone(&id).await })
            .await
    }

    pub async fn create_milestone(&self, payload: MilestonePayload) -> Result<Milestone, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::create(ResourceKind::Milestones), async move {
                api.create_milestone(&payload).await
            })
            .await
    }

    pub async fn update_milestone(
        &self,
        id: Uuid,
        payload: MilestonePayload,
    ) -> Result<Milestone, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::update(ResourceKind::Milestones), async move {
                api.update_milestone(&id, &payload).await
            })
            .await
    }

    pub async fn delete_milestone(&self, id: Uuid) -> Result<(), SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::delete(ResourceKind::Milestones), async move {
                api.delete_milestone(&id).await
            })
            .await
    }

    pub async fn upload_milestone_icon(
        &self,
        id: Uuid,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<Milestone, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::update(ResourceKind::Milestones), async move {
                api.upload_milestone_icon(&id, file_name, bytes).await
            })
            .await
    }

    // ── Milestone requirements ───────────────────────────────────────

    /// Requirements are nested under their milestone; the parent id is
    /// pinned into the cache key, not the wire query.
    pub fn requirements(&self, milestone_id: Uuid) -> ListController<MilestoneRequirement> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::MilestoneRequirements,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_requirements(&milestone_id, &query).await) }.boxed()
            }),
        )
        .scoped("milestoneId", ParamValue::Text(milestone_id.to_string()))
    }

    pub async fn create_requirement(
        &self,
        milestone_id: Uuid,
        payload: RequirementPayload,
    ) -> Result<MilestoneRequirement, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(
                MutationIntent::create(ResourceKind::MilestoneRequirements),
                async move { api.create_requirement(&milestone_id, &payload).await },
            )
            .await
    }

    pub async fn update_requirement(
        &self,
        milestone_id: Uuid,
        requirement_id: Uuid,
        payload: RequirementPayload,
    ) -> Result<MilestoneRequirement, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(
                MutationIntent::update(ResourceKind::MilestoneRequirements),
                async move {
                    api.update_requirement(&milestone_id, &requirement_id, &payload)
                        .await
                },
            )
            .await
    }

    pub async fn delete_requirement(
        &self,
        milestone_id: Uuid,
        requirement_id: Uuid,
    ) -> Result<(), SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(
                MutationIntent::delete(ResourceKind::MilestoneRequirements),
                async move { api.delete_requirement(&milestone_id, &requirement_id).await },
            )
            .await
    }

    // ── Payments (read-only) ─────────────────────────────────────────

    pub fn payments(&self) -> ListController<Payment> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::Payments,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_payments(&query).await.page) }.boxed()
            }),
        )
    }

    /// Full report including the aggregate summary. Payments are never
    /// served stale, so this is effectively a direct fetch routed
    /// through the registry for de-duplication.
    pub async fn payment_report(&self, query: ListQuery) -> PaymentReport {
        let key = ResourceKey::from_query(ResourceKind::Payments, &query)
            .with_param("view", ParamValue::Text("report".into()));
        let api = Arc::clone(&self.inner.api);
        let stale_after = self.inner.policy.stale_after(ResourceKind::Payments);
        let page_size = query.page_size;
        self.inner
            .registry
            .ensure_fresh::<PaymentReport, _, _>(&key, stale_after, move || async move {
                Ok::<_, larder_api::Error>(api.fetch_payments(&query).await)
            })
            .await
            .map_or_else(|_| PaymentReport::empty(page_size), |report| (*report).clone())
    }

    pub async fn payment(&self, id: Uuid) -> Option<Payment> {
        let key = ResourceKey::entity(ResourceKind::Payments, id);
        self.entity(key, move |api| async move { api.payment(&id).await })
            .await
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscriptions(&self) -> ListController<Subscription> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::Subscriptions,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_subscriptions(&query).await) }.boxed()
            }),
        )
    }

    pub async fn subscription(&self, id: Uuid) -> Option<Subscription> {
        let key = ResourceKey::entity(ResourceKind::Subscriptions, id);
        self.entity(key, move |api| async move { api.subscription(&id).await })
            .await
    }

    pub async fn update_subscription(
        &self,
        id: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Subscription, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(
                MutationIntent::update(ResourceKind::Subscriptions),
                async move { api.update_subscription(&id, &patch).await },
            )
            .await
    }

    // ── Recipes ──────────────────────────────────────────────────────

    pub fn recipes(&self) -> ListController<Recipe> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::Recipes,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_recipes(&query).await) }.boxed()
            }),
        )
    }

    pub async fn recipe(&self, id: Uuid) -> Option<Recipe> {
        let key = ResourceKey::entity(ResourceKind::Recipes, id);
        self.entity(key, move |api| async move { api.recipe(&id).await })
            .await
    }

    pub async fn create_recipe(&self, payload: RecipePayload) -> Result<Recipe, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::create(ResourceKind::Recipes), async move {
                api.create_recipe(&payload).await
            })
            .await
    }

    pub async fn update_recipe(
        &self,
        id: Uuid,
        payload: RecipePayload,
    ) -> Result<Recipe, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::update(ResourceKind::Recipes), async move {
                api.update_recipe(&id, &payload).await
            })
            .await
    }

    pub async fn delete_recipe(&self, id: Uuid) -> Result<(), SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::delete(ResourceKind::Recipes), async move {
                api.delete_recipe(&id).await
            })
            .await
    }

    // ── Trade offers ─────────────────────────────────────────────────

    pub fn trade_offers(&self) -> ListController<TradeOffer> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::TradeOffers,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_trade_offers(&query).await) }.boxed()
            }),
        )
    }

    pub async fn trade_offer(&self, id: Uuid) -> Option<TradeOffer> {
        let key = ResourceKey::entity(ResourceKind::TradeOffers, id);
        self.entity(key, move |api| async move { api.trade_offer(&id).await })
            .await
    }

    pub async fn moderate_trade_offer(
        &self,
        id: Uuid,
        decision: TradeOfferModeration,
    ) -> Result<TradeOffer, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::update(ResourceKind::TradeOffers), async move {
                api.moderate_trade_offer(&id, &decision).await
            })
            .await
    }

    pub async fn delete_trade_offer(&self, id: Uuid) -> Result<(), SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::delete(ResourceKind::TradeOffers), async move {
                api.delete_trade_offer(&id).await
            })
            .await
    }

    // ── Users ────────────────────────────────────────────────────────

    pub fn users(&self) -> ListController<User> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::Users,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_users(&query).await) }.boxed()
            }),
        )
    }

    pub async fn user(&self, id: Uuid) -> Option<User> {
        let key = ResourceKey::entity(ResourceKind::Users, id);
        self.entity(key, move |api| async move { api.user(&id).await })
            .await
    }

    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::update(ResourceKind::Users), async move {
                api.update_user(&id, &patch).await
            })
            .await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<(), SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::delete(ResourceKind::Users), async move {
                api.delete_user(&id).await
            })
            .await
    }

    pub async fn upload_user_avatar(
        &self,
        id: Uuid,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<User, SyncError> {
        let api = Arc::clone(&self.inner.api);
        self.inner
            .coordinator
            .execute(MutationIntent::update(ResourceKind::Users), async move {
                api.upload_user_avatar(&id, file_name, bytes).await
            })
            .await
    }

    // ── Units (reference data) ───────────────────────────────────────

    pub fn units(&self) -> ListController<Unit> {
        let api = Arc::clone(&self.inner.api);
        self.controller(
            ResourceKind::Units,
            Arc::new(move |query: ListQuery| {
                let api = Arc::clone(&api);
                async move { Ok(api.fetch_units(&query).await) }.boxed()
            }),
        )
    }
}
