// ── Mutation coordinator ──
//
// Single write path: every create/update/delete runs through
// `MutationCoordinator::execute`, which invalidates the affected cache
// kinds on success so the next read revalidates. Failed writes leave
// the cache untouched; the caller gets a translated [`SyncError`] and
// decides how to surface it.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::cache::QueryRegistry;
use crate::error::SyncError;
use crate::key::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// Names what a write is about to touch, before it runs.
#[derive(Debug, Clone)]
pub struct MutationIntent {
    pub resource: ResourceKind,
    pub kind: MutationKind,
    extra: Vec<ResourceKind>,
}

impl MutationIntent {
    pub fn create(resource: ResourceKind) -> Self {
        Self {
            resource,
            kind: MutationKind::Create,
            extra: Vec::new(),
        }
    }

    pub fn update(resource: ResourceKind) -> Self {
        Self {
            resource,
            kind: MutationKind::Update,
            extra: Vec::new(),
        }
    }

    pub fn delete(resource: ResourceKind) -> Self {
        Self {
            resource,
            kind: MutationKind::Delete,
            extra: Vec::new(),
        }
    }

    /// Name an additional kind this particular write touches, beyond
    /// the static dependency edges.
    #[must_use]
    pub fn with_extra(mut self, kind: ResourceKind) -> Self {
        self.extra.push(kind);
        self
    }

    /// The written kind, every kind whose cached views embed it, and
    /// any call-site extras. Deduplicated.
    pub fn affected_kinds(&self) -> Vec<ResourceKind> {
        let mut kinds = vec![self.resource];
        kinds.extend_from_slice(self.resource.dependents());
        kinds.extend_from_slice(&self.extra);
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }
}

pub struct MutationCoordinator {
    registry: Arc<QueryRegistry>,
}

impl MutationCoordinator {
    pub fn new(registry: Arc<QueryRegistry>) -> Self {
        Self { registry }
    }

    /// Run a write and, if it succeeds, mark every affected kind stale.
    /// Invalidation is deliberately broad — all entries of a kind,
    /// collections and entities alike — trading a few extra refetches
    /// for never showing a deleted or renamed record.
    pub async fn execute<T, Fut>(
        &self,
        intent: MutationIntent,
        operation: Fut,
    ) -> Result<T, SyncError>
    where
        Fut: Future<Output = Result<T, larder_api::Error>>,
    {
        match operation.await {
            Ok(value) => {
                let affected = intent.affected_kinds();
                debug!(resource = %intent.resource, kind = ?intent.kind, ?affected, "write committed");
                for kind in affected {
                    self.registry.invalidate_kind(kind);
                }
                Ok(value)
            }
            Err(err) => Err(SyncError::from(err)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::cache::EntrySnapshot;
    use crate::key::ResourceKey;

    async fn warm(registry: &QueryRegistry, kind: ResourceKind) -> ResourceKey {
        let key = ResourceKey::collection(kind);
        let _: Arc<u8> = registry
            .ensure_fresh(&key, Duration::minutes(5), || async {
                Ok::<_, larder_api::Error>(0u8)
            })
            .await
            .unwrap();
        key
    }

    fn is_stale(registry: &QueryRegistry, key: &ResourceKey) -> bool {
        let snap: EntrySnapshot<u8> = registry.snapshot(key);
        snap.last_fetched_at.is_none()
    }

    #[tokio::test]
    async fn successful_write_invalidates_target_and_dependents() {
        let registry = Arc::new(QueryRegistry::new());
        let requirements = warm(&registry, ResourceKind::MilestoneRequirements).await;
        let milestones = warm(&registry, ResourceKind::Milestones).await;
        let recipes = warm(&registry, ResourceKind::Recipes).await;

        let coordinator = MutationCoordinator::new(Arc::clone(&registry));
        coordinator
            .execute(
                MutationIntent::create(ResourceKind::MilestoneRequirements),
                async { Ok::<_, larder_api::Error>(()) },
            )
            .await
            .unwrap();

        assert!(is_stale(&registry, &requirements));
        assert!(is_stale(&registry, &milestones));
        assert!(!is_stale(&registry, &recipes));
    }

    #[tokio::test]
    async fn failed_write_leaves_the_cache_untouched() {
        let registry = Arc::new(QueryRegistry::new());
        let milestones = warm(&registry, ResourceKind::Milestones).await;

        let coordinator = MutationCoordinator::new(Arc::clone(&registry));
        let err = coordinator
            .execute(MutationIntent::delete(ResourceKind::Milestones), async {
                Err::<(), _>(larder_api::Error::Conflict {
                    title: "Milestone.InUse".into(),
                    detail: "Milestone cannot be deleted while users have earned it".into(),
                    status: 409,
                })
            })
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(
            err.user_message("fallback"),
            "Milestone cannot be deleted while users have earned it"
        );
        assert!(!is_stale(&registry, &milestones));
    }

    #[tokio::test]
    async fn call_site_extras_extend_the_invalidation_set() {
        let registry = Arc::new(QueryRegistry::new());
        let recipes = warm(&registry, ResourceKind::Recipes).await;
        let units = warm(&registry, ResourceKind::Units).await;

        let coordinator = MutationCoordinator::new(Arc::clone(&registry));
        coordinator
            .execute(
                MutationIntent::update(ResourceKind::Recipes).with_extra(ResourceKind::Units),
                async { Ok::<_, larder_api::Error>(()) },
            )
            .await
            .unwrap();

        assert!(is_stale(&registry, &recipes));
        assert!(is_stale(&registry, &units));
    }
}
