//! Per-resource staleness windows.

use std::collections::BTreeMap;

use chrono::Duration;

use crate::key::ResourceKind;

/// How long a fetched value stays fresh before reads revalidate it.
///
/// Windows are tuned per resource: money movements must never be served
/// from cache, while the unit catalogue changes rarely enough to hold
/// for minutes.
#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    default_window_secs: i64,
    overrides: BTreeMap<ResourceKind, Duration>,
}

impl FreshnessPolicy {
    pub fn new() -> Self {
        Self {
            default_window_secs: 30,
            overrides: BTreeMap::new(),
        }
    }

    /// Override the default window (kinds with a fixed window keep it).
    pub fn with_default_window(window: Duration) -> Self {
        Self {
            default_window_secs: window.num_seconds(),
            overrides: BTreeMap::new(),
        }
    }

    /// Pin one kind's window, taking precedence over everything else.
    /// Mainly for tests and operational tuning.
    #[must_use]
    pub fn with_override(mut self, kind: ResourceKind, window: Duration) -> Self {
        self.overrides.insert(kind, window);
        self
    }

    pub fn stale_after(&self, kind: ResourceKind) -> Duration {
        if let Some(window) = self.overrides.get(&kind) {
            return *window;
        }
        match kind {
            // Financial data is always revalidated.
            ResourceKind::Payments | ResourceKind::Subscriptions => Duration::zero(),
            // Static reference data.
            ResourceKind::Units => Duration::minutes(10),
            _ => Duration::seconds(self.default_window_secs),
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn financial_kinds_are_never_fresh() {
        let policy = FreshnessPolicy::new();
        assert_eq!(policy.stale_after(ResourceKind::Payments), Duration::zero());
        assert_eq!(
            policy.stale_after(ResourceKind::Subscriptions),
            Duration::zero()
        );
    }

    #[test]
    fn default_window_applies_to_ordinary_kinds() {
        let policy = FreshnessPolicy::with_default_window(Duration::seconds(90));
        assert_eq!(
            policy.stale_after(ResourceKind::Milestones),
            Duration::seconds(90)
        );
        assert_eq!(
            policy.stale_after(ResourceKind::Units),
            Duration::minutes(10)
        );
    }

    #[test]
    fn explicit_override_wins() {
        let policy = FreshnessPolicy::new()
            .with_override(ResourceKind::Units, Duration::zero())
            .with_override(ResourceKind::Payments, Duration::seconds(5));
        assert_eq!(policy.stale_after(ResourceKind::Units), Duration::zero());
        assert_eq!(
            policy.stale_after(ResourceKind::Payments),
            Duration::seconds(5)
        );
    }
}
