//! Usage gate.
//!
//! Tracks a per-day, per-user call count against a fixed daily quota and
//! decides whether a gated action may proceed. Unlimited identities bypass
//! counting entirely. Store failures fail OPEN: a backing-store outage
//! degrades tracking but never blocks legitimate usage.

mod store;

pub use store::{PostgresUsageStore, StoreError, UsageStore};

use std::sync::Arc;

use nextstep_core::{DayKey, Identity, QuotaDecision};

use crate::config::UsageConfig;

/// Outcome of running an action through the gate.
#[derive(Debug)]
pub enum GateOutcome<T, E> {
    /// The quota check denied the action; it was never executed.
    Denied(QuotaDecision),
    /// The action succeeded and a unit of quota was consumed afterwards.
    Completed {
        /// The action's result.
        value: T,
        /// Quota state after consumption.
        decision: QuotaDecision,
    },
    /// The action itself failed; no quota was consumed.
    Failed(E),
}

/// Usage gate with injected store dependency.
///
/// Constructed once at startup and shared via [`crate::state::AppState`].
pub struct UsageGate {
    store: Arc<dyn UsageStore>,
    daily_limit: u32,
}

impl UsageGate {
    /// Create a new usage gate.
    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>, usage: &UsageConfig) -> Self {
        Self {
            store,
            daily_limit: usage.daily_limit,
        }
    }

    /// The configured daily limit.
    #[must_use]
    pub const fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Check today's quota for `identity`, consuming one unit when `consume`
    /// is set and the check passes.
    ///
    /// A check that would exceed the limit is rejected before any increment,
    /// so an enforced day never counts past the limit. Store errors on read
    /// or write yield an allowed-but-degraded decision instead of an error.
    pub async fn check_and_consume(&self, identity: &Identity, consume: bool) -> QuotaDecision {
        self.check_at(identity, consume, DayKey::today()).await
    }

    async fn check_at(&self, identity: &Identity, consume: bool, day: DayKey) -> QuotaDecision {
        if identity.is_unlimited {
            tracing::debug!(subject = %identity.subject_id, "unlimited access");
            return QuotaDecision::unlimited();
        }

        let count = match self.store.day_count(&identity.subject_id, day).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(subject = %identity.subject_id, error = %e, "usage read failed, failing open");
                return QuotaDecision::degraded();
            }
        };

        if count >= self.daily_limit {
            return QuotaDecision::denied(self.daily_limit);
        }

        if !consume {
            return QuotaDecision::granted(self.daily_limit - count);
        }

        match self
            .store
            .record_use(&identity.subject_id, &identity.email, day)
            .await
        {
            Ok(new_count) => QuotaDecision::granted(self.daily_limit.saturating_sub(new_count)),
            Err(e) => {
                tracing::warn!(subject = %identity.subject_id, error = %e, "usage write failed, failing open");
                QuotaDecision::degraded()
            }
        }
    }

    /// Run `action` through the gate.
    ///
    /// Checks without consuming first; a denial means the action never runs.
    /// A unit of quota is consumed only after the action reports success, so
    /// a failed action costs the user nothing.
    pub async fn run_gated<T, E, F, Fut>(&self, identity: &Identity, action: F) -> GateOutcome<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let decision = self.check_and_consume(identity, false).await;
        if !decision.allowed {
            return GateOutcome::Denied(decision);
        }

        match action().await {
            Ok(value) => {
                let decision = self.check_and_consume(identity, true).await;
                GateOutcome::Completed { value, decision }
            }
            Err(error) => GateOutcome::Failed(error),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use async_trait::async_trait;

    use nextstep_core::{Email, Remaining, SubjectId};

    /// In-memory store with failure injection.
    #[derive(Default)]
    struct MemoryStore {
        counts: Mutex<HashMap<(SubjectId, DayKey), u32>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MemoryStore {
        fn seed(&self, subject: &SubjectId, day: DayKey, count: u32) {
            self.counts
                .lock()
                .unwrap()
                .insert((subject.clone(), day), count);
        }
    }

    #[async_trait]
    impl UsageStore for MemoryStore {
        async fn day_count(&self, subject: &SubjectId, day: DayKey) -> Result<u32, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError("read refused".to_owned()));
            }
            Ok(self
                .counts
                .lock()
                .unwrap()
                .get(&(subject.clone(), day))
                .copied()
                .unwrap_or(0))
        }

        async fn record_use(
            &self,
            subject: &SubjectId,
            _email: &Email,
            day: DayKey,
        ) -> Result<u32, StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError("write refused".to_owned()));
            }
            let mut counts = self.counts.lock().unwrap();
            let count = counts.entry((subject.clone(), day)).or_insert(0);
            *count += 1;
            Ok(*count)
        }
    }

    fn identity(unlimited: bool) -> Identity {
        Identity {
            subject_id: SubjectId::parse("u1").unwrap(),
            email: Email::parse("user@example.com").unwrap(),
            is_unlimited: unlimited,
        }
    }

    fn gate_with(store: Arc<MemoryStore>, daily_limit: u32) -> UsageGate {
        UsageGate::new(
            store,
            &UsageConfig {
                daily_limit,
                unlimited_emails: Vec::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_unlimited_identity_always_allowed() {
        let store = Arc::new(MemoryStore::default());
        let user = identity(true);
        store.seed(&user.subject_id, DayKey::today(), 1000);
        let gate = gate_with(Arc::clone(&store), 5);

        for consume in [false, true] {
            let decision = gate.check_and_consume(&user, consume).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, Remaining::Unlimited);
        }

        // Counting is bypassed entirely: no writes happened.
        assert_eq!(
            store.counts.lock().unwrap()[&(user.subject_id.clone(), DayKey::today())],
            1000
        );
    }

    #[tokio::test]
    async fn test_five_consumes_then_denied() {
        let store = Arc::new(MemoryStore::default());
        let gate = gate_with(Arc::clone(&store), 5);
        let user = identity(false);

        for expected_remaining in (0..5).rev() {
            let decision = gate.check_and_consume(&user, true).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, Remaining::Exact(expected_remaining));
        }

        let sixth = gate.check_and_consume(&user, true).await;
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, Remaining::Exact(0));
        assert!(sixth.message.contains("daily limit of 5"));

        // The rejected attempt did not bump the counter past the limit.
        assert_eq!(
            store.counts.lock().unwrap()[&(user.subject_id.clone(), DayKey::today())],
            5
        );
    }

    #[tokio::test]
    async fn test_new_day_resets_count_implicitly() {
        let store = Arc::new(MemoryStore::default());
        let gate = gate_with(Arc::clone(&store), 5);
        let user = identity(false);

        let yesterday = DayKey::parse("2025-03-08").unwrap();
        let today = DayKey::parse("2025-03-09").unwrap();
        store.seed(&user.subject_id, yesterday, 5);

        // Exhausted yesterday, untouched today.
        let stale = gate.check_at(&user, false, yesterday).await;
        assert!(!stale.allowed);

        let fresh = gate.check_at(&user, false, today).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, Remaining::Exact(5));
    }

    #[tokio::test]
    async fn test_read_failure_fails_open() {
        let store = Arc::new(MemoryStore::default());
        store.fail_reads.store(true, Ordering::SeqCst);
        let gate = gate_with(store, 5);

        let decision = gate.check_and_consume(&identity(false), true).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, Remaining::Unknown);
        assert!(decision.message.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_write_failure_fails_open() {
        let store = Arc::new(MemoryStore::default());
        store.fail_writes.store(true, Ordering::SeqCst);
        let gate = gate_with(store, 5);

        let decision = gate.check_and_consume(&identity(false), true).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, Remaining::Unknown);
    }

    #[tokio::test]
    async fn test_four_prior_uses_scenario() {
        let store = Arc::new(MemoryStore::default());
        let gate = gate_with(Arc::clone(&store), 5);
        let user = identity(false);
        store.seed(&user.subject_id, DayKey::today(), 4);

        let peek = gate.check_and_consume(&user, false).await;
        assert!(peek.allowed);
        assert_eq!(peek.remaining, Remaining::Exact(1));

        let consumed = gate.check_and_consume(&user, true).await;
        assert!(consumed.allowed);
        assert_eq!(consumed.remaining, Remaining::Exact(0));

        for consume in [false, true] {
            let next = gate.check_and_consume(&user, consume).await;
            assert!(!next.allowed);
            assert!(next.message.contains("daily limit"));
        }
    }

    #[tokio::test]
    async fn test_non_consuming_check_writes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let gate = gate_with(Arc::clone(&store), 5);
        let user = identity(false);

        let decision = gate.check_and_consume(&user, false).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, Remaining::Exact(5));
        assert!(store.counts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_gated_consumes_only_after_success() {
        let store = Arc::new(MemoryStore::default());
        let gate = gate_with(Arc::clone(&store), 5);
        let user = identity(false);
        let runs = AtomicU32::new(0);

        let outcome: GateOutcome<&str, &str> = gate
            .run_gated(&user, || async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok("predictions")
            })
            .await;

        match outcome {
            GateOutcome::Completed { value, decision } => {
                assert_eq!(value, "predictions");
                assert_eq!(decision.remaining, Remaining::Exact(4));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.counts.lock().unwrap()[&(user.subject_id.clone(), DayKey::today())],
            1
        );
    }

    #[tokio::test]
    async fn test_run_gated_failed_action_costs_nothing() {
        let store = Arc::new(MemoryStore::default());
        let gate = gate_with(Arc::clone(&store), 5);
        let user = identity(false);

        let outcome: GateOutcome<&str, &str> =
            gate.run_gated(&user, || async { Err("upstream down") }).await;

        assert!(matches!(outcome, GateOutcome::Failed("upstream down")));
        assert!(store.counts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_gated_denied_never_executes_action() {
        let store = Arc::new(MemoryStore::default());
        let gate = gate_with(Arc::clone(&store), 5);
        let user = identity(false);
        store.seed(&user.subject_id, DayKey::today(), 5);
        let runs = AtomicU32::new(0);

        let outcome: GateOutcome<&str, &str> = gate
            .run_gated(&user, || async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok("predictions")
            })
            .await;

        assert!(matches!(outcome, GateOutcome::Denied(_)));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
