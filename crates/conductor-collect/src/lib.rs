//! # conductor-collect
//!
//! Source collector adapters for the pipeline conductor.
//!
//! - [`InMemoryCollector`] serves a JSON [`Fixture`]; it is the only
//!   data source in this workspace and stands in for a real forge API.
//! - [`CachingCollector`] memoises workflow and branch-protection lookups.
//! - [`RetryingCollector`] retries transient failures with capped
//!   exponential backoff and honours `Retry-After`.
//!
//! Decorators compose:
//!
//! ```rust,ignore
//! let collector = RetryingCollector::new(
//!     CachingCollector::new(InMemoryCollector::from_file(path)?),
//!     RetryPolicy::default(),
//! );
//! ```

pub mod cached;
pub mod memory;
pub mod mock_data;
pub mod retry;

pub use cached::CachingCollector;
pub use memory::{Fixture, InMemoryCollector, InjectedFailure, Operation};
pub use retry::{RetryEvent, RetryPolicy, RetryingCollector};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use conductor_contracts::{error::CollectorError, error::RateLimitInfo, Repo, RepoFilter};
    use conductor_core::{
        cancel::{CancelToken, Deadline},
        traits::Collector,
    };

    use crate::{
        mock_data::{sample_fixture, SAMPLE_ORG},
        CachingCollector, Fixture, InMemoryCollector, InjectedFailure, Operation, RetryPolicy,
        RetryingCollector,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn sample() -> InMemoryCollector {
        InMemoryCollector::new(sample_fixture().unwrap())
    }

    fn repo_named(collector: &InMemoryCollector, full_name: &str) -> Repo {
        collector
            .fixture()
            .repos
            .iter()
            .find(|r| r.full_name == full_name)
            .cloned()
            .unwrap()
    }

    fn flaky(status: u16, times: Option<u32>) -> InMemoryCollector {
        let mut fixture = sample_fixture().unwrap();
        fixture.failures = vec![InjectedFailure {
            repo: "acme/api-gateway".to_string(),
            operation: Operation::Workflows,
            status,
            message: "flaky".to_string(),
            rate_limit_remaining: None,
            retry_after_secs: None,
            times,
        }];
        InMemoryCollector::new(fixture)
    }

    /// A retrying collector whose sleeps are recorded instead of performed.
    fn recording(
        inner: InMemoryCollector,
        policy: RetryPolicy,
    ) -> (RetryingCollector<InMemoryCollector>, Arc<Mutex<Vec<Duration>>>) {
        let slept = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&slept);
        let collector = RetryingCollector::new(inner, policy)
            .with_sleeper(move |d| sink.lock().unwrap().push(d));
        (collector, slept)
    }

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    // ── 1. in-memory collector ────────────────────────────────────────────────

    #[test]
    fn test_list_repos_filters_by_org_only() {
        let collector = sample();
        let orgs = vec![SAMPLE_ORG.to_string()];

        let names: Vec<_> = collector
            .list_repos(&orgs, &RepoFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.full_name)
            .collect();
        assert_eq!(
            names,
            vec![
                "acme/api-gateway",
                "acme/billing",
                "acme/docs-site",
                "acme/payments",
                "acme/old-cli"
            ]
        );

        let archived = RepoFilter {
            include_archived: true,
            ..RepoFilter::default()
        };
        assert_eq!(collector.list_repos(&orgs, &archived).unwrap().len(), 5);

        let other_org = vec!["globex".to_string()];
        assert!(collector.list_repos(&other_org, &RepoFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_lookups_by_full_name() {
        let collector = sample();
        let gateway = repo_named(&collector, "acme/api-gateway");
        let docs = repo_named(&collector, "acme/docs-site");
        let deadline = Deadline::unbounded();

        let workflows = collector.get_workflows(&gateway, &deadline).unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].reusable_workflow_refs[0].git_ref, "v3");
        assert!(collector.get_workflows(&docs, &deadline).unwrap().is_empty());

        let bp = collector
            .get_branch_protection(&gateway, "main", &deadline)
            .unwrap()
            .unwrap();
        assert_eq!(bp.required_status_checks, vec!["test"]);
        assert!(collector
            .get_branch_protection(&gateway, "release", &deadline)
            .unwrap()
            .is_none());

        assert!(collector
            .get_latest_workflow_run(&gateway, &deadline)
            .unwrap()
            .unwrap()
            .passed());
        assert!(collector
            .get_file_content(&gateway, "go.mod", &deadline)
            .unwrap()
            .is_some());
        assert!(collector
            .get_file_content(&docs, "go.mod", &deadline)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_injected_failure() {
        let collector = sample();
        let payments = repo_named(&collector, "acme/payments");
        let err = collector
            .get_workflows(&payments, &Deadline::unbounded())
            .unwrap_err();

        assert!(matches!(err, CollectorError::Http { status: 403, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cancelled_deadline_short_circuits() {
        let collector = sample();
        let gateway = repo_named(&collector, "acme/api-gateway");
        let token = CancelToken::new();
        token.cancel();

        let err = collector
            .get_workflows(&gateway, &Deadline::new(None, token))
            .unwrap_err();
        assert_eq!(err, CollectorError::Cancelled);
        assert_eq!(collector.call_count(), 0);
    }

    #[test]
    fn test_fixture_from_json() {
        let fixture = Fixture::from_json_str(
            r#"{ "repos": [{ "owner": "o", "name": "r", "fullName": "o/r" }] }"#,
        )
        .unwrap();
        assert_eq!(fixture.repos[0].full_name, "o/r");
        assert!(fixture.workflows.is_empty());

        let err = Fixture::from_json_str("{ not json").unwrap_err();
        assert!(err.to_string().contains("failed to parse fixture JSON"));
    }

    #[test]
    fn test_collector_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("org.json");
        std::fs::write(&path, crate::mock_data::sample_fixture_json().to_string()).unwrap();

        let collector = InMemoryCollector::from_file(&path).unwrap();
        assert_eq!(collector.fixture().repos.len(), 5);

        let missing = InMemoryCollector::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(missing.to_string().contains("absent.json"));
    }

    // ── 2. caching ────────────────────────────────────────────────────────────

    #[test]
    fn test_cache_serves_repeat_lookups() {
        let cached = CachingCollector::new(sample());
        let gateway = repo_named(cached.inner(), "acme/api-gateway");
        let deadline = Deadline::unbounded();

        let first = cached.get_workflows(&gateway, &deadline).unwrap();
        let second = cached.get_workflows(&gateway, &deadline).unwrap();
        cached.get_branch_protection(&gateway, "main", &deadline).unwrap();
        cached.get_branch_protection(&gateway, "main", &deadline).unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner().call_count(), 2);

        cached.clear();
        cached.get_workflows(&gateway, &deadline).unwrap();
        assert_eq!(cached.inner().call_count(), 3);
    }

    #[test]
    fn test_cache_does_not_store_errors() {
        let cached = CachingCollector::new(flaky(500, Some(1)));
        let gateway = repo_named(cached.inner(), "acme/api-gateway");
        let deadline = Deadline::unbounded();

        assert!(cached.get_workflows(&gateway, &deadline).is_err());
        assert_eq!(cached.get_workflows(&gateway, &deadline).unwrap().len(), 1);
    }

    #[test]
    fn test_cache_hit_honours_cancelled_deadline() {
        let cached = CachingCollector::new(sample());
        let gateway = repo_named(cached.inner(), "acme/api-gateway");
        let deadline = Deadline::unbounded();
        cached.get_workflows(&gateway, &deadline).unwrap();
        cached.get_branch_protection(&gateway, "main", &deadline).unwrap();

        let token = CancelToken::new();
        token.cancel();
        let cancelled = Deadline::new(None, token);

        assert_eq!(
            cached.get_workflows(&gateway, &cancelled).unwrap_err(),
            CollectorError::Cancelled
        );
        assert_eq!(
            cached
                .get_branch_protection(&gateway, "main", &cancelled)
                .unwrap_err(),
            CollectorError::Cancelled
        );
        assert_eq!(cached.inner().call_count(), 2);
    }

    // ── 3. retry ──────────────────────────────────────────────────────────────

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let err = CollectorError::Transport {
            reason: "reset".to_string(),
        };
        let delays: Vec<_> = (1..=8).map(|n| policy.backoff(n, &err)).collect();
        assert_eq!(delays, secs(&[1, 2, 4, 8, 16, 32, 60, 60]));
    }

    #[test]
    fn test_retry_after_is_honoured() {
        let policy = RetryPolicy::default();
        let throttled = |secs| CollectorError::Http {
            status: 429,
            message: "slow down".to_string(),
            rate_limit: RateLimitInfo {
                retry_after_secs: Some(secs),
                ..RateLimitInfo::default()
            },
        };
        assert_eq!(policy.backoff(1, &throttled(7)), Duration::from_secs(7));
        assert_eq!(policy.backoff(1, &throttled(600)), Duration::from_secs(60));

        let ignoring = RetryPolicy {
            honor_retry_after: false,
            ..RetryPolicy::default()
        };
        assert_eq!(ignoring.backoff(3, &throttled(7)), Duration::from_secs(4));
    }

    #[test]
    fn test_transient_failure_recovers() {
        let (collector, slept) = recording(flaky(503, Some(2)), RetryPolicy::default());
        let gateway = repo_named(collector.inner(), "acme/api-gateway");

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let collector = collector.on_retry(move |e| sink.lock().unwrap().push(e.attempt));

        let workflows = collector.get_workflows(&gateway, &Deadline::unbounded()).unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(*slept.lock().unwrap(), secs(&[1, 2]));
        assert_eq!(*events.lock().unwrap(), vec![1, 2]);
        assert_eq!(collector.inner().call_count(), 3);
    }

    #[test]
    fn test_retries_are_bounded() {
        let policy = RetryPolicy {
            max_retries: 3,
            ..RetryPolicy::default()
        };
        let (collector, slept) = recording(flaky(502, None), policy);
        let gateway = repo_named(collector.inner(), "acme/api-gateway");

        let err = collector.get_workflows(&gateway, &Deadline::unbounded()).unwrap_err();
        assert!(matches!(err, CollectorError::Http { status: 502, .. }));
        assert_eq!(*slept.lock().unwrap(), secs(&[1, 2, 4]));
        assert_eq!(collector.inner().call_count(), 4);
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let (collector, slept) = recording(flaky(404, None), RetryPolicy::default());
        let gateway = repo_named(collector.inner(), "acme/api-gateway");

        assert!(collector.get_workflows(&gateway, &Deadline::unbounded()).is_err());
        assert!(slept.lock().unwrap().is_empty());
        assert_eq!(collector.inner().call_count(), 1);
    }

    #[test]
    fn test_retry_respects_deadline() {
        let (collector, slept) = recording(flaky(503, None), RetryPolicy::default());
        let gateway = repo_named(collector.inner(), "acme/api-gateway");
        let deadline = Deadline::new(Some(Duration::from_millis(500)), CancelToken::new());

        let err = collector.get_workflows(&gateway, &deadline).unwrap_err();
        assert!(matches!(err, CollectorError::Http { status: 503, .. }));
        assert!(slept.lock().unwrap().is_empty());
    }
}
