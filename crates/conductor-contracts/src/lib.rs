//! # conductor-contracts
//!
//! Shared types, results, and error definitions for the pipeline conductor.
//!
//! Every crate in the workspace imports from here.  No I/O lives in this
//! crate; the only logic is what the data model itself guarantees (repo
//! filtering, reference parsing, denial-to-violation conversion, and
//! scan-level aggregation).

pub mod context;
pub mod error;
pub mod policy;
pub mod profile;
pub mod repo;
pub mod result;
pub mod workflow;

pub use context::PolicyContext;
pub use error::{CollectorError, ConductorError, ConductorResult};
pub use policy::{Action, EvaluationResult, Severity, Violation, Warning, STANDARD_ACTIONS};
pub use profile::Profile;
pub use repo::{BranchProtection, Repo, RepoFilter};
pub use result::{ComplianceResult, RepoResult, ScanConfig, ScanSummary};
pub use workflow::{MatrixConfig, ReusableWorkflowRef, Workflow, WorkflowJob, WorkflowRun};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use error::RateLimitInfo;

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn repo(full_name: &str) -> Repo {
        let (owner, name) = full_name.split_once('/').unwrap();
        Repo {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: full_name.to_string(),
            ..Repo::default()
        }
    }

    fn violation(policy: &str, severity: Severity) -> Violation {
        Violation {
            policy: policy.to_string(),
            rule: "rule".to_string(),
            message: format!("{policy} violated"),
            severity,
            remediation: None,
            file: None,
            line: None,
        }
    }

    fn denied(action: Action, reasons: &[&str]) -> EvaluationResult {
        EvaluationResult {
            allowed: false,
            action,
            repo_name: "org/repo".to_string(),
            reasons: reasons.iter().map(|s| s.to_string()).collect(),
            errors: Vec::new(),
            severity: None,
        }
    }

    // ── RepoResult::is_compliant ─────────────────────────────────────────────

    #[test]
    fn test_repo_result_without_violations_or_error_is_compliant() {
        let result = RepoResult::evaluated(repo("org/repo"), vec![], vec![], Duration::ZERO);
        assert!(result.is_compliant());
        assert!(result.compliant);
    }

    #[test]
    fn test_repo_result_with_violation_is_not_compliant() {
        let result = RepoResult::evaluated(
            repo("org/repo"),
            vec![violation("ci/workflow-required", Severity::High)],
            vec![],
            Duration::ZERO,
        );
        assert!(!result.is_compliant());
        assert!(!result.compliant);
    }

    #[test]
    fn test_repo_result_with_error_is_not_compliant() {
        let result = RepoResult::failed(
            repo("org/repo"),
            "failed to fetch repository",
            vec![],
            Duration::ZERO,
        );
        assert!(!result.is_compliant());
    }

    // ── ComplianceResult::violation_count ────────────────────────────────────

    #[test]
    fn test_violation_count_is_zero_for_empty_scan() {
        let result = ComplianceResult::aggregate(
            vec![],
            ScanConfig::default(),
            Utc::now(),
            Duration::ZERO,
        );
        assert_eq!(result.violation_count(), 0);
        assert_eq!(result.summary.total_repos, 0);
        assert_eq!(result.summary.compliance_rate, 0.0);
    }

    #[test]
    fn test_violation_count_sums_every_repo() {
        let repos = vec![
            RepoResult::evaluated(
                repo("org/repo1"),
                vec![
                    violation("policy1", Severity::Low),
                    violation("policy2", Severity::Medium),
                ],
                vec![],
                Duration::ZERO,
            ),
            RepoResult::evaluated(
                repo("org/repo2"),
                vec![violation("policy3", Severity::High)],
                vec![],
                Duration::ZERO,
            ),
            RepoResult::evaluated(repo("org/repo3"), vec![], vec![], Duration::ZERO),
        ];
        let result =
            ComplianceResult::aggregate(repos, ScanConfig::default(), Utc::now(), Duration::ZERO);
        assert_eq!(result.violation_count(), 3);
    }

    // ── ScanSummary ──────────────────────────────────────────────────────────

    #[test]
    fn test_summary_compliant_count_agrees_with_repo_flags() {
        let repos = vec![
            RepoResult::evaluated(repo("org/ok"), vec![], vec![], Duration::ZERO),
            RepoResult::evaluated(
                repo("org/bad"),
                vec![violation("p", Severity::High)],
                vec![],
                Duration::ZERO,
            ),
            RepoResult::skipped(repo("org/archived"), "archived"),
            RepoResult::failed(repo("org/broken"), "HTTP 500", vec![], Duration::ZERO),
        ];
        let summary = ScanSummary::from_repos(&repos);

        assert_eq!(summary.total_repos, 4);
        assert_eq!(summary.compliant_repos, 2);
        assert_eq!(summary.non_compliant, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert!((summary.compliance_rate - 50.0).abs() < f64::EPSILON);

        let flagged = repos.iter().filter(|r| r.compliant).count();
        assert_eq!(summary.compliant_repos, flagged);
    }

    #[test]
    fn test_summary_of_only_skipped_repos() {
        let summary = ScanSummary::from_repos(&[RepoResult::skipped(repo("org/a"), "archived")]);

        assert_eq!(summary.compliant_repos, 1);
        assert_eq!(summary.non_compliant, 0);
        assert_eq!(summary.skipped, 1);
    }

    // ── Severity ─────────────────────────────────────────────────────────────

    #[test]
    fn test_severity_serializes_lowercase() {
        let cases = [
            (Severity::Critical, "\"critical\""),
            (Severity::High, "\"high\""),
            (Severity::Medium, "\"medium\""),
            (Severity::Low, "\"low\""),
            (Severity::Info, "\"info\""),
        ];
        for (severity, want) in cases {
            assert_eq!(serde_json::to_string(&severity).unwrap(), want);
            assert_eq!(format!("\"{severity}\""), want);
        }
    }

    #[test]
    fn test_severity_orders_critical_highest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Low > Severity::Info);
    }

    // ── EvaluationResult::to_violation ───────────────────────────────────────

    #[test]
    fn test_allowed_result_has_no_violation() {
        let mut result = denied(Action::Merge, &[]);
        result.allowed = true;
        assert!(result.to_violation().is_none());
    }

    #[test]
    fn test_denied_merge_and_deploy_are_high() {
        for action in [Action::Merge, Action::Deploy] {
            let v = denied(action, &["branch-protection-policy"]).to_violation().unwrap();
            assert_eq!(v.severity, Severity::High);
            assert_eq!(v.policy, format!("policy/{action}"));
            assert_eq!(v.rule, action.as_str());
        }
    }

    #[test]
    fn test_denied_other_actions_are_medium() {
        for action in [Action::Build, Action::Test, Action::Lint, Action::Release] {
            let v = denied(action, &[]).to_violation().unwrap();
            assert_eq!(v.severity, Severity::Medium, "action {action}");
        }
    }

    #[test]
    fn test_violation_message_lists_matched_policies() {
        let v = denied(Action::Merge, &["ci/no-workflow", "ci/stale"])
            .to_violation()
            .unwrap();
        assert_eq!(
            v.message,
            "Policy denied merge action (policies: [ci/no-workflow, ci/stale])"
        );

        let bare = denied(Action::Build, &[]).to_violation().unwrap();
        assert_eq!(bare.message, "Policy denied build action");
    }

    #[test]
    fn test_author_severity_overrides_default() {
        let mut result = denied(Action::Build, &["sec/vulns"]);
        result.severity = Some(Severity::Critical);
        assert_eq!(result.to_violation().unwrap().severity, Severity::Critical);
    }

    // ── Action ───────────────────────────────────────────────────────────────

    #[test]
    fn test_action_parses_from_its_name() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("ship".parse::<Action>().is_err());
    }

    // ── ReusableWorkflowRef::parse ───────────────────────────────────────────

    #[test]
    fn test_parse_full_reference() {
        let r = ReusableWorkflowRef::parse("owner/repo/.github/workflows/ci.yml@v1");
        assert_eq!(r.owner, "owner");
        assert_eq!(r.repo, "repo");
        assert_eq!(r.path, ".github/workflows/ci.yml");
        assert_eq!(r.git_ref, "v1");
        assert_eq!(r.full_ref, "owner/repo/.github/workflows/ci.yml@v1");
    }

    #[test]
    fn test_parse_reference_without_ref() {
        let r = ReusableWorkflowRef::parse("owner/repo/.github/workflows/ci.yml");
        assert_eq!(r.path, ".github/workflows/ci.yml");
        assert_eq!(r.git_ref, "");
    }

    #[test]
    fn test_parse_local_reference() {
        let r = ReusableWorkflowRef::parse("./.github/workflows/local.yml");
        assert_eq!(r.owner, ".");
        assert_eq!(r.repo, ".github");
        assert_eq!(r.path, "workflows/local.yml");
    }

    #[test]
    fn test_parse_owner_repo_only() {
        let r = ReusableWorkflowRef::parse("owner/repo@abc123def456");
        assert_eq!(r.owner, "owner");
        assert_eq!(r.repo, "repo");
        assert_eq!(r.path, "");
        assert_eq!(r.git_ref, "abc123def456");
    }

    // ── Repo::matches ────────────────────────────────────────────────────────

    #[test]
    fn test_empty_filter_matches_plain_repo() {
        assert!(repo("org/test").matches(&RepoFilter::default()));
    }

    #[test]
    fn test_archived_and_forks_need_opt_in() {
        let mut archived = repo("org/old");
        archived.archived = true;
        assert!(!archived.matches(&RepoFilter::default()));
        assert!(archived.matches(&RepoFilter {
            include_archived: true,
            ..RepoFilter::default()
        }));

        let mut fork = repo("org/fork");
        fork.fork = true;
        assert!(!fork.matches(&RepoFilter::default()));
        assert!(fork.matches(&RepoFilter {
            include_forks: true,
            ..RepoFilter::default()
        }));
    }

    #[test]
    fn test_language_topic_and_visibility_filters() {
        let mut r = repo("org/api");
        r.languages = vec!["Go".to_string(), "Shell".to_string()];
        r.topics = vec!["api".to_string()];
        r.visibility = "private".to_string();

        let include_go = RepoFilter {
            include_languages: vec!["Go".to_string(), "Python".to_string()],
            ..RepoFilter::default()
        };
        assert!(r.matches(&include_go));

        let exclude_shell = RepoFilter {
            exclude_languages: vec!["Shell".to_string()],
            ..RepoFilter::default()
        };
        assert!(!r.matches(&exclude_shell));

        let grpc_only = RepoFilter {
            include_topics: vec!["grpc".to_string()],
            ..RepoFilter::default()
        };
        assert!(!r.matches(&grpc_only));

        let public_only = RepoFilter {
            visibility_filter: vec!["public".to_string()],
            ..RepoFilter::default()
        };
        assert!(!r.matches(&public_only));
    }

    #[test]
    fn test_name_pattern_is_a_glob() {
        let filter = RepoFilter {
            name_pattern: "svc-*".to_string(),
            ..RepoFilter::default()
        };
        assert!(repo("org/svc-billing").matches(&filter));
        assert!(!repo("org/website").matches(&filter));
    }

    // ── CollectorError::is_retryable ─────────────────────────────────────────

    #[test]
    fn test_rate_limited_forbidden_is_retryable() {
        let limited = CollectorError::Http {
            status: 403,
            message: "API rate limit exceeded".to_string(),
            rate_limit: RateLimitInfo {
                remaining: Some(0),
                ..RateLimitInfo::default()
            },
        };
        assert!(limited.is_retryable());

        let plain_forbidden = CollectorError::Http {
            status: 403,
            message: "forbidden".to_string(),
            rate_limit: RateLimitInfo::default(),
        };
        assert!(!plain_forbidden.is_retryable());
    }

    #[test]
    fn test_server_and_transport_errors_are_retryable() {
        for status in [500, 502, 503, 504] {
            let err = CollectorError::Http {
                status,
                message: String::new(),
                rate_limit: RateLimitInfo::default(),
            };
            assert!(err.is_retryable(), "status {status}");
        }
        assert!(CollectorError::Transport {
            reason: "connection reset".to_string()
        }
        .is_retryable());
        assert!(!CollectorError::Cancelled.is_retryable());
        assert!(!CollectorError::NotFound {
            what: "org/repo".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_conductor_error_messages_name_the_target() {
        let err = ConductorError::PolicyParse {
            policy_id: "ci/require-workflow".to_string(),
            reason: "unknown effect".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "parsing policy ci/require-workflow: unknown effect"
        );

        let err = ConductorError::Collector {
            operation: "listing repositories".to_string(),
            target: "acme".to_string(),
            source: CollectorError::Transport {
                reason: "dns".to_string(),
            },
        };
        assert!(err.to_string().contains("acme"));
    }

    // ── Serialization ────────────────────────────────────────────────────────

    #[test]
    fn test_compliance_result_survives_json_round_trip() {
        let mut bad = violation("profile/os-matrix", Severity::Info);
        bad.remediation = Some("Add macos-latest to your OS matrix".to_string());
        bad.file = Some(".github/workflows/ci.yml".to_string());
        bad.line = Some(12);

        let repos = vec![
            RepoResult::evaluated(repo("org/good"), vec![], vec![], Duration::from_millis(4)),
            RepoResult::evaluated(
                repo("org/bad"),
                vec![bad, violation("policy/merge", Severity::Critical)],
                vec![Warning {
                    code: "branch-protection-unavailable".to_string(),
                    message: "HTTP 404".to_string(),
                    file: None,
                }],
                Duration::from_millis(9),
            ),
            RepoResult::skipped(repo("org/archived"), "archived"),
        ];
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let original = ComplianceResult::aggregate(
            repos,
            ScanConfig {
                orgs: vec!["org".to_string()],
                profile: "modern".to_string(),
                ..ScanConfig::default()
            },
            timestamp,
            Duration::from_millis(42),
        );

        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"severity\":\"critical\""));
        assert!(json.contains("\"nonCompliant\":2"));
        assert!(json.contains("\"complianceRate\""));

        let decoded: ComplianceResult = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.summary.compliant_repos, 1);
        assert_eq!(decoded.violation_count(), 2);
    }
}
