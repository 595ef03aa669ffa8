//! The scan pipeline.
//!
//!   list repos → [filter → collect → build context → evaluate → validate] per repo → aggregate
//!
//! Only repository listing can fail the whole scan.  Everything after that
//! is isolated per repository: a collector failure, timeout or cancellation
//! lands on that repository's `RepoResult` and its siblings carry on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use conductor_contracts::{
    error::{CollectorError, ConductorError, ConductorResult},
    ComplianceResult, Profile, Repo, RepoFilter, RepoResult, ScanConfig, Violation, Warning,
};

use crate::{
    cancel::{CancelToken, Deadline},
    context::{ContextBuilder, RepoSnapshot},
    traits::{Collector, PolicyEvaluator, ProfileValidator},
};

/// Branch inspected when a repository does not report its default branch.
pub const FALLBACK_BRANCH: &str = "main";

/// Reason recorded on repositories rejected by the scan filter.
pub const FILTERED_REASON: &str = "excluded by repository filter";

/// Tuning knobs for a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Time budget per repository; `None` disables the timeout.
    pub repo_timeout: Option<Duration>,
    /// Maximum number of repositories processed at once.  `0` is treated as `1`.
    pub concurrency: usize,
    /// Shared cancellation signal for the whole scan.
    pub cancel: CancelToken,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            repo_timeout: Some(Duration::from_secs(60)),
            concurrency: 4,
            cancel: CancelToken::new(),
        }
    }
}

/// Drives a compliance scan over the collector's repositories.
pub struct Scanner<'a> {
    collector: &'a dyn Collector,
    evaluator: &'a dyn PolicyEvaluator,
    profiles: &'a dyn ProfileValidator,
    options: ScanOptions,
}

impl<'a> Scanner<'a> {
    pub fn new(
        collector: &'a dyn Collector,
        evaluator: &'a dyn PolicyEvaluator,
        profiles: &'a dyn ProfileValidator,
        options: ScanOptions,
    ) -> Self {
        Self {
            collector,
            evaluator,
            profiles,
            options,
        }
    }

    /// Run a scan.
    ///
    /// # Errors
    ///
    /// Returns `ConductorError::Collector` only when the repository list
    /// cannot be fetched.  Per-repository problems never fail the scan.
    pub fn scan(&self, config: &ScanConfig) -> ConductorResult<ComplianceResult> {
        let started = Instant::now();
        let timestamp = Utc::now();

        info!(
            orgs = %config.orgs.join(","),
            profile = %config.profile,
            "scan starting"
        );

        let repos = self
            .collector
            .list_repos(&config.orgs, &config.filter)
            .map_err(|source| ConductorError::Collector {
                operation: "listing repositories".to_string(),
                target: config.orgs.join(","),
                source,
            })?;

        let profile = self.profiles.resolve(&config.profile);
        debug!(repos = repos.len(), profile = %profile.name, "repositories listed");

        let results = self.scan_repos(&repos, &config.filter, profile);
        let result = ComplianceResult::aggregate(results, config.clone(), timestamp, started.elapsed());

        info!(
            total = result.summary.total_repos,
            compliant = result.summary.compliant_repos,
            skipped = result.summary.skipped,
            errors = result.summary.errors,
            duration_ms = result.scan_duration_ms,
            "scan complete"
        );

        Ok(result)
    }

    /// Process every repository, keeping results in input order.
    fn scan_repos(&self, repos: &[Repo], filter: &RepoFilter, profile: &Profile) -> Vec<RepoResult> {
        let workers = self.options.concurrency.clamp(1, repos.len().max(1));
        let counter = AtomicUsize::new(0);
        let next = &counter;

        let mut indexed: Vec<(usize, RepoResult)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(repo) = repos.get(index) else {
                                break;
                            };
                            done.push((index, self.scan_repo(repo, filter, profile)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(done) => done,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// Process one repository.  Never fails; problems land on the result.
    pub fn scan_repo(&self, repo: &Repo, filter: &RepoFilter, profile: &Profile) -> RepoResult {
        if !repo.matches(filter) {
            debug!(repo = %repo.full_name, "repository skipped by filter");
            return RepoResult::skipped(repo.clone(), FILTERED_REASON);
        }

        let started = Instant::now();
        let deadline = Deadline::new(self.options.repo_timeout, self.options.cancel.clone());

        let (snapshot, mut warnings) = match self.collect(repo, &deadline) {
            Ok(collected) => collected,
            Err((err, warnings)) => {
                warn!(repo = %repo.full_name, error = %err, "repository scan failed");
                return RepoResult::failed(repo.clone(), err.to_string(), warnings, started.elapsed());
            }
        };

        let ctx = ContextBuilder::new(Some(profile)).build_snapshot(&snapshot);

        let mut violations: Vec<Violation> = Vec::new();
        for evaluation in self.evaluator.evaluate_all(&ctx) {
            for error in &evaluation.errors {
                warnings.push(Warning {
                    code: "policy-evaluation-error".to_string(),
                    message: format!("{} action: {error}", evaluation.action),
                    file: None,
                });
            }
            if let Some(violation) = evaluation.to_violation() {
                warn!(
                    repo = %repo.full_name,
                    action = %evaluation.action,
                    reasons = ?evaluation.reasons,
                    "policy denied action"
                );
                violations.push(violation);
            }
        }
        violations.extend(self.profiles.validate(&ctx, profile));

        debug!(
            repo = %repo.full_name,
            violations = violations.len(),
            warnings = warnings.len(),
            "repository evaluated"
        );

        RepoResult::evaluated(repo.clone(), violations, warnings, started.elapsed())
    }

    /// Gather everything the context builder needs.
    ///
    /// Workflow retrieval is mandatory; branch protection, the latest run
    /// and the go.mod lookup degrade to warnings.
    fn collect(
        &self,
        repo: &Repo,
        deadline: &Deadline,
    ) -> Result<(RepoSnapshot, Vec<Warning>), (ConductorError, Vec<Warning>)> {
        let mut warnings = Vec::new();
        let wrap = |operation: &str, source: CollectorError| ConductorError::Collector {
            operation: operation.to_string(),
            target: repo.full_name.clone(),
            source,
        };

        let workflows = deadline
            .check()
            .and_then(|()| self.collector.get_workflows(repo, deadline))
            .map_err(|e| (wrap("fetching workflows", e), Vec::new()))?;

        let branch = if repo.default_branch.is_empty() {
            FALLBACK_BRANCH
        } else {
            repo.default_branch.as_str()
        };

        let branch_protection = match self.collector.get_branch_protection(repo, branch, deadline) {
            Ok(bp) => bp,
            Err(e) => {
                if matches!(e, CollectorError::Cancelled | CollectorError::TimedOut { .. }) {
                    return Err((wrap("fetching branch protection", e), warnings));
                }
                warnings.push(Warning {
                    code: "branch-protection-unavailable".to_string(),
                    message: wrap("fetching branch protection", e).to_string(),
                    file: None,
                });
                None
            }
        };

        let latest_run = match self.collector.get_latest_workflow_run(repo, deadline) {
            Ok(run) => run,
            Err(e) => {
                if matches!(e, CollectorError::Cancelled | CollectorError::TimedOut { .. }) {
                    return Err((wrap("fetching latest workflow run", e), warnings));
                }
                warnings.push(Warning {
                    code: "latest-run-unavailable".to_string(),
                    message: wrap("fetching latest workflow run", e).to_string(),
                    file: None,
                });
                None
            }
        };

        let mut has_go_mod = false;
        if repo.has_language("Go") {
            match self.collector.get_file_content(repo, "go.mod", deadline) {
                Ok(content) => has_go_mod = content.is_some(),
                Err(e) => {
                    if matches!(e, CollectorError::Cancelled | CollectorError::TimedOut { .. }) {
                        return Err((wrap("probing go.mod", e), warnings));
                    }
                    warnings.push(Warning {
                        code: "go-mod-unavailable".to_string(),
                        message: wrap("probing go.mod", e).to_string(),
                        file: Some("go.mod".to_string()),
                    });
                }
            }
        }

        let snapshot = RepoSnapshot {
            repo: repo.clone(),
            workflows,
            branch_protection,
            latest_run,
            has_go_mod,
        };
        Ok((snapshot, warnings))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
