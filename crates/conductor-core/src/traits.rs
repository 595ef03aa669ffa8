//! Trait seams for the conductor pipeline.
//!
//! - `Collector`: fallible data source (network, cache or fake)
//! - `PolicyEvaluator`: pure allow/deny decision per (context, action)
//! - `ProfileValidator`: pure comparison of a context against a named profile
//!
//! The scanner wires them together.  Evaluators and validators are only
//! ever called through `&self`: once loaded they are read-only, so a single
//! instance can be shared across worker threads without locking.

use conductor_contracts::{
    error::CollectorError, Action, BranchProtection, EvaluationResult, PolicyContext, Profile,
    Repo, RepoFilter, Violation, Workflow, WorkflowRun, STANDARD_ACTIONS,
};

use crate::cancel::Deadline;

/// Result type for collector calls.
pub type CollectorResult<T> = Result<T, CollectorError>;

/// A source of repository, workflow and branch-protection data.
///
/// Implementations own their retry, backoff and rate-limit behaviour; the
/// core never retries.  Every per-repository call receives the repository's
/// `Deadline` and should return `Cancelled`/`TimedOut` once it has expired.
pub trait Collector: Send + Sync {
    /// Return repositories of `orgs`.
    ///
    /// `filter` may be used to narrow the listing at the source.  The
    /// scanner applies it again to every returned repository and records
    /// misses as skipped, so returning a superset is always correct.
    fn list_repos(&self, orgs: &[String], filter: &RepoFilter) -> CollectorResult<Vec<Repo>>;

    /// Return the CI workflows defined in `repo`.
    fn get_workflows(&self, repo: &Repo, deadline: &Deadline) -> CollectorResult<Vec<Workflow>>;

    /// Return protection settings for `branch`, or `None` when the branch is unprotected.
    fn get_branch_protection(
        &self,
        repo: &Repo,
        branch: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<BranchProtection>>;

    /// Return the most recent workflow run, if any.
    fn get_latest_workflow_run(
        &self,
        repo: &Repo,
        deadline: &Deadline,
    ) -> CollectorResult<Option<WorkflowRun>>;

    /// Return the content of `path` on the default branch, or `None` if absent.
    fn get_file_content(
        &self,
        repo: &Repo,
        path: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<String>>;
}

/// Evaluates authorization policies against a `PolicyContext`.
pub trait PolicyEvaluator: Send + Sync {
    /// Decide whether `action` is permitted for the repository in `ctx`.
    ///
    /// Never fails: evaluation problems are reported in
    /// `EvaluationResult::errors`.
    fn evaluate(&self, ctx: &PolicyContext, action: Action) -> EvaluationResult;

    /// Evaluate every action in `STANDARD_ACTIONS`, in declared order.
    fn evaluate_all(&self, ctx: &PolicyContext) -> Vec<EvaluationResult> {
        STANDARD_ACTIONS
            .iter()
            .map(|action| self.evaluate(ctx, *action))
            .collect()
    }
}

/// Resolves named profiles and validates contexts against them.
pub trait ProfileValidator: Send + Sync {
    /// Resolve `name` through the fallback chain.  Never fails.
    fn resolve(&self, name: &str) -> &Profile;

    /// Compare `ctx` against `profile`.  Must be deterministic.
    fn validate(&self, ctx: &PolicyContext, profile: &Profile) -> Vec<Violation>;
}
