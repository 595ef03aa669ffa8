//! Retrying collector decorator with exponential backoff.
//!
//! A failed call is repeated only when `CollectorError::is_retryable` says
//! so, at most `max_retries` times.  The delay before retry `n` (1-based) is
//! `initial_backoff * 2^(n-1)`, capped at `max_backoff`.  A server-supplied
//! `Retry-After` replaces the computed delay (still capped).  A retry that
//! would outlive the repository's deadline is not attempted.

use std::time::Duration;

use tracing::warn;

use conductor_contracts::{error::CollectorError, BranchProtection, Repo, RepoFilter, Workflow, WorkflowRun};
use conductor_core::{
    cancel::Deadline,
    traits::{Collector, CollectorResult},
};

/// Retry bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub honor_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            honor_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based) after `error`.
    pub fn backoff(&self, attempt: u32, error: &CollectorError) -> Duration {
        if self.honor_retry_after {
            if let Some(secs) = error.retry_after_secs() {
                return Duration::from_secs(secs).min(self.max_backoff);
            }
        }

        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Details passed to the retry hook before each sleep.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    pub operation: &'static str,
    pub target: &'a str,
    /// 1-based retry number.
    pub attempt: u32,
    pub backoff: Duration,
    pub error: &'a CollectorError,
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;
type RetryHook = Box<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// Wraps a collector and retries transient failures.
pub struct RetryingCollector<C> {
    inner: C,
    policy: RetryPolicy,
    sleeper: Sleeper,
    on_retry: Option<RetryHook>,
}

impl<C: Collector> RetryingCollector<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            sleeper: Box::new(std::thread::sleep),
            on_retry: None,
        }
    }

    /// Replace the function used to wait between attempts.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Call `hook` before every retry.
    pub fn on_retry(mut self, hook: impl Fn(&RetryEvent<'_>) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Box::new(hook));
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn run<T>(
        &self,
        operation: &'static str,
        target: &str,
        deadline: Option<&Deadline>,
        call: impl Fn() -> CollectorResult<T>,
    ) -> CollectorResult<T> {
        let mut attempt = 0;
        loop {
            let error = match call() {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.policy.max_retries || !error.is_retryable() {
                return Err(error);
            }
            attempt += 1;

            let backoff = self.policy.backoff(attempt, &error);
            if let Some(deadline) = deadline {
                deadline.check()?;
                if deadline.remaining().is_some_and(|left| left <= backoff) {
                    return Err(error);
                }
            }

            warn!(
                operation,
                subject = %target,
                attempt,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying collector call"
            );
            if let Some(hook) = &self.on_retry {
                hook(&RetryEvent {
                    operation,
                    target,
                    attempt,
                    backoff,
                    error: &error,
                });
            }
            (self.sleeper)(backoff);
        }
    }
}

impl<C: Collector> Collector for RetryingCollector<C> {
    fn list_repos(&self, orgs: &[String], filter: &RepoFilter) -> CollectorResult<Vec<Repo>> {
        let target = orgs.join(",");
        self.run("list_repos", &target, None, || self.inner.list_repos(orgs, filter))
    }

    fn get_workflows(&self, repo: &Repo, deadline: &Deadline) -> CollectorResult<Vec<Workflow>> {
        self.run("get_workflows", &repo.full_name, Some(deadline), || {
            self.inner.get_workflows(repo, deadline)
        })
    }

    fn get_branch_protection(
        &self,
        repo: &Repo,
        branch: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<BranchProtection>> {
        self.run("get_branch_protection", &repo.full_name, Some(deadline), || {
            self.inner.get_branch_protection(repo, branch, deadline)
        })
    }

    fn get_latest_workflow_run(
        &self,
        repo: &Repo,
        deadline: &Deadline,
    ) -> CollectorResult<Option<WorkflowRun>> {
        self.run("get_latest_workflow_run", &repo.full_name, Some(deadline), || {
            self.inner.get_latest_workflow_run(repo, deadline)
        })
    }

    fn get_file_content(
        &self,
        repo: &Repo,
        path: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<String>> {
        self.run("get_file_content", &repo.full_name, Some(deadline), || {
            self.inner.get_file_content(repo, path, deadline)
        })
    }
}
