//! Memoising collector decorator.
//!
//! Workflows and branch protection rarely change during a scan but may be
//! requested more than once (re-scans, several profiles).  Only successful
//! responses are cached; errors always reach the caller and are retried on
//! the next call.  A cancelled or expired deadline fails even on a hit.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use conductor_contracts::{BranchProtection, Repo, RepoFilter, Workflow, WorkflowRun};
use conductor_core::{
    cancel::Deadline,
    traits::{Collector, CollectorResult},
};

type ProtectionKey = (String, String);

/// Wraps a collector and caches per-repository workflow and branch protection lookups.
#[derive(Debug)]
pub struct CachingCollector<C> {
    inner: C,
    workflows: Mutex<HashMap<String, Vec<Workflow>>>,
    protection: Mutex<HashMap<ProtectionKey, Option<BranchProtection>>>,
}

impl<C: Collector> CachingCollector<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            workflows: Mutex::new(HashMap::new()),
            protection: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        lock(&self.workflows).clear();
        lock(&self.protection).clear();
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<C: Collector> Collector for CachingCollector<C> {
    fn list_repos(&self, orgs: &[String], filter: &RepoFilter) -> CollectorResult<Vec<Repo>> {
        self.inner.list_repos(orgs, filter)
    }

    fn get_workflows(&self, repo: &Repo, deadline: &Deadline) -> CollectorResult<Vec<Workflow>> {
        deadline.check()?;
        if let Some(hit) = lock(&self.workflows).get(&repo.full_name) {
            debug!(repo = %repo.full_name, "workflow cache hit");
            return Ok(hit.clone());
        }

        let workflows = self.inner.get_workflows(repo, deadline)?;
        lock(&self.workflows).insert(repo.full_name.clone(), workflows.clone());
        Ok(workflows)
    }

    fn get_branch_protection(
        &self,
        repo: &Repo,
        branch: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<BranchProtection>> {
        deadline.check()?;
        let key = (repo.full_name.clone(), branch.to_string());
        if let Some(hit) = lock(&self.protection).get(&key) {
            debug!(repo = %repo.full_name, branch, "branch protection cache hit");
            return Ok(hit.clone());
        }

        let protection = self.inner.get_branch_protection(repo, branch, deadline)?;
        lock(&self.protection).insert(key, protection.clone());
        Ok(protection)
    }

    fn get_latest_workflow_run(
        &self,
        repo: &Repo,
        deadline: &Deadline,
    ) -> CollectorResult<Option<WorkflowRun>> {
        self.inner.get_latest_workflow_run(repo, deadline)
    }

    fn get_file_content(
        &self,
        repo: &Repo,
        path: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<String>> {
        self.inner.get_file_content(repo, path, deadline)
    }
}
