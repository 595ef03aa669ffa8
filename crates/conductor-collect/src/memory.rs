//! A collector that serves repository data from memory.
//!
//! Data comes from a `Fixture`, usually loaded from JSON.  Everything is
//! keyed by repository full name (`owner/name`).  Fixtures can also inject
//! HTTP failures per repository and operation, optionally only for the
//! first few calls, to exercise retry and isolation paths.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use conductor_contracts::{
    error::{CollectorError, ConductorError, ConductorResult, RateLimitInfo},
    BranchProtection, Repo, RepoFilter, Workflow, WorkflowRun,
};
use conductor_core::{
    cancel::Deadline,
    traits::{Collector, CollectorResult},
};

/// Collector calls a fixture can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Workflows,
    BranchProtection,
    LatestRun,
    FileContent,
}

/// An HTTP failure returned for one repository and operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedFailure {
    pub repo: String,
    pub operation: Operation,
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    /// Fail only this many times, then succeed.  `None` fails forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,
}

impl InjectedFailure {
    fn to_error(&self) -> CollectorError {
        CollectorError::Http {
            status: self.status,
            message: self.message.clone(),
            rate_limit: RateLimitInfo {
                remaining: self.rate_limit_remaining,
                limit: None,
                retry_after_secs: self.retry_after_secs,
            },
        }
    }
}

/// Everything an `InMemoryCollector` serves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
    pub repos: Vec<Repo>,
    pub workflows: BTreeMap<String, Vec<Workflow>>,
    pub branch_protection: BTreeMap<String, BranchProtection>,
    pub latest_runs: BTreeMap<String, WorkflowRun>,
    /// Repository full name → file path → content.
    pub files: BTreeMap<String, BTreeMap<String, String>>,
    pub failures: Vec<InjectedFailure>,
}

impl Fixture {
    pub fn from_json_str(s: &str) -> ConductorResult<Self> {
        serde_json::from_str(s).map_err(|e| ConductorError::ConfigError {
            reason: format!("failed to parse fixture JSON: {e}"),
        })
    }

    pub fn from_file(path: &Path) -> ConductorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConductorError::ConfigError {
            reason: format!("failed to read fixture file '{}': {e}", path.display()),
        })?;
        Self::from_json_str(&contents)
    }
}

/// A `Collector` backed by a `Fixture`.
#[derive(Debug, Default)]
pub struct InMemoryCollector {
    fixture: Fixture,
    failure_counts: Mutex<HashMap<(String, Operation), u32>>,
    calls: AtomicUsize,
}

impl InMemoryCollector {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            failure_counts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_json_str(s: &str) -> ConductorResult<Self> {
        Fixture::from_json_str(s).map(Self::new)
    }

    pub fn from_file(path: &Path) -> ConductorResult<Self> {
        Fixture::from_file(path).map(Self::new)
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    /// Number of per-repository calls served so far, failures included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Record a call and return the injected failure for it, if one applies.
    fn begin(&self, repo: &Repo, operation: Operation, deadline: &Deadline) -> CollectorResult<()> {
        deadline.check()?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let Some(failure) = self
            .fixture
            .failures
            .iter()
            .find(|f| f.repo == repo.full_name && f.operation == operation)
        else {
            return Ok(());
        };

        let Some(limit) = failure.times else {
            return Err(failure.to_error());
        };

        let mut counts = self
            .failure_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let seen = counts.entry((repo.full_name.clone(), operation)).or_insert(0);
        if *seen < limit {
            *seen += 1;
            debug!(repo = %repo.full_name, ?operation, attempt = *seen, "injected failure");
            return Err(failure.to_error());
        }
        Ok(())
    }
}

impl Collector for InMemoryCollector {
    /// Every fixture repository owned by one of `orgs`.  The filter is left
    /// to the scanner so excluded repositories are reported as skipped.
    fn list_repos(&self, orgs: &[String], _filter: &RepoFilter) -> CollectorResult<Vec<Repo>> {
        Ok(self
            .fixture
            .repos
            .iter()
            .filter(|r| orgs.is_empty() || orgs.contains(&r.owner))
            .cloned()
            .collect())
    }

    fn get_workflows(&self, repo: &Repo, deadline: &Deadline) -> CollectorResult<Vec<Workflow>> {
        self.begin(repo, Operation::Workflows, deadline)?;
        Ok(self
            .fixture
            .workflows
            .get(&repo.full_name)
            .cloned()
            .unwrap_or_default())
    }

    fn get_branch_protection(
        &self,
        repo: &Repo,
        branch: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<BranchProtection>> {
        self.begin(repo, Operation::BranchProtection, deadline)?;
        Ok(self
            .fixture
            .branch_protection
            .get(&repo.full_name)
            .filter(|bp| bp.branch.is_empty() || bp.branch == branch)
            .cloned())
    }

    fn get_latest_workflow_run(
        &self,
        repo: &Repo,
        deadline: &Deadline,
    ) -> CollectorResult<Option<WorkflowRun>> {
        self.begin(repo, Operation::LatestRun, deadline)?;
        Ok(self.fixture.latest_runs.get(&repo.full_name).cloned())
    }

    fn get_file_content(
        &self,
        repo: &Repo,
        path: &str,
        deadline: &Deadline,
    ) -> CollectorResult<Option<String>> {
        self.begin(repo, Operation::FileContent, deadline)?;
        Ok(self
            .fixture
            .files
            .get(&repo.full_name)
            .and_then(|files| files.get(path))
            .cloned())
    }
}
