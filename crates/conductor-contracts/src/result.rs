//! Per-repository outcomes and the scan-level aggregate.
//!
//! `RepoResult` is produced once per repository by the scanner.
//! `ComplianceResult` is the self-describing value handed to report
//! encoders.  Its JSON field names are a stability contract.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    policy::{Violation, Warning},
    repo::{Repo, RepoFilter},
};

/// The compliance outcome for a single repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoResult {
    pub repo: Repo,
    pub compliant: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub skip_reason: String,
    /// Collector or evaluation failure for this repository only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub scan_time_ms: u64,
}

impl RepoResult {
    /// A repository that was fully evaluated.
    pub fn evaluated(
        repo: Repo,
        violations: Vec<Violation>,
        warnings: Vec<Warning>,
        elapsed: Duration,
    ) -> Self {
        let mut result = Self {
            repo,
            compliant: false,
            violations,
            warnings,
            skipped: false,
            skip_reason: String::new(),
            error: String::new(),
            scan_time_ms: millis(elapsed),
        };
        result.compliant = result.is_compliant();
        result
    }

    /// A repository the scan chose not to evaluate.
    pub fn skipped(repo: Repo, reason: impl Into<String>) -> Self {
        Self {
            repo,
            compliant: true,
            violations: Vec::new(),
            warnings: Vec::new(),
            skipped: true,
            skip_reason: reason.into(),
            error: String::new(),
            scan_time_ms: 0,
        }
    }

    /// A repository whose data could not be collected or evaluated.
    pub fn failed(
        repo: Repo,
        error: impl Into<String>,
        warnings: Vec<Warning>,
        elapsed: Duration,
    ) -> Self {
        Self {
            repo,
            compliant: false,
            violations: Vec::new(),
            warnings,
            skipped: false,
            skip_reason: String::new(),
            error: error.into(),
            scan_time_ms: millis(elapsed),
        }
    }

    /// True iff there are no violations and no error.
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty() && self.error.is_empty()
    }
}

/// Aggregate statistics for a scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    #[serde(rename = "total")]
    pub total_repos: usize,
    #[serde(rename = "compliant")]
    pub compliant_repos: usize,
    #[serde(rename = "nonCompliant")]
    pub non_compliant: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Percentage in `0.0..=100.0`; `0.0` for an empty scan.
    #[serde(rename = "complianceRate")]
    pub compliance_rate: f64,
}

impl ScanSummary {
    /// Count outcomes across `repos`.
    ///
    /// `compliant_repos` counts exactly the results whose `is_compliant()`
    /// holds, skipped ones included.  Errored repositories are never
    /// compliant; skipped ones are also reported through `skipped`.
    pub fn from_repos(repos: &[RepoResult]) -> Self {
        let total_repos = repos.len();
        let compliant_repos = repos.iter().filter(|r| r.is_compliant()).count();
        let skipped = repos.iter().filter(|r| r.skipped).count();
        let errors = repos.iter().filter(|r| !r.error.is_empty()).count();

        let compliance_rate = if total_repos == 0 {
            0.0
        } else {
            100.0 * compliant_repos as f64 / total_repos as f64
        };

        Self {
            total_repos,
            compliant_repos,
            non_compliant: total_repos - compliant_repos,
            skipped,
            errors,
            compliance_rate,
        }
    }
}

/// The configuration a scan ran with, recorded for reproducibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub orgs: Vec<String>,
    pub policy_repo: String,
    pub policy_ref: String,
    pub profile: String,
    pub filter: RepoFilter,
}

/// The result of a compliance scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub timestamp: DateTime<Utc>,
    pub summary: ScanSummary,
    pub repos: Vec<RepoResult>,
    pub scan_duration_ms: u64,
    pub config: ScanConfig,
}

impl ComplianceResult {
    /// Build the scan-level aggregate from per-repository results.
    pub fn aggregate(
        repos: Vec<RepoResult>,
        config: ScanConfig,
        timestamp: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            timestamp,
            summary: ScanSummary::from_repos(&repos),
            repos,
            scan_duration_ms: millis(duration),
            config,
        }
    }

    /// Total number of violations across every repository.
    pub fn violation_count(&self) -> usize {
        self.repos.iter().map(|r| r.violations.len()).sum()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
