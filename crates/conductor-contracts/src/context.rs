//! The canonical policy evaluation context.
//!
//! A `PolicyContext` is built once per repository per scan by the context
//! builder in `conductor-core` and is never mutated afterwards.  Both the
//! policy engine and the profile validator read it; neither writes it.

use serde::{Deserialize, Serialize};

/// Immutable, normalized snapshot of one repository's CI/CD attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyContext {
    pub repo: RepoContext,
    pub ci: CiContext,
    pub go: GoContext,
    pub dependencies: DependenciesContext,
    pub branch_protection: BranchProtectionContext,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoContext {
    pub name: String,
    pub org: String,
    pub full_name: String,
    pub languages: Vec<String>,
    pub topics: Vec<String>,
    pub archived: bool,
    pub fork: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CiContext {
    pub has_workflow: bool,
    pub uses_reusable_workflow: bool,
    /// Full reference of the first reusable workflow seen, verbatim.
    pub reusable_workflow_ref: String,
    pub required_checks: Vec<String>,
    pub last_run_passed: bool,
    /// Runner OS labels, deduplicated in first-seen order.
    pub os_matrix: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoContext {
    pub versions: Vec<String>,
    pub profile: String,
    pub has_go_mod: bool,
    pub go_mod_tidy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependenciesContext {
    pub has_renovate: bool,
    pub has_dependabot: bool,
    pub oldest_dependency_days: i64,
    pub has_vulnerabilities: bool,
    pub vulnerability_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BranchProtectionContext {
    pub enabled: bool,
    pub require_reviews: bool,
    pub require_status_checks: bool,
    pub enforce_admins: bool,
}
