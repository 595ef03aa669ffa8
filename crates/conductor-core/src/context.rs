//! Builds the canonical `PolicyContext` from raw collector data.
//!
//! Construction is deterministic and infallible: missing or partial inputs
//! produce zero-valued fields, never an error.
//!
//! Normalization rules:
//!
//! 1. `ci.has_workflow` is true iff at least one workflow was supplied.
//! 2. The first workflow (input order) declaring a reusable workflow sets
//!    `ci.reusable_workflow_ref`; later ones are ignored.
//! 3. `ci.os_matrix` is the union of every job's `runs-on` labels and matrix
//!    `os` entries, deduplicated in first-seen order.
//! 4. The Go section is only filled for repositories whose languages include
//!    `"Go"`.  A profile seeds its name and versions; explicit matrix Go
//!    versions from the workflows replace the profile's versions.
//! 5. Branch protection is copied only when a record is supplied.

use std::collections::HashSet;

use conductor_contracts::{
    context::{BranchProtectionContext, CiContext, GoContext, RepoContext},
    BranchProtection, PolicyContext, Profile, Repo, Workflow, WorkflowRun,
};

/// Everything the collector gathered for one repository.
#[derive(Debug, Clone, Default)]
pub struct RepoSnapshot {
    pub repo: Repo,
    pub workflows: Vec<Workflow>,
    pub branch_protection: Option<BranchProtection>,
    pub latest_run: Option<WorkflowRun>,
    /// Whether a `go.mod` file exists on the default branch.
    pub has_go_mod: bool,
}

/// Builds `PolicyContext` values, optionally seeded with an active profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder<'p> {
    profile: Option<&'p Profile>,
}

impl<'p> ContextBuilder<'p> {
    pub fn new(profile: Option<&'p Profile>) -> Self {
        Self { profile }
    }

    /// Replace the active profile.
    pub fn with_profile(mut self, profile: Option<&'p Profile>) -> Self {
        self.profile = profile;
        self
    }

    /// Build a context from a repository, its workflows and optional branch protection.
    pub fn build(
        &self,
        repo: &Repo,
        workflows: &[Workflow],
        branch_protection: Option<&BranchProtection>,
    ) -> PolicyContext {
        let mut ci = build_ci_context(workflows);
        let mut protection = BranchProtectionContext::default();

        if let Some(bp) = branch_protection {
            protection = BranchProtectionContext {
                enabled: bp.enabled,
                require_reviews: bp.require_reviews,
                require_status_checks: bp.require_status_checks,
                enforce_admins: bp.enforce_admins,
            };
            ci.required_checks = bp.required_status_checks.clone();
        }

        PolicyContext {
            repo: RepoContext {
                name: repo.name.clone(),
                org: repo.owner.clone(),
                full_name: repo.full_name.clone(),
                languages: repo.languages.clone(),
                topics: repo.topics.clone(),
                archived: repo.archived,
                fork: repo.fork,
            },
            ci,
            go: self.build_go_context(repo, workflows),
            dependencies: Default::default(),
            branch_protection: protection,
        }
    }

    /// Build a context from a full snapshot, including the latest run and go.mod lookup.
    pub fn build_snapshot(&self, snapshot: &RepoSnapshot) -> PolicyContext {
        let mut ctx = self.build(
            &snapshot.repo,
            &snapshot.workflows,
            snapshot.branch_protection.as_ref(),
        );
        ctx.ci.last_run_passed = snapshot
            .latest_run
            .as_ref()
            .map(WorkflowRun::passed)
            .unwrap_or(false);
        if snapshot.repo.has_language("Go") {
            ctx.go.has_go_mod = snapshot.has_go_mod;
        }
        ctx
    }

    fn build_go_context(&self, repo: &Repo, workflows: &[Workflow]) -> GoContext {
        let mut go = GoContext::default();
        if !repo.has_language("Go") {
            return go;
        }

        if let Some(profile) = self.profile {
            go.profile = profile.name.clone();
            go.versions = profile.go.versions.clone();
        }

        let mut versions = OrderedSet::default();
        for job in workflows.iter().flat_map(|wf| &wf.jobs) {
            if let Some(matrix) = &job.matrix {
                versions.extend(&matrix.go_version);
            }
        }

        if !versions.is_empty() {
            go.versions = versions.into_vec();
        }
        go
    }
}

fn build_ci_context(workflows: &[Workflow]) -> CiContext {
    let mut ci = CiContext {
        has_workflow: !workflows.is_empty(),
        ..CiContext::default()
    };

    if let Some(first) = workflows
        .iter()
        .find_map(|wf| wf.reusable_workflow_refs.first())
    {
        ci.uses_reusable_workflow = true;
        ci.reusable_workflow_ref = first.full_ref.clone();
    }

    let mut os_matrix = OrderedSet::default();
    for job in workflows.iter().flat_map(|wf| &wf.jobs) {
        os_matrix.extend(&job.runs_on);
        if let Some(matrix) = &job.matrix {
            os_matrix.extend(&matrix.os);
        }
    }
    ci.os_matrix = os_matrix.into_vec();
    ci
}

/// Insertion-ordered string set.
#[derive(Default)]
struct OrderedSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedSet {
    fn extend<'a>(&mut self, values: impl IntoIterator<Item = &'a String>) {
        for value in values {
            if self.seen.insert(value.clone()) {
                self.items.push(value.clone());
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
