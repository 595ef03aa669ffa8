//! CI workflow entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A CI/CD workflow definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workflow {
    pub name: String,
    pub path: String,
    pub triggers: Vec<String>,
    pub jobs: Vec<WorkflowJob>,
    /// Every reusable workflow this workflow calls, in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reusable_workflow_refs: Vec<ReusableWorkflowRef>,
    pub state: String,
}

/// A job within a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowJob {
    pub id: String,
    pub name: String,
    /// Runner labels from the job's `runs-on` key.
    pub runs_on: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<MatrixConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reusable_workflow_ref: Option<ReusableWorkflowRef>,
}

/// A build matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatrixConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub go_version: Vec<String>,
    pub fail_fast: bool,
}

/// A pointer to a shared workflow hosted in another repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReusableWorkflowRef {
    pub owner: String,
    pub repo: String,
    pub path: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// The reference exactly as written in the workflow file.
    pub full_ref: String,
}

impl ReusableWorkflowRef {
    /// Parse `owner/repo/path/to/workflow.yml@ref`.
    ///
    /// The ref is everything after the first `@`.  The remainder is split
    /// into at most three `/`-separated parts; missing parts stay empty.
    pub fn parse(reference: &str) -> Self {
        let (location, git_ref) = match reference.split_once('@') {
            Some((location, git_ref)) => (location, git_ref.to_string()),
            None => (reference, String::new()),
        };

        let mut parts = location.splitn(3, '/');
        let owner = parts.next().unwrap_or_default().to_string();
        let repo = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        Self {
            owner,
            repo,
            path,
            git_ref,
            full_ref: reference.to_string(),
        }
    }
}

/// One execution of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowRun {
    pub id: i64,
    pub workflow_id: i64,
    pub name: String,
    pub status: String,
    pub conclusion: String,
    pub branch: String,
    pub head_sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// True when the run finished with a `success` conclusion.
    pub fn passed(&self) -> bool {
        self.conclusion == "success"
    }
}
