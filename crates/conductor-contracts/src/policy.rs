//! Actions, severities, evaluation outcomes and violations.
//!
//! The policy engine consumes a `PolicyContext` plus an `Action` and
//! produces an `EvaluationResult`.  The conductor is deny-by-default: a
//! result is only `allowed` when some permit policy matched and no forbid
//! policy did.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Namespace prefix for violations produced from policy denials.
pub const POLICY_VIOLATION_NAMESPACE: &str = "policy";

/// A CI/CD action a policy can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Build,
    Test,
    Lint,
    Merge,
    Deploy,
    Release,
}

/// The actions `evaluate_all` runs, in this order.
pub const STANDARD_ACTIONS: [Action; 4] = [Action::Build, Action::Test, Action::Lint, Action::Merge];

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Build,
        Action::Test,
        Action::Lint,
        Action::Merge,
        Action::Deploy,
        Action::Release,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Build => "build",
            Action::Test => "test",
            Action::Lint => "lint",
            Action::Merge => "merge",
            Action::Deploy => "deploy",
            Action::Release => "release",
        }
    }

    /// Severity of a denial when no policy author overrides it:
    /// `High` for `merge` and `deploy`, `Medium` otherwise.
    pub fn default_severity(&self) -> Severity {
        match self {
            Action::Merge | Action::Deploy => Severity::High,
            _ => Severity::Medium,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

/// Severity of a violation.
///
/// The lowercase string values are a stability contract for report encoders.
/// `Ord` ranks `Critical` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
            Severity::Info => 0,
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ]
        .into_iter()
        .find(|sev| sev.as_str() == s)
        .ok_or_else(|| format!("unknown severity '{s}'"))
    }
}

/// One policy or profile disagreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub policy: String,
    pub rule: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// A non-blocking issue noticed while scanning a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Outcome of evaluating one action against one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub allowed: bool,
    pub action: Action,
    /// Full name of the repository the request was evaluated for.
    pub repo_name: String,
    /// Ids of the policies that determined the decision, in store order.
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Evaluation-time diagnostics.  A policy listed here was skipped.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Highest severity declared by the forbid policies behind a denial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl EvaluationResult {
    /// Convert a denial into a `Violation`.  Returns `None` when allowed.
    pub fn to_violation(&self) -> Option<Violation> {
        if self.allowed {
            return None;
        }

        let severity = self
            .severity
            .unwrap_or_else(|| self.action.default_severity());

        let message = if self.reasons.is_empty() {
            format!("Policy denied {} action", self.action)
        } else {
            format!(
                "Policy denied {} action (policies: [{}])",
                self.action,
                self.reasons.join(", ")
            )
        };

        Some(Violation {
            policy: format!("{}/{}", POLICY_VIOLATION_NAMESPACE, self.action),
            rule: self.action.to_string(),
            message,
            severity,
            remediation: None,
            file: None,
            line: None,
        })
    }
}
