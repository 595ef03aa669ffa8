//! A small fictional organisation for demos and tests.
//!
//! All data in this module is hardcoded.  No external systems are contacted.
//!
//! | repository        | shape                                                          |
//! |-------------------|----------------------------------------------------------------|
//! | `acme/api-gateway`| Go, reusable workflow, full OS matrix, protected, last run green |
//! | `acme/billing`    | Go 1.22 on Linux only, last run red                            |
//! | `acme/docs-site`  | TypeScript, no workflows                                       |
//! | `acme/payments`   | Go, workflow listing fails with HTTP 403                       |
//! | `acme/old-cli`    | archived, skipped under the default filter                     |

use serde_json::{json, Value};

use conductor_contracts::error::{ConductorError, ConductorResult};

use crate::memory::Fixture;

/// Organisation every sample repository belongs to.
pub const SAMPLE_ORG: &str = "acme";

fn repo(name: &str, languages: &[&str], topics: &[&str]) -> Value {
    json!({
        "owner": SAMPLE_ORG,
        "name": name,
        "fullName": format!("{SAMPLE_ORG}/{name}"),
        "defaultBranch": "main",
        "languages": languages,
        "primaryLanguage": languages.first().copied().unwrap_or_default(),
        "topics": topics,
        "visibility": "private",
        "htmlUrl": format!("https://example.invalid/{SAMPLE_ORG}/{name}"),
    })
}

/// The sample organisation as fixture JSON.
pub fn sample_fixture_json() -> Value {
    let mut old_cli = repo("old-cli", &["Go"], &["tooling"]);
    old_cli["archived"] = json!(true);

    json!({
        "repos": [
            repo("api-gateway", &["Go", "Shell"], &["service", "edge"]),
            repo("billing", &["Go"], &["service"]),
            repo("docs-site", &["TypeScript"], &["docs"]),
            repo("payments", &["Go"], &["service", "pci"]),
            old_cli,
        ],
        "workflows": {
            "acme/api-gateway": [{
                "name": "ci",
                "path": ".github/workflows/ci.yml",
                "triggers": ["push", "pull_request"],
                "state": "active",
                "reusableWorkflowRefs": [{
                    "owner": "acme",
                    "repo": "shared-workflows",
                    "path": ".github/workflows/go-ci.yml",
                    "ref": "v3",
                    "fullRef": "acme/shared-workflows/.github/workflows/go-ci.yml@v3",
                }],
                "jobs": [{
                    "id": "test",
                    "name": "test",
                    "runsOn": ["ubuntu-latest"],
                    "matrix": {
                        "os": ["ubuntu-latest", "macos-latest", "windows-latest"],
                        "goVersion": ["1.24", "1.25"],
                        "failFast": false,
                    },
                }],
            }],
            "acme/billing": [{
                "name": "build",
                "path": ".github/workflows/build.yml",
                "triggers": ["push"],
                "state": "active",
                "jobs": [{
                    "id": "build",
                    "name": "build",
                    "runsOn": ["ubuntu-latest"],
                    "matrix": { "goVersion": ["1.22"] },
                }],
            }],
            "acme/payments": [{
                "name": "ci",
                "path": ".github/workflows/ci.yml",
                "jobs": [{ "id": "test", "runsOn": ["ubuntu-latest"] }],
            }],
        },
        "branchProtection": {
            "acme/api-gateway": {
                "branch": "main",
                "enabled": true,
                "requireReviews": true,
                "requiredReviewers": 2,
                "requireStatusChecks": true,
                "requiredStatusChecks": ["test"],
                "enforceAdmins": true,
            },
        },
        "latestRuns": {
            "acme/api-gateway": {
                "id": 9001,
                "workflowId": 11,
                "name": "ci",
                "status": "completed",
                "conclusion": "success",
                "branch": "main",
                "headSha": "4f2a9c1",
            },
            "acme/billing": {
                "id": 9002,
                "workflowId": 12,
                "name": "build",
                "status": "completed",
                "conclusion": "failure",
                "branch": "main",
                "headSha": "b71e03d",
            },
        },
        "files": {
            "acme/api-gateway": { "go.mod": "module acme/api-gateway\n\ngo 1.24\n" },
            "acme/billing": { "go.mod": "module acme/billing\n\ngo 1.22\n" },
        },
        "failures": [{
            "repo": "acme/payments",
            "operation": "workflows",
            "status": 403,
            "message": "Resource not accessible by integration",
        }],
    })
}

/// The sample organisation as a typed `Fixture`.
pub fn sample_fixture() -> ConductorResult<Fixture> {
    serde_json::from_value(sample_fixture_json()).map_err(|e| ConductorError::ConfigError {
        reason: format!("invalid sample fixture: {e}"),
    })
}
