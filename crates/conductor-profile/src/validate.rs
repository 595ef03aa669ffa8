//! Comparison of a repository's CI configuration against a profile.
//!
//! Three checks run in a fixed order:
//!
//! 1. every Go version in the context must be allowed by the profile;
//! 2. every OS in the context matrix must be allowed by the profile;
//! 3. every OS the profile lists must appear in the context matrix.
//!
//! A check is skipped entirely when the context side it inspects is empty.

use conductor_contracts::{PolicyContext, Profile, Severity, Violation};

pub const GO_VERSION_POLICY: &str = "profile/go-version";
pub const OS_MATRIX_POLICY: &str = "profile/os-matrix";

fn list(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}

fn violation(policy: &str, rule: &str, severity: Severity, message: String, remediation: String) -> Violation {
    Violation {
        policy: policy.to_string(),
        rule: rule.to_string(),
        message,
        severity,
        remediation: Some(remediation),
        file: None,
        line: None,
    }
}

/// Validate `ctx` against `profile`.  Deterministic; never fails.
pub fn validate_repo_against_profile(ctx: &PolicyContext, profile: &Profile) -> Vec<Violation> {
    let mut violations = Vec::new();

    for version in &ctx.go.versions {
        if !profile.go.versions.contains(version) {
            violations.push(violation(
                GO_VERSION_POLICY,
                "allowed-versions",
                Severity::Medium,
                format!(
                    "Go version {version} not in profile {} allowed versions {}",
                    profile.name,
                    list(&profile.go.versions)
                ),
                format!("Update go-version to one of: {}", list(&profile.go.versions)),
            ));
        }
    }

    if ctx.ci.os_matrix.is_empty() {
        return violations;
    }

    for os in &ctx.ci.os_matrix {
        if !profile.os.contains(os) {
            violations.push(violation(
                OS_MATRIX_POLICY,
                "allowed-os",
                Severity::Low,
                format!(
                    "OS {os} not in profile {} allowed platforms {}",
                    profile.name,
                    list(&profile.os)
                ),
                format!("Update runs-on to one of: {}", list(&profile.os)),
            ));
        }
    }

    for required in &profile.os {
        if !ctx.ci.os_matrix.contains(required) {
            violations.push(violation(
                OS_MATRIX_POLICY,
                "required-os",
                Severity::Info,
                format!(
                    "Profile {} requires OS {required} but it's not in the matrix",
                    profile.name
                ),
                format!("Add {required} to your OS matrix"),
            ));
        }
    }

    violations
}
