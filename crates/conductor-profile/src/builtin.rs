//! The profiles every registry can start from.

use conductor_contracts::{
    profile::{ProfileChecks, ProfileGo, ProfileLint, ProfileTest},
    Profile,
};

/// Name of the profile `get_or_default` falls back to.
pub const DEFAULT_PROFILE: &str = "default";

const LINT_TOOL: &str = "golangci-lint";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Standard Go CI for active projects.
pub fn default_profile() -> Profile {
    Profile {
        name: DEFAULT_PROFILE.to_string(),
        description: "Standard Go CI configuration for active projects".to_string(),
        go: ProfileGo {
            versions: strings(&["1.24", "1.25"]),
        },
        os: strings(&["ubuntu-latest", "macos-latest", "windows-latest"]),
        checks: ProfileChecks {
            required: strings(&["test", "lint", "build"]),
        },
        lint: ProfileLint {
            enabled: true,
            tool: LINT_TOOL.to_string(),
        },
        test: ProfileTest {
            coverage: true,
            race: true,
        },
    }
}

/// Latest Go only, no Windows runners.
pub fn modern_profile() -> Profile {
    Profile {
        name: "modern".to_string(),
        description: "Modern Go CI for projects using latest Go features".to_string(),
        go: ProfileGo {
            versions: strings(&["1.25"]),
        },
        os: strings(&["ubuntu-latest", "macos-latest"]),
        checks: ProfileChecks {
            required: strings(&["test", "lint", "build"]),
        },
        lint: ProfileLint {
            enabled: true,
            tool: LINT_TOOL.to_string(),
        },
        test: ProfileTest {
            coverage: true,
            race: true,
        },
    }
}

/// Old toolchains, Linux only, lint and race detection off.
pub fn legacy_profile() -> Profile {
    Profile {
        name: "legacy".to_string(),
        description: "Legacy Go CI for older projects requiring Go 1.12-1.18".to_string(),
        go: ProfileGo {
            versions: strings(&["1.12"]),
        },
        os: strings(&["ubuntu-latest"]),
        checks: ProfileChecks {
            required: strings(&["test", "build"]),
        },
        lint: ProfileLint::default(),
        test: ProfileTest::default(),
    }
}

/// All built-in profiles.
pub fn builtin_profiles() -> Vec<Profile> {
    vec![default_profile(), modern_profile(), legacy_profile()]
}
