//! Named CI/CD configuration profiles.
//!
//! Profiles are plain data.  The registry and validator that consume them
//! live in `conductor-profile`.
//!
//! Example in TOML:
//! ```toml
//! name = "modern"
//! description = "Modern Go CI"
//! os = ["ubuntu-latest", "macos-latest"]
//!
//! [go]
//! versions = ["1.25"]
//!
//! [checks]
//! required = ["test", "lint", "build"]
//! ```

use serde::{Deserialize, Serialize};

/// A named expectation for a repository's CI/CD configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub go: ProfileGo,
    /// Operating systems the CI matrix is expected to cover.
    pub os: Vec<String>,
    pub checks: ProfileChecks,
    pub lint: ProfileLint,
    pub test: ProfileTest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileGo {
    /// Allowed Go versions; the first entry is the preferred one.
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileChecks {
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileLint {
    pub enabled: bool,
    pub tool: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileTest {
    pub coverage: bool,
    pub race: bool,
}

impl Profile {
    /// The preferred Go version, if the profile declares any.
    pub fn preferred_go_version(&self) -> Option<&str> {
        self.go.versions.first().map(String::as_str)
    }
}
