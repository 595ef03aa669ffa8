//! Scan settings: optional `conductor.toml` merged with command-line flags.
//!
//! Flags win over file values; file values win over defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use conductor_contracts::{
    error::{ConductorError, ConductorResult},
    RepoFilter, ScanConfig,
};
use conductor_profile::DEFAULT_PROFILE;

/// Contents of a `conductor.toml` file.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub orgs: Vec<String>,
    pub profile: Option<String>,
    pub policy_repo: Option<String>,
    pub policy_ref: Option<String>,
    pub policies_dir: Option<PathBuf>,
    pub profiles_dir: Option<PathBuf>,
    pub fixture: Option<PathBuf>,
    pub builtin_policies: Option<bool>,
    pub repo_timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub filter: RepoFilter,
}

impl FileConfig {
    pub fn from_toml_str(s: &str) -> ConductorResult<Self> {
        toml::from_str(s).map_err(|e| ConductorError::ConfigError {
            reason: format!("failed to parse config TOML: {e}"),
        })
    }

    /// Read `path`.  Relative directories inside it resolve against the file's directory.
    pub fn from_file(path: &Path) -> ConductorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConductorError::ConfigError {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Some(base) = path.parent() {
            for dir in [
                &mut config.policies_dir,
                &mut config.profiles_dir,
                &mut config.fixture,
            ] {
                if let Some(p) = dir.as_mut() {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }
        Ok(config)
    }
}

/// Command-line overrides for a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub orgs: Vec<String>,
    pub profile: Option<String>,
    pub policies_dir: Option<PathBuf>,
    pub profiles_dir: Option<PathBuf>,
    pub fixture: Option<PathBuf>,
    pub no_builtin_policies: bool,
    pub repo_timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub include_archived: bool,
    pub include_forks: bool,
    pub name_pattern: Option<String>,
}

/// Fully resolved scan settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scan: ScanConfig,
    pub policies_dir: Option<PathBuf>,
    pub profiles_dir: Option<PathBuf>,
    /// `None` scans the bundled sample organisation.
    pub fixture: Option<PathBuf>,
    pub builtin_policies: bool,
    /// `None` disables the per-repository timeout.
    pub repo_timeout: Option<Duration>,
    pub concurrency: usize,
    pub max_retries: u32,
}

pub const DEFAULT_REPO_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_RETRIES: u32 = 5;

impl Settings {
    /// Merge `file` and `flags`.
    ///
    /// # Errors
    ///
    /// `ConductorError::ConfigError` when `concurrency` resolves to zero.
    pub fn resolve(file: FileConfig, flags: Overrides) -> ConductorResult<Self> {
        let concurrency = flags
            .concurrency
            .or(file.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(ConductorError::ConfigError {
                reason: "concurrency must be at least 1".to_string(),
            });
        }

        let timeout_secs = flags
            .repo_timeout_secs
            .or(file.repo_timeout_secs)
            .unwrap_or(DEFAULT_REPO_TIMEOUT_SECS);

        let mut filter = file.filter;
        filter.include_archived |= flags.include_archived;
        filter.include_forks |= flags.include_forks;
        if let Some(pattern) = flags.name_pattern {
            filter.name_pattern = pattern;
        }

        let orgs = if flags.orgs.is_empty() {
            file.orgs
        } else {
            flags.orgs
        };

        Ok(Self {
            scan: ScanConfig {
                orgs,
                policy_repo: file.policy_repo.unwrap_or_default(),
                policy_ref: file.policy_ref.unwrap_or_default(),
                profile: flags
                    .profile
                    .or(file.profile)
                    .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
                filter,
            },
            policies_dir: flags.policies_dir.or(file.policies_dir),
            profiles_dir: flags.profiles_dir.or(file.profiles_dir),
            fixture: flags.fixture.or(file.fixture),
            builtin_policies: !flags.no_builtin_policies && file.builtin_policies.unwrap_or(true),
            repo_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            concurrency,
            max_retries: flags
                .max_retries
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }
}
