//! Named profile storage with a fallback chain.
//!
//! Lookup through `get_or_default` never fails:
//!
//!   requested name → registered `"default"` → built-in default profile

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use conductor_contracts::{
    error::{ConductorError, ConductorResult},
    PolicyContext, Profile, Violation,
};
use conductor_core::traits::ProfileValidator;

use crate::{
    builtin::{builtin_profiles, default_profile, DEFAULT_PROFILE},
    validate::validate_repo_against_profile,
};

const PROFILE_EXTENSION: &str = "toml";

/// Profiles keyed by name.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
    fallback: Profile,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileRegistry {
    /// An empty registry.  `get_or_default` still resolves to the built-in default.
    pub fn new() -> Self {
        Self {
            profiles: BTreeMap::new(),
            fallback: default_profile(),
        }
    }

    /// A registry holding the built-in profiles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.load_builtin_profiles();
        registry
    }

    /// Register `profile`, replacing any profile of the same name.
    pub fn add(&mut self, profile: Profile) {
        debug!(profile = %profile.name, "profile registered");
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn load_builtin_profiles(&mut self) {
        for profile in builtin_profiles() {
            self.add(profile);
        }
    }

    /// Look up `name` exactly.
    ///
    /// # Errors
    ///
    /// `ConductorError::ProfileNotFound` when nothing is registered under `name`.
    pub fn get(&self, name: &str) -> ConductorResult<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConductorError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Resolve `name` through the fallback chain.
    pub fn get_or_default(&self, name: &str) -> &Profile {
        self.profiles
            .get(name)
            .or_else(|| self.profiles.get(DEFAULT_PROFILE))
            .unwrap_or(&self.fallback)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Parse a TOML profile and register it.  Returns the registered name.
    ///
    /// A profile without a `name` is named after the file stem.
    pub fn load_file(&mut self, path: &Path) -> ConductorResult<String> {
        let profile = read_profile(path)?;
        let name = profile.name.clone();
        self.add(profile);
        Ok(name)
    }

    /// Register every `*.toml` file directly inside `dir`, in sorted order.
    ///
    /// All files are registered or none are.  Returns the number loaded.
    pub fn load_dir(&mut self, dir: &Path) -> ConductorResult<usize> {
        let read_err = |e: std::io::Error| ConductorError::ProfileLoad {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == PROFILE_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let profiles = paths
            .iter()
            .map(|p| read_profile(p))
            .collect::<ConductorResult<Vec<_>>>()?;
        let count = profiles.len();
        for profile in profiles {
            self.add(profile);
        }

        info!(dir = %dir.display(), count, "profiles loaded");
        Ok(count)
    }
}

fn read_profile(path: &Path) -> ConductorResult<Profile> {
    let load_err = |reason: String| ConductorError::ProfileLoad {
        path: path.display().to_string(),
        reason,
    };

    let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    let mut profile: Profile = toml::from_str(&text).map_err(|e| load_err(e.to_string()))?;

    if profile.name.is_empty() {
        profile.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| load_err("cannot derive profile name from path".to_string()))?;
    }
    Ok(profile)
}

impl ProfileValidator for ProfileRegistry {
    fn resolve(&self, name: &str) -> &Profile {
        self.get_or_default(name)
    }

    fn validate(&self, ctx: &PolicyContext, profile: &Profile) -> Vec<Violation> {
        validate_repo_against_profile(ctx, profile)
    }
}
