//! Loading policies from disk and registering the built-in set.
//!
//! Policy ids derived from files are `<parent-dir>/<file-stem>`, so
//! `policies/org/require-ci.cedar` registers as `org/require-ci`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use conductor_contracts::error::{ConductorError, ConductorResult};

use crate::engine::PolicyEngine;

const POLICY_EXTENSION: &str = "cedar";

/// Permit `merge` only when a CI workflow exists.
const REQUIRE_WORKFLOW: &str = r#"
@description("Merging requires a CI workflow")
permit(
    principal,
    action == Action::"merge",
    resource
)
when {
    context.hasWorkflow == true
};
"#;

/// Permit `merge` only when the latest workflow run passed.
const REQUIRE_TESTS: &str = r#"
@description("Merging requires the latest workflow run to pass")
permit(
    principal,
    action == Action::"merge",
    resource
)
when {
    context.lastRunPassed == true
};
"#;

/// Permit `build` only with an approved Go version.
const GO_VERSIONS: &str = r#"
@description("Builds must target an approved Go version")
permit(
    principal,
    action == Action::"build",
    resource
)
when {
    context.goVersions.containsAny(["1.24", "1.25"])
};
"#;

/// The built-in policies, in registration order.
pub const BUILTIN_POLICIES: [(&str, &str); 3] = [
    ("builtin/require-workflow", REQUIRE_WORKFLOW),
    ("builtin/require-tests", REQUIRE_TESTS),
    ("builtin/go-versions", GO_VERSIONS),
];

/// Register the built-in policies.
pub fn load_builtin_policies(engine: &mut PolicyEngine) -> ConductorResult<()> {
    for (id, text) in BUILTIN_POLICIES {
        engine.add_policy(id, text)?;
    }
    debug!(count = BUILTIN_POLICIES.len(), "built-in policies registered");
    Ok(())
}

/// Derive the policy id for `path`: `<parent-dir>/<stem>`, or just the stem
/// when there is no named parent.
pub fn policy_id(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match path.parent().and_then(Path::file_name) {
        Some(parent) => format!("{}/{}", parent.to_string_lossy(), stem),
        None => stem,
    }
}

/// Read and register one policy file.
///
/// # Errors
///
/// `ConductorError::PolicyLoad` naming the path if the file cannot be read
/// or its content is rejected.
pub fn load_file(engine: &mut PolicyEngine, path: &Path) -> ConductorResult<()> {
    let text = fs::read_to_string(path).map_err(|e| ConductorError::PolicyLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    engine
        .add_policy(&policy_id(path), &text)
        .map_err(|e| ConductorError::PolicyLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Register every `*.cedar` file under `dir`, recursively, in sorted path order.
///
/// All files are registered or none are: on the first failure the engine
/// is left as it was.  Two files with the same id are both loaded and the
/// later one wins, with a warning.  Returns the number of files loaded.
pub fn load_dir(engine: &mut PolicyEngine, dir: &Path) -> ConductorResult<usize> {
    let mut paths = Vec::new();
    collect_policy_files(dir, &mut paths)?;
    paths.sort();

    for (id, first, second) in shadowed_ids(&paths) {
        warn!(
            policy_id = %id,
            replaced = %first.display(),
            by = %second.display(),
            "policy id defined twice; the later file replaces the earlier"
        );
    }

    let mut staged = engine.clone();
    for path in &paths {
        load_file(&mut staged, path)?;
    }
    *engine = staged;

    info!(dir = %dir.display(), count = paths.len(), "policies loaded");
    Ok(paths.len())
}

/// Ids derived from more than one of `paths`, as (id, replaced, replacing).
pub fn shadowed_ids(paths: &[PathBuf]) -> Vec<(String, &Path, &Path)> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    let mut shadowed = Vec::new();
    for path in paths {
        let id = policy_id(path);
        if let Some(previous) = seen.insert(id.clone(), path.as_path()) {
            shadowed.push((id, previous, path.as_path()));
        }
    }
    shadowed
}

fn collect_policy_files(dir: &Path, out: &mut Vec<PathBuf>) -> ConductorResult<()> {
    let read_err = |e: std::io::Error| ConductorError::PolicyLoad {
        path: dir.display().to_string(),
        reason: e.to_string(),
    };

    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_dir() {
            collect_policy_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == POLICY_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}
