//! Pipeline Conductor CLI
//!
//! Scans an organisation's repositories for CI/CD compliance against the
//! loaded policies and a named profile.  Repository data comes from a JSON
//! fixture; without one, the bundled sample organisation is scanned.
//!
//! Usage:
//!   cargo run -p conductor-cli -- scan
//!   cargo run -p conductor-cli -- scan --config conductor.toml --format json
//!   cargo run -p conductor-cli -- profiles --profiles-dir profiles
//!   cargo run -p conductor-cli -- check-policies policies

mod config;
mod output;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use conductor_collect::{
    mock_data::sample_fixture, CachingCollector, Fixture, InMemoryCollector, RetryPolicy,
    RetryingCollector,
};
use conductor_contracts::{error::ConductorResult, ComplianceResult};
use conductor_core::{CancelToken, ScanOptions, Scanner};
use conductor_policy::{load_builtin_policies, load_dir, PolicyEngine};
use conductor_profile::ProfileRegistry;

use crate::config::{FileConfig, Overrides, Settings};

type CliResult<T> = Result<T, Box<dyn Error>>;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Pipeline Conductor: CI/CD compliance scanning.
#[derive(Parser)]
#[command(
    name = "conductor",
    about = "Scan repositories for CI/CD policy and profile compliance",
    long_about = "Evaluates every repository of an organisation against permit/forbid\n\
                  policies and a named CI profile, then reports per-repository violations."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a compliance scan.
    Scan(ScanArgs),
    /// List the available profiles.
    Profiles {
        /// Directory of additional TOML profiles.
        #[arg(long)]
        profiles_dir: Option<PathBuf>,
    },
    /// Load a policy directory and report what it registers.
    CheckPolicies {
        /// Directory of Cedar policies, searched recursively.
        dir: PathBuf,
        /// Do not register the built-in policies first.
        #[arg(long)]
        no_builtin: bool,
    },
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Summary,
    Json,
}

#[derive(Args)]
struct ScanArgs {
    /// Path to a `conductor.toml` file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON fixture to scan instead of the sample organisation.
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// Organisation to scan; repeatable.
    #[arg(long = "org")]
    orgs: Vec<String>,
    #[arg(long)]
    profile: Option<String>,
    #[arg(long)]
    policies_dir: Option<PathBuf>,
    #[arg(long)]
    profiles_dir: Option<PathBuf>,
    #[arg(long)]
    no_builtin_policies: bool,
    /// Per-repository timeout in seconds; 0 disables it.
    #[arg(long)]
    repo_timeout_secs: Option<u64>,
    #[arg(long)]
    concurrency: Option<usize>,
    #[arg(long)]
    max_retries: Option<u32>,
    #[arg(long)]
    include_archived: bool,
    #[arg(long)]
    include_forks: bool,
    /// Glob over repository names.
    #[arg(long)]
    name_pattern: Option<String>,
    #[arg(long, value_enum, default_value_t)]
    format: Format,
    /// Exit with status 2 when any repository is non-compliant.
    #[arg(long)]
    fail_on_violation: bool,
}

impl ScanArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            orgs: self.orgs.clone(),
            profile: self.profile.clone(),
            policies_dir: self.policies_dir.clone(),
            profiles_dir: self.profiles_dir.clone(),
            fixture: self.fixture.clone(),
            no_builtin_policies: self.no_builtin_policies,
            repo_timeout_secs: self.repo_timeout_secs,
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            include_archived: self.include_archived,
            include_forks: self.include_forks,
            name_pattern: self.name_pattern.clone(),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Set RUST_LOG=debug for per-decision output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Scan(args) => run_scan(&args),
        Command::Profiles { profiles_dir } => run_profiles(profiles_dir.as_deref()),
        Command::CheckPolicies { dir, no_builtin } => run_check_policies(&dir, no_builtin),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("conductor: {e}");
            ExitCode::FAILURE
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_scan(args: &ScanArgs) -> CliResult<ExitCode> {
    let file = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file, args.overrides())?;
    let result = scan(&settings)?;

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Summary => print!("{}", output::render_summary(&result)),
    }

    if args.fail_on_violation && result.summary.non_compliant > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_profiles(profiles_dir: Option<&Path>) -> CliResult<ExitCode> {
    let registry = build_profiles(profiles_dir)?;
    for name in registry.list() {
        let profile = registry.get(name)?;
        println!(
            "{:<10} go [{}]  os [{}]  {}",
            profile.name,
            profile.go.versions.join(", "),
            profile.os.join(", "),
            profile.description
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_check_policies(dir: &Path, no_builtin: bool) -> CliResult<ExitCode> {
    let mut engine = PolicyEngine::new();
    if !no_builtin {
        load_builtin_policies(&mut engine)?;
    }
    load_dir(&mut engine, dir)?;

    for id in engine.policy_ids() {
        if let Some(policy) = engine.get(id) {
            println!("{:<7} {:<40} {}", policy.effect.to_string(), id, policy.description);
        }
    }
    println!("{} policies OK", engine.len());
    Ok(ExitCode::SUCCESS)
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn build_engine(settings: &Settings) -> ConductorResult<PolicyEngine> {
    let mut engine = PolicyEngine::new();
    if settings.builtin_policies {
        load_builtin_policies(&mut engine)?;
    }
    if let Some(dir) = &settings.policies_dir {
        load_dir(&mut engine, dir)?;
    }
    if engine.is_empty() {
        warn!("no policies loaded; every action will be denied");
    }
    Ok(engine)
}

fn build_profiles(profiles_dir: Option<&Path>) -> ConductorResult<ProfileRegistry> {
    let mut registry = ProfileRegistry::with_builtins();
    if let Some(dir) = profiles_dir {
        registry.load_dir(dir)?;
    }
    Ok(registry)
}

/// Run a scan with fully resolved settings.
fn scan(settings: &Settings) -> ConductorResult<ComplianceResult> {
    let engine = build_engine(settings)?;
    let profiles = build_profiles(settings.profiles_dir.as_deref())?;
    if profiles.get(&settings.scan.profile).is_err() {
        warn!(
            profile = %settings.scan.profile,
            fallback = %profiles.get_or_default(&settings.scan.profile).name,
            "profile not registered; using fallback"
        );
    }

    let fixture = match &settings.fixture {
        Some(path) => Fixture::from_file(path)?,
        None => sample_fixture()?,
    };
    info!(
        repos = fixture.repos.len(),
        policies = engine.len(),
        profiles = profiles.len(),
        "scan inputs loaded"
    );

    let collector = RetryingCollector::new(
        CachingCollector::new(InMemoryCollector::new(fixture)),
        RetryPolicy {
            max_retries: settings.max_retries,
            ..RetryPolicy::default()
        },
    );
    let options = ScanOptions {
        repo_timeout: settings.repo_timeout,
        concurrency: settings.concurrency,
        cancel: CancelToken::new(),
    };

    Scanner::new(&collector, &engine, &profiles, options).scan(&settings.scan)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use conductor_contracts::Severity;

    use crate::config::{FileConfig, Overrides, Settings};
    use crate::scan;

    fn workspace_dir(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join(name)
    }

    fn sample_settings(profile: Option<&str>) -> Settings {
        Settings::resolve(
            FileConfig::default(),
            Overrides {
                profile: profile.map(str::to_string),
                policies_dir: Some(workspace_dir("policies")),
                profiles_dir: Some(workspace_dir("profiles")),
                ..Overrides::default()
            },
        )
        .unwrap()
    }

    // ── 1. end-to-end scan of the sample organisation ─────────────────────────

    #[test]
    fn test_sample_scan_summary() {
        let result = scan(&sample_settings(None)).unwrap();

        let names: Vec<_> = result.repos.iter().map(|r| r.repo.full_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "acme/api-gateway",
                "acme/billing",
                "acme/docs-site",
                "acme/payments",
                "acme/old-cli",
            ]
        );

        assert_eq!(result.summary.total_repos, 5);
        assert_eq!(result.summary.compliant_repos, 2);
        assert_eq!(result.summary.non_compliant, 3);
        assert_eq!(result.summary.errors, 1);
        assert_eq!(result.summary.skipped, 1);
        assert!((result.summary.compliance_rate - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_archived_repo_is_reported_as_skipped() {
        let result = scan(&sample_settings(None)).unwrap();

        let old_cli = &result.repos[4];
        assert_eq!(old_cli.repo.full_name, "acme/old-cli");
        assert!(old_cli.skipped);
        assert_eq!(old_cli.skip_reason, conductor_core::scanner::FILTERED_REASON);
        assert!(old_cli.violations.is_empty());
        assert!(old_cli.is_compliant());
    }

    #[test]
    fn test_sample_scan_repo_details() {
        let result = scan(&sample_settings(None)).unwrap();

        assert!(result.repos[0].compliant);
        assert!(result.repos[0].warnings.is_empty());

        let billing = &result.repos[1];
        let policies: Vec<_> = billing.violations.iter().map(|v| v.policy.as_str()).collect();
        assert_eq!(
            policies,
            vec![
                "policy/build",
                "policy/merge",
                "profile/go-version",
                "profile/os-matrix",
                "profile/os-matrix",
            ]
        );
        assert_eq!(billing.violations[1].severity, Severity::High);
        assert_eq!(
            billing.violations[1].message,
            "Policy denied merge action (policies: [baseline/forbid-unprotected-merge])"
        );

        let docs = &result.repos[2];
        let rules: Vec<_> = docs.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["build", "test", "lint", "merge"]);

        let payments = &result.repos[3];
        assert!(!payments.compliant);
        assert!(payments.error.contains("fetching workflows for acme/payments"));
        assert!(payments.error.contains("HTTP 403"));
    }

    #[test]
    fn test_profile_from_directory_changes_outcome() {
        let result = scan(&sample_settings(Some("edge"))).unwrap();
        let gateway = &result.repos[0];

        // 1.24 is outside `edge`, and macOS/Windows are not allowed there.
        let rules: Vec<_> = gateway.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["allowed-versions", "allowed-os", "allowed-os"]);
        assert_eq!(result.config.profile, "edge");
    }

    #[test]
    fn test_result_serializes_with_stable_keys() {
        let result = scan(&sample_settings(None)).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["summary"]["total"], 5);
        assert_eq!(json["summary"]["nonCompliant"], 3);
        assert_eq!(json["repos"][1]["violations"][0]["severity"], "medium");
        assert!(json["scanDurationMs"].is_u64());
    }

    #[test]
    fn test_bundled_config_file_scans_sample_org() {
        let file = FileConfig::from_file(&workspace_dir("conductor.toml")).unwrap();
        let settings = Settings::resolve(file, Overrides::default()).unwrap();

        assert_eq!(settings.scan.orgs, vec!["acme"]);
        assert_eq!(settings.policies_dir, Some(workspace_dir("policies")));

        let result = scan(&settings).unwrap();
        assert_eq!(result.summary.total_repos, 5);
        assert_eq!(result.summary.compliant_repos, 2);
        assert_eq!(result.summary.skipped, 1);
    }

    #[test]
    fn test_include_archived_reaches_the_collector() {
        let settings = Settings::resolve(
            FileConfig::default(),
            Overrides {
                include_archived: true,
                no_builtin_policies: true,
                ..Overrides::default()
            },
        )
        .unwrap();

        let result = scan(&settings).unwrap();
        assert_eq!(result.summary.total_repos, 5);
        assert_eq!(result.summary.skipped, 0);
        // No policies: every evaluated repository is denied by default.
        assert_eq!(result.summary.compliant_repos, 0);
    }
}
