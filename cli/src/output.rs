//! Human-readable rendering of a scan result.

use std::fmt::{self, Write};

use conductor_contracts::{ComplianceResult, RepoResult};

/// Render a plain-text summary of `result`.
pub fn render_summary(result: &ComplianceResult) -> String {
    let mut out = String::new();
    match write_summary(&mut out, result) {
        Ok(()) => out,
        Err(fmt::Error) => String::new(),
    }
}

/// Write a plain-text summary of `result` to `out`.
pub fn write_summary(out: &mut impl Write, result: &ComplianceResult) -> fmt::Result {
    let s = &result.summary;

    writeln!(
        out,
        "Compliance scan at {} ({} ms)",
        result.timestamp.to_rfc3339(),
        result.scan_duration_ms
    )?;
    writeln!(out, "Profile: {}", result.config.profile)?;
    writeln!(out)?;
    writeln!(out, "  repositories   {}", s.total_repos)?;
    writeln!(out, "  compliant      {}", s.compliant_repos)?;
    writeln!(out, "  non-compliant  {}", s.non_compliant)?;
    writeln!(out, "  skipped        {}", s.skipped)?;
    writeln!(out, "  errors         {}", s.errors)?;
    writeln!(out, "  compliance     {:.1}%", s.compliance_rate)?;
    writeln!(out, "  violations     {}", result.violation_count())?;
    writeln!(out)?;

    let width = result
        .repos
        .iter()
        .map(|r| r.repo.full_name.len())
        .max()
        .unwrap_or(0);

    for repo in &result.repos {
        writeln!(out, "{:<width$}  {}", repo.repo.full_name, status(repo))?;
        for v in &repo.violations {
            writeln!(out, "    [{}] {}: {}", v.severity, v.policy, v.message)?;
            if let Some(fix) = &v.remediation {
                writeln!(out, "        fix: {fix}")?;
            }
        }
        for w in &repo.warnings {
            writeln!(out, "    warning {}: {}", w.code, w.message)?;
        }
    }
    Ok(())
}

fn status(repo: &RepoResult) -> String {
    if repo.skipped {
        format!("skipped ({})", repo.skip_reason)
    } else if !repo.error.is_empty() {
        format!("error: {}", repo.error)
    } else if repo.violations.is_empty() {
        "compliant".to_string()
    } else {
        format!("{} violation(s)", repo.violations.len())
    }
}
