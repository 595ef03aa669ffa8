//! Repository entities as returned by a Source Collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository with its metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Repo {
    pub owner: String,
    pub name: String,
    /// `owner/name`; used as the resource identity during policy evaluation.
    pub full_name: String,
    pub default_branch: String,
    pub languages: Vec<String>,
    pub primary_language: String,
    pub topics: Vec<String>,
    /// `public`, `private` or `internal`.
    pub visibility: String,
    pub archived: bool,
    pub fork: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub html_url: String,
}

/// Criteria for selecting which repositories a scan covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoFilter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_languages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_languages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_topics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_topics: Vec<String>,
    pub include_archived: bool,
    pub include_forks: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visibility_filter: Vec<String>,
    /// Glob matched against the repository name (not the full name).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name_pattern: String,
}

/// Branch protection settings for one branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BranchProtection {
    pub branch: String,
    pub enabled: bool,
    pub require_reviews: bool,
    pub required_reviewers: u32,
    pub require_status_checks: bool,
    pub required_status_checks: Vec<String>,
    pub enforce_admins: bool,
    pub require_signed_commits: bool,
    pub allow_force_pushes: bool,
    pub allow_deletions: bool,
}

impl Repo {
    /// Return true if this repository satisfies every criterion in `filter`.
    ///
    /// Archived repositories and forks are excluded unless the filter opts
    /// in.  Include lists match when any element overlaps; exclude lists
    /// reject on any overlap.  An invalid `name_pattern` matches nothing.
    pub fn matches(&self, filter: &RepoFilter) -> bool {
        if self.archived && !filter.include_archived {
            return false;
        }
        if self.fork && !filter.include_forks {
            return false;
        }
        if !filter.visibility_filter.is_empty()
            && !filter.visibility_filter.contains(&self.visibility)
        {
            return false;
        }
        if !filter.include_languages.is_empty()
            && !has_any(&self.languages, &filter.include_languages)
        {
            return false;
        }
        if has_any(&self.languages, &filter.exclude_languages) {
            return false;
        }
        if !filter.include_topics.is_empty() && !has_any(&self.topics, &filter.include_topics) {
            return false;
        }
        if has_any(&self.topics, &filter.exclude_topics) {
            return false;
        }
        if !filter.name_pattern.is_empty() {
            return match glob::Pattern::new(&filter.name_pattern) {
                Ok(pattern) => pattern.matches(&self.name),
                Err(_) => false,
            };
        }
        true
    }

    /// Return true if `language` appears in the repository's language list.
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

fn has_any(values: &[String], wanted: &[String]) -> bool {
    wanted.iter().any(|w| values.contains(w))
}
