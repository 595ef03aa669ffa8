//! # conductor-profile
//!
//! Named CI/CD profiles for the pipeline conductor.
//!
//! This crate provides:
//! - [`ProfileRegistry`], a name → profile store with a fallback chain that
//!   implements [`ProfileValidator`](conductor_core::traits::ProfileValidator)
//! - The built-in `default`, `modern` and `legacy` profiles
//! - [`validate_repo_against_profile`], which reports where a repository's
//!   Go versions and OS matrix depart from a profile

pub mod builtin;
pub mod registry;
pub mod validate;

pub use builtin::{builtin_profiles, default_profile, legacy_profile, modern_profile, DEFAULT_PROFILE};
pub use registry::ProfileRegistry;
pub use validate::validate_repo_against_profile;

// ── Tests ─────────────────────────────────────────────────────────────────────
