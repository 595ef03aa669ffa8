//! # conductor-policy
//!
//! A Cedar-backed, default-deny permit/forbid policy engine for the
//! pipeline conductor.
//!
//! ## Overview
//!
//! This crate provides [`PolicyEngine`], which implements the
//! [`PolicyEvaluator`](conductor_core::traits::PolicyEvaluator) trait.  Each
//! policy is one Cedar `permit` or `forbid` statement over
//! `CISystem` principals, `Action` actions and `Repository` resources, with
//! conditions on the `context` attributes listed in
//! [`schema::ATTRIBUTE_SCHEMA`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use conductor_policy::{load_builtin_policies, load_dir, PolicyEngine};
//!
//! let mut engine = PolicyEngine::new();
//! load_builtin_policies(&mut engine)?;
//! load_dir(&mut engine, Path::new("policies"))?;
//! // Share `&engine` with `conductor_core::Scanner::new(...)`.
//! ```
//!
//! ## Decision
//!
//! A satisfied `forbid` always wins.  Without one, a satisfied `permit`
//! allows.  Without either, the request is denied.

pub mod engine;
pub mod loader;
pub mod rule;
pub mod schema;

pub use engine::{schema_errors, PolicyEngine, SYSTEM_PRINCIPAL};
pub use loader::{
    load_builtin_policies, load_dir, load_file, policy_id, shadowed_ids, BUILTIN_POLICIES,
};
pub use rule::{Effect, PolicyEntry};
pub use schema::{AttributeRecord, AttributeValue, ATTRIBUTE_SCHEMA, ATTRIBUTE_SCHEMA_VERSION};

// ── Tests ─────────────────────────────────────────────────────────────────────
