//! # conductor-core
//!
//! The compliance scan pipeline for the pipeline conductor.
//!
//! This crate provides:
//! - The three trait seams (`Collector`, `PolicyEvaluator`, `ProfileValidator`)
//! - The `ContextBuilder` that normalizes collector data into a `PolicyContext`
//! - The `Scanner` that runs the per-repository pipeline with failure isolation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conductor_core::{Scanner, ScanOptions, traits::{Collector, PolicyEvaluator, ProfileValidator}};
//! ```

pub mod cancel;
pub mod context;
pub mod scanner;
pub mod traits;

pub use cancel::{CancelToken, Deadline};
pub use context::{ContextBuilder, RepoSnapshot};
pub use scanner::{ScanOptions, Scanner};
pub use traits::{Collector, CollectorResult, PolicyEvaluator, ProfileValidator};
