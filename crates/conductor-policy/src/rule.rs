//! A registered Cedar policy and the annotations the conductor reads.
//!
//! One policy per text:
//!
//! ```cedar
//! @description("Archived repositories may not merge or deploy")
//! @severity("critical")
//! forbid(
//!     principal,
//!     action in [Action::"merge", Action::"deploy"],
//!     resource
//! )
//! when { context.archived }
//! unless { context.topics.contains("sandbox") };
//! ```
//!
//! `@severity` is only accepted on `forbid` policies and must be one of
//! `critical`, `high`, `medium`, `low` or `info`.

use std::fmt;

use cedar_policy::{Policy, PolicyId};

use conductor_contracts::Severity;

/// Annotation carrying a forbid policy's severity override.
pub const SEVERITY_ANNOTATION: &str = "severity";
/// Annotation carrying a human-readable description.
pub const DESCRIPTION_ANNOTATION: &str = "description";

/// Whether a satisfied policy allows or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Permit,
    Forbid,
}

impl From<cedar_policy::Effect> for Effect {
    fn from(effect: cedar_policy::Effect) -> Self {
        match effect {
            cedar_policy::Effect::Permit => Effect::Permit,
            cedar_policy::Effect::Forbid => Effect::Forbid,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Effect::Permit => "permit",
            Effect::Forbid => "forbid",
        })
    }
}

/// A parsed policy ready for registration.
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    pub id: String,
    pub effect: Effect,
    pub description: String,
    pub severity: Option<Severity>,
    policy: Policy,
}

impl PolicyEntry {
    /// Parse one static Cedar policy and read its annotations.
    pub fn parse(id: &str, text: &str) -> Result<Self, String> {
        let policy = Policy::parse(Some(PolicyId::new(id)), text).map_err(|e| e.to_string())?;
        let effect = Effect::from(policy.effect());

        let severity = match policy.annotation(SEVERITY_ANNOTATION) {
            Some(raw) => Some(raw.parse::<Severity>()?),
            None => None,
        };
        if effect == Effect::Permit && severity.is_some() {
            return Err("@severity may only be set on forbid policies".to_string());
        }

        let description = policy
            .annotation(DESCRIPTION_ANNOTATION)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            id: id.to_string(),
            effect,
            description,
            severity,
            policy,
        })
    }

    /// The underlying Cedar policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}
