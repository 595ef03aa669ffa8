//! Cedar-backed permit/forbid policy engine.
//!
//! `PolicyEngine` keeps policies in registration order next to the Cedar
//! `PolicySet` built from them, and implements the `PolicyEvaluator` trait
//! from conductor-core.
//!
//! Each request is authorized by Cedar with the principal
//! `CISystem::"pipelineconductor"`, the resource `Repository::"<full name>"`
//! and a context holding every attribute in `ATTRIBUTE_SCHEMA`:
//!
//! 1. A policy whose conditions cannot be evaluated is recorded in
//!    `errors` and ignored.
//! 2. Any satisfied `forbid` → deny; reasons are the satisfied forbid ids.
//! 3. Otherwise any satisfied `permit` → allow; reasons are the permit ids.
//! 4. Otherwise deny with no reasons (default deny).

use std::collections::HashSet;
use std::str::FromStr;

use cedar_policy::{
    Authorizer, Decision, Entities, EntityId, EntityTypeName, EntityUid, PolicySet, Request,
    Schema, ValidationMode, Validator,
};
use tracing::{debug, warn};

use conductor_contracts::{
    error::{ConductorError, ConductorResult},
    Action, EvaluationResult, PolicyContext,
};
use conductor_core::traits::PolicyEvaluator;

use crate::{
    rule::{Effect, PolicyEntry},
    schema::{cedar_schema, AttributeRecord, ACTION_TYPE, ATTRIBUTE_SCHEMA_VERSION, PRINCIPAL_TYPE, RESOURCE_TYPE},
};

/// Id of the `CISystem` principal every scan request is made on behalf of.
pub const SYSTEM_PRINCIPAL: &str = "pipelineconductor";

/// Policy store plus evaluator.
///
/// Registration needs `&mut self`; evaluation only `&self`.  Load every
/// policy first, then share the engine read-only across scan workers.
///
/// ```rust,ignore
/// let mut engine = PolicyEngine::new();
/// engine.add_policy("org/require-ci", text)?;
/// let result = engine.evaluate(&ctx, Action::Merge);
/// ```
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    entries: Vec<PolicyEntry>,
    policies: PolicySet,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            policies: PolicySet::new(),
        }
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse Cedar `text` and register it under `id`.
    ///
    /// Re-registering an existing id replaces that policy in place.
    /// Conditions on attributes outside the schema are accepted with a
    /// warning; they fail when evaluated.
    ///
    /// # Errors
    ///
    /// Returns `ConductorError::PolicyParse` when the text is rejected; the
    /// store is left exactly as it was.
    pub fn add_policy(&mut self, id: &str, text: &str) -> ConductorResult<()> {
        let rejected = |reason: String| ConductorError::PolicyParse {
            policy_id: id.to_string(),
            reason,
        };
        let entry = PolicyEntry::parse(id, text).map_err(rejected)?;

        for error in schema_errors(&entry) {
            warn!(
                policy_id = %id,
                schema_version = ATTRIBUTE_SCHEMA_VERSION,
                error = %error,
                "policy does not match the attribute schema"
            );
        }

        let mut entries = self.entries.clone();
        match entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        let policies = policy_set(&entries).map_err(rejected)?;

        debug!(policy_id = %id, count = entries.len(), "policy registered");
        self.entries = entries;
        self.policies = policies;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in store order.
    pub fn policy_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&PolicyEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Authorize `action` on the repository `resource` with `record` as context.
    pub fn evaluate_request(
        &self,
        action: Action,
        resource: &str,
        record: &AttributeRecord,
    ) -> EvaluationResult {
        let mut result = EvaluationResult {
            allowed: false,
            action,
            repo_name: resource.to_string(),
            reasons: Vec::new(),
            errors: Vec::new(),
            severity: None,
        };

        let request = match build_request(action, resource, record) {
            Ok(request) => request,
            Err(error) => {
                warn!(action = %action, resource = %resource, error = %error, "request rejected");
                result.errors.push(format!("building request: {error}"));
                return result;
            }
        };

        let response = Authorizer::new().is_authorized(&request, &self.policies, &Entities::empty());
        let diagnostics = response.diagnostics();

        for error in diagnostics.errors() {
            warn!(
                action = %action,
                resource = %resource,
                error = %error,
                "policy skipped: evaluation error"
            );
            result.errors.push(error.to_string());
        }

        let deciding: HashSet<String> = diagnostics.reason().map(ToString::to_string).collect();
        let deciding: Vec<&PolicyEntry> = self
            .entries
            .iter()
            .filter(|e| deciding.contains(&e.id))
            .collect();

        result.allowed = response.decision() == Decision::Allow;
        result.reasons = deciding.iter().map(|e| e.id.clone()).collect();
        if !result.allowed {
            result.severity = deciding
                .iter()
                .filter(|e| e.effect == Effect::Forbid)
                .filter_map(|e| e.severity)
                .max();
        }

        debug!(
            action = %action,
            resource = %resource,
            allowed = result.allowed,
            reasons = ?result.reasons,
            "policy decision"
        );
        result
    }
}

impl PolicyEvaluator for PolicyEngine {
    fn evaluate(&self, ctx: &PolicyContext, action: Action) -> EvaluationResult {
        let record = AttributeRecord::from_context(ctx);
        self.evaluate_request(action, &ctx.repo.full_name, &record)
    }
}

/// Problems `entry` has against the attribute schema, one message each.
/// An empty list means the policy validates.
pub fn schema_errors(entry: &PolicyEntry) -> Vec<String> {
    let src = cedar_schema();
    let schema = match Schema::from_cedarschema_str(&src) {
        Ok((schema, _warnings)) => schema,
        Err(e) => return vec![format!("attribute schema: {e}")],
    };

    let mut single = PolicySet::new();
    if let Err(e) = single.add(entry.policy().clone()) {
        return vec![e.to_string()];
    }

    Validator::new(schema)
        .validate(&single, ValidationMode::Strict)
        .validation_errors()
        .map(ToString::to_string)
        .collect()
}

fn policy_set(entries: &[PolicyEntry]) -> Result<PolicySet, String> {
    let mut set = PolicySet::new();
    for entry in entries {
        set.add(entry.policy().clone()).map_err(|e| e.to_string())?;
    }
    Ok(set)
}

fn entity(type_name: &str, id: &str) -> Result<EntityUid, String> {
    let type_name = EntityTypeName::from_str(type_name).map_err(|e| e.to_string())?;
    Ok(EntityUid::from_type_name_and_id(type_name, EntityId::new(id)))
}

fn build_request(action: Action, resource: &str, record: &AttributeRecord) -> Result<Request, String> {
    Request::new(
        entity(PRINCIPAL_TYPE, SYSTEM_PRINCIPAL)?,
        entity(ACTION_TYPE, action.as_str())?,
        entity(RESOURCE_TYPE, resource)?,
        record.to_context()?,
        None,
    )
    .map_err(|e| e.to_string())
}
