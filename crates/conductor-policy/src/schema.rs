//! The attribute schema policies are written against.
//!
//! Every `context.<name>` a Cedar policy may reference is listed in
//! `ATTRIBUTE_SCHEMA` with its type.  The schema is versioned: renaming or
//! retyping an entry is a breaking change for policy authors and must bump
//! `ATTRIBUTE_SCHEMA_VERSION`.
//!
//! Requests use three entity types: the principal `CISystem`, the
//! `Action` being authorized and the `Repository` resource.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use cedar_policy::{Context, RestrictedExpression};

use conductor_contracts::{Action, PolicyContext};

/// Version of the attribute names and types below.
pub const ATTRIBUTE_SCHEMA_VERSION: u32 = 1;

/// Type of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Bool,
    Long,
    /// Unordered set of strings.
    Set,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeType::String => "string",
            AttributeType::Bool => "bool",
            AttributeType::Long => "long",
            AttributeType::Set => "set",
        })
    }
}

impl AttributeType {
    /// The type as written in a Cedar schema.
    pub fn cedar_type(&self) -> &'static str {
        match self {
            AttributeType::String => "String",
            AttributeType::Bool => "Bool",
            AttributeType::Long => "Long",
            AttributeType::Set => "Set<String>",
        }
    }
}

/// Entity type of the request principal.
pub const PRINCIPAL_TYPE: &str = "CISystem";
/// Entity type of request actions.
pub const ACTION_TYPE: &str = "Action";
/// Entity type of the request resource; ids are repository full names.
pub const RESOURCE_TYPE: &str = "Repository";

/// Every attribute exposed to policies, in context-section order.
pub const ATTRIBUTE_SCHEMA: &[(&str, AttributeType)] = &[
    // repo
    ("repoName", AttributeType::String),
    ("repoOrg", AttributeType::String),
    ("repoFullName", AttributeType::String),
    ("archived", AttributeType::Bool),
    ("fork", AttributeType::Bool),
    ("languages", AttributeType::Set),
    ("topics", AttributeType::Set),
    // ci
    ("hasWorkflow", AttributeType::Bool),
    ("usesReusableWorkflow", AttributeType::Bool),
    ("reusableWorkflowRef", AttributeType::String),
    ("lastRunPassed", AttributeType::Bool),
    ("requiredChecks", AttributeType::Set),
    ("osMatrix", AttributeType::Set),
    // go
    ("goVersions", AttributeType::Set),
    ("goProfile", AttributeType::String),
    ("hasGoMod", AttributeType::Bool),
    // dependencies
    ("hasRenovate", AttributeType::Bool),
    ("hasDependabot", AttributeType::Bool),
    ("oldestDependencyDays", AttributeType::Long),
    ("hasVulnerabilities", AttributeType::Bool),
    ("vulnerabilityCount", AttributeType::Long),
    // branch protection
    ("branchProtectionEnabled", AttributeType::Bool),
    ("requireReviews", AttributeType::Bool),
    ("requireStatusChecks", AttributeType::Bool),
    ("branchProtectionEnforceAdmins", AttributeType::Bool),
];

/// Look up the declared type of `name`.
pub fn attribute_type(name: &str) -> Option<AttributeType> {
    ATTRIBUTE_SCHEMA
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| *t)
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Long(i64),
    Set(BTreeSet<String>),
}

impl AttributeValue {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Bool(_) => AttributeType::Bool,
            AttributeValue::Long(_) => AttributeType::Long,
            AttributeValue::Set(_) => AttributeType::Set,
        }
    }

    pub fn to_expression(&self) -> RestrictedExpression {
        match self {
            AttributeValue::String(s) => RestrictedExpression::new_string(s.clone()),
            AttributeValue::Bool(b) => RestrictedExpression::new_bool(*b),
            AttributeValue::Long(n) => RestrictedExpression::new_long(*n),
            AttributeValue::Set(items) => RestrictedExpression::new_set(
                items.iter().cloned().map(RestrictedExpression::new_string),
            ),
        }
    }
}

fn set(values: &[String]) -> AttributeValue {
    AttributeValue::Set(values.iter().cloned().collect())
}

/// The flat attribute record a policy request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeRecord {
    values: BTreeMap<&'static str, AttributeValue>,
}

impl AttributeRecord {
    /// Map every `PolicyContext` field onto its schema attribute.
    pub fn from_context(ctx: &PolicyContext) -> Self {
        use AttributeValue as V;

        let entries = [
            ("repoName", V::String(ctx.repo.name.clone())),
            ("repoOrg", V::String(ctx.repo.org.clone())),
            ("repoFullName", V::String(ctx.repo.full_name.clone())),
            ("archived", V::Bool(ctx.repo.archived)),
            ("fork", V::Bool(ctx.repo.fork)),
            ("languages", set(&ctx.repo.languages)),
            ("topics", set(&ctx.repo.topics)),
            ("hasWorkflow", V::Bool(ctx.ci.has_workflow)),
            ("usesReusableWorkflow", V::Bool(ctx.ci.uses_reusable_workflow)),
            ("reusableWorkflowRef", V::String(ctx.ci.reusable_workflow_ref.clone())),
            ("lastRunPassed", V::Bool(ctx.ci.last_run_passed)),
            ("requiredChecks", set(&ctx.ci.required_checks)),
            ("osMatrix", set(&ctx.ci.os_matrix)),
            ("goVersions", set(&ctx.go.versions)),
            ("goProfile", V::String(ctx.go.profile.clone())),
            ("hasGoMod", V::Bool(ctx.go.has_go_mod)),
            ("hasRenovate", V::Bool(ctx.dependencies.has_renovate)),
            ("hasDependabot", V::Bool(ctx.dependencies.has_dependabot)),
            ("oldestDependencyDays", V::Long(ctx.dependencies.oldest_dependency_days)),
            ("hasVulnerabilities", V::Bool(ctx.dependencies.has_vulnerabilities)),
            ("vulnerabilityCount", V::Long(ctx.dependencies.vulnerability_count)),
            ("branchProtectionEnabled", V::Bool(ctx.branch_protection.enabled)),
            ("requireReviews", V::Bool(ctx.branch_protection.require_reviews)),
            ("requireStatusChecks", V::Bool(ctx.branch_protection.require_status_checks)),
            (
                "branchProtectionEnforceAdmins",
                V::Bool(ctx.branch_protection.enforce_admins),
            ),
        ];

        Self {
            values: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AttributeValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// The Cedar request context: one entry per attribute.
    pub fn to_context(&self) -> Result<Context, String> {
        Context::from_pairs(
            self.iter()
                .map(|(name, value)| (name.to_string(), value.to_expression())),
        )
        .map_err(|e| e.to_string())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn remove(&mut self, name: &str) {
        self.values.remove(name);
    }
}

/// The attribute schema in Cedar schema syntax, used to validate policies
/// at registration.
pub fn cedar_schema() -> String {
    let actions = Action::ALL
        .iter()
        .map(|a| format!("\"{a}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let attributes: String = ATTRIBUTE_SCHEMA
        .iter()
        .map(|(name, ty)| format!("        {name}: {},\n", ty.cedar_type()))
        .collect();

    format!(
        "entity {PRINCIPAL_TYPE};\n\
         entity {RESOURCE_TYPE};\n\
         action {actions} appliesTo {{\n    \
             principal: {PRINCIPAL_TYPE},\n    \
             resource: {RESOURCE_TYPE},\n    \
             context: {{\n{attributes}    }}\n\
         }};\n"
    )
}
