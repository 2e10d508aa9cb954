//! The patch document model: actions, conditions, and the `Patch` envelope.
//!
//! `Patch` is parsed once per `PatchKit::apply` call and discarded after
//! reporting (per spec: "Patch is parsed per invocation and discarded after
//! reporting"). Every wire struct/enum here uses `deny_unknown_fields` so
//! strict parsing is enforced by `serde` itself rather than a hand-rolled
//! validator, and every field has an explicit default so `Patch::parse`
//! never silently drops caller intent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::PatchKitError;
use crate::core::value::SqlArg;

/// One SQL statement executed inside the write transaction, raw or
/// parameterized. Tagged on `type` for wire compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum Action {
    SqlAction {
        sql: String,
        #[serde(default)]
        description: Option<String>,
    },
    ParameterizedSqlAction {
        sql: String,
        #[serde(default)]
        parameters: Vec<SqlArg>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl Action {
    pub fn sql(&self) -> &str {
        match self {
            Action::SqlAction { sql, .. } => sql,
            Action::ParameterizedSqlAction { sql, .. } => sql,
        }
    }

    pub fn parameters(&self) -> &[SqlArg] {
        match self {
            Action::SqlAction { .. } => &[],
            Action::ParameterizedSqlAction { parameters, .. } => parameters,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Action::SqlAction { description, .. } => description.as_deref(),
            Action::ParameterizedSqlAction { description, .. } => description.as_deref(),
        }
    }

    /// `description` if present, else the first 50 characters of `sql`, per
    /// the executor's event-labeling rule.
    pub fn label(&self) -> String {
        match self.description() {
            Some(d) => d.to_string(),
            None => self.sql().chars().take(50).collect(),
        }
    }
}

/// Comparison operator used by `Condition`. `EQUALS` is the default per
/// spec, applied when a condition's `operator` field is omitted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl ComparisonOperator {
    pub fn apply(self, actual: i64, expected: i64) -> bool {
        match self {
            ComparisonOperator::Equals => actual == expected,
            ComparisonOperator::NotEquals => actual != expected,
            ComparisonOperator::GreaterThan => actual > expected,
            ComparisonOperator::GreaterOrEqual => actual >= expected,
            ComparisonOperator::LessThan => actual < expected,
            ComparisonOperator::LessOrEqual => actual <= expected,
        }
    }

    /// Stable wire-style name for event `detail["operator"]`.
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "EQUALS",
            ComparisonOperator::NotEquals => "NOT_EQUALS",
            ComparisonOperator::GreaterThan => "GREATER_THAN",
            ComparisonOperator::GreaterOrEqual => "GREATER_OR_EQUAL",
            ComparisonOperator::LessThan => "LESS_THAN",
            ComparisonOperator::LessOrEqual => "LESS_OR_EQUAL",
        }
    }
}

/// A single-column, single-row numeric guard query, run before (precondition)
/// or after-commit (postcondition) the action phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub sql: String,
    #[serde(default)]
    pub operator: ComparisonOperator,
    pub expected: i64,
    #[serde(default)]
    pub description: Option<String>,
}

impl Condition {
    pub fn label(&self) -> String {
        match &self.description {
            Some(d) => d.clone(),
            None => self.sql.chars().take(50).collect(),
        }
    }
}

/// A versioned, JSON-encoded bundle of preconditions, SQL actions, and
/// postconditions with a stable id. The unit of work applied by `PatchKit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Patch {
    pub version: i32,
    pub id: String,
    pub target: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preconditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub postconditions: Vec<Condition>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Patch {
    /// Parse and validate a `Patch` from raw UTF-8 JSON bytes. Enforces the
    /// constructor guards (`version == 1`, non-blank `id`/`target`) in
    /// addition to `serde`'s strict-unknown-key parsing.
    pub fn parse(raw_bytes: &[u8]) -> Result<Patch, PatchKitError> {
        let patch: Patch = serde_json::from_slice(raw_bytes).map_err(|e| {
            PatchKitError::Parse(format!("invalid patch JSON: {e}"))
        })?;

        if patch.version != 1 {
            return Err(PatchKitError::Parse(format!(
                "unsupported patch version: {}",
                patch.version
            )));
        }
        if patch.id.trim().is_empty() {
            return Err(PatchKitError::Parse("patch id must not be blank".to_string()));
        }
        if patch.target.trim().is_empty() {
            return Err(PatchKitError::Parse(
                "patch target must not be blank".to_string(),
            ));
        }

        Ok(patch)
    }

    /// String form of `metadata`, passed to `Ledger::record_application`.
    /// `BTreeMap`'s ordering makes this deterministic across runs.
    pub fn metadata_string(&self) -> String {
        format!("{:?}", self.metadata)
    }
}
