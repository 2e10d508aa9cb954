//! Pure, stateless validation chain run before a patch ever touches a
//! database connection.
//!
//! Each `Validator` is a predicate over `(patch, raw_bytes)`; the chain
//! (`ValidatorChain`) runs them in a fixed order and short-circuits on the
//! first failure. Structure is grounded on the teacher's `core/validate.rs`
//! gate functions (`validate_no_legacy_namespaces`, etc. — each a pure
//! check run in sequence by a driver), generalized here into trait objects
//! so the chain is runtime-extensible per spec §4.3.

use sha2::{Digest, Sha256};

use crate::core::action::Patch;

/// The closed set of reasons a validator can reject a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    SizeExceeded,
    TooManyActions,
    MultiStatement,
    HashMissingBytes,
    HashMismatch,
    DdlNotAllowed,
}

/// The outcome of running one validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Success,
    Failure { code: ValidationCode, message: String },
}

impl ValidationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success)
    }

    fn failure(code: ValidationCode, message: impl Into<String>) -> Self {
        ValidationResult::Failure {
            code,
            message: message.into(),
        }
    }
}

/// A single validation predicate over a patch and its raw bytes.
pub trait Validator: Send + Sync {
    fn validate(&self, patch: &Patch, raw_bytes: Option<&[u8]>) -> ValidationResult;
}

/// Rejects patches whose serialized size or action count exceeds configured
/// limits.
pub struct SizeValidator {
    pub max_bytes: usize,
    pub max_actions: usize,
}

impl Validator for SizeValidator {
    fn validate(&self, patch: &Patch, raw_bytes: Option<&[u8]>) -> ValidationResult {
        if let Some(bytes) = raw_bytes {
            if bytes.len() > self.max_bytes {
                return ValidationResult::failure(
                    ValidationCode::SizeExceeded,
                    format!(
                        "patch is {} bytes, exceeds max_bytes={}",
                        bytes.len(),
                        self.max_bytes
                    ),
                );
            }
        }
        if patch.actions.len() > self.max_actions {
            return ValidationResult::failure(
                ValidationCode::TooManyActions,
                format!(
                    "patch has {} actions, exceeds max_actions={}",
                    patch.actions.len(),
                    self.max_actions
                ),
            );
        }
        ValidationResult::Success
    }
}

/// Rejects any action whose SQL contains more than one top-level statement.
/// A lightweight scanner, not a full SQL tokenizer: it tracks single- and
/// double-quoted strings and backslash escapes, but does not understand SQL
/// comments (`--`, `/* */`) — a semicolon inside a comment is still treated
/// as a statement separator. A single trailing `;` (after trimming
/// whitespace from the end) is permitted.
pub struct MultiStatementValidator;

impl MultiStatementValidator {
    fn has_multiple_statements(sql: &str) -> bool {
        let trimmed = sql.trim_end();
        let mut in_single_quote = false;
        let mut in_double_quote = false;
        let mut escaped = false;
        let mut top_level_semicolons = Vec::new();

        for (i, ch) in trimmed.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '\'' if !in_double_quote => in_single_quote = !in_single_quote,
                '"' if !in_single_quote => in_double_quote = !in_double_quote,
                ';' if !in_single_quote && !in_double_quote => top_level_semicolons.push(i),
                _ => {}
            }
        }

        match top_level_semicolons.len() {
            0 => false,
            1 => top_level_semicolons[0] != trimmed.len() - 1,
            _ => true,
        }
    }
}

impl Validator for MultiStatementValidator {
    fn validate(&self, patch: &Patch, _raw_bytes: Option<&[u8]>) -> ValidationResult {
        for action in &patch.actions {
            if Self::has_multiple_statements(action.sql()) {
                return ValidationResult::failure(
                    ValidationCode::MultiStatement,
                    format!("action contains more than one top-level statement: {}", action.sql()),
                );
            }
        }
        ValidationResult::Success
    }
}

/// Verifies `metadata["sha256"]` against the SHA-256 of the raw patch bytes,
/// when present. Absence of the key is not a failure.
pub struct HashValidator;

impl Validator for HashValidator {
    fn validate(&self, patch: &Patch, raw_bytes: Option<&[u8]>) -> ValidationResult {
        let Some(expected_hex) = patch.metadata.get("sha256") else {
            return ValidationResult::Success;
        };

        let Some(bytes) = raw_bytes else {
            return ValidationResult::failure(
                ValidationCode::HashMissingBytes,
                "metadata.sha256 set but raw bytes unavailable to verify against".to_string(),
            );
        };

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let actual_hex = format!("{:x}", hasher.finalize());

        if actual_hex.eq_ignore_ascii_case(expected_hex) {
            ValidationResult::Success
        } else {
            ValidationResult::failure(
                ValidationCode::HashMismatch,
                format!("sha256 mismatch: expected {expected_hex}, computed {actual_hex}"),
            )
        }
    }
}

/// Rejects DDL statements (`CREATE`/`DROP`/`ALTER`/`TRUNCATE`) unless
/// disabled (i.e. DDL is allowed by configuration).
pub struct DmlOnlyValidator {
    pub allow_ddl: bool,
}

const DDL_PREFIXES: &[&str] = &["CREATE", "DROP", "ALTER", "TRUNCATE"];

impl Validator for DmlOnlyValidator {
    fn validate(&self, patch: &Patch, _raw_bytes: Option<&[u8]>) -> ValidationResult {
        if self.allow_ddl {
            return ValidationResult::Success;
        }
        for action in &patch.actions {
            let upper = action.sql().trim_start().to_uppercase();
            if DDL_PREFIXES.iter().any(|p| upper.starts_with(p)) {
                return ValidationResult::failure(
                    ValidationCode::DdlNotAllowed,
                    format!("DDL statement not allowed: {}", action.sql()),
                );
            }
        }
        ValidationResult::Success
    }
}

/// An ordered, short-circuiting list of validators.
pub struct ValidatorChain {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorChain {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// Run every validator in order, returning the first failure or
    /// `ValidationResult::Success` if all pass.
    pub fn validate(&self, patch: &Patch, raw_bytes: Option<&[u8]>) -> ValidationResult {
        for validator in &self.validators {
            let result = validator.validate(patch, raw_bytes);
            if !result.is_success() {
                return result;
            }
        }
        ValidationResult::Success
    }
}
