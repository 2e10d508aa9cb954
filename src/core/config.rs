//! Runtime configuration for `PatchKit`.
//!
//! A plain struct with a hand-written `Default`, grounded on the teacher's
//! `ProofConfig` pattern — the difference being that `PatchKitConfig` is
//! constructed in-process by the embedder rather than read from a TOML
//! file, so it is not itself `Deserialize`: the spec gives ownership of
//! these knobs to the host application, not to a config file on disk.

use std::sync::Arc;
use std::time::Duration;

use crate::core::ledger::Ledger;

/// The six-plus-one tunables from spec §6, in one place.
#[derive(Clone)]
pub struct PatchKitConfig {
    /// Reject any action whose SQL starts (after left-trim, case-insensitive)
    /// with `CREATE`, `DROP`, `ALTER`, or `TRUNCATE`, unless this is `true`.
    pub allow_ddl: bool,
    /// Maximum accepted size of the raw patch bytes.
    pub max_bytes: usize,
    /// Maximum accepted number of actions in a patch.
    pub max_actions: usize,
    /// Per-action execution deadline.
    pub per_action_timeout: Duration,
    /// Deadline for the whole precheck → write-tx → postcheck run.
    pub total_timeout: Duration,
    /// Enable the content-hash validator (`metadata.sha256`).
    pub verify_hash: bool,
    /// Wrap pre/postcheck phases in a read transaction for a
    /// snapshot-consistent view.
    pub checks_in_read_tx: bool,
    /// Idempotency ledger to gate/record applications. `None` disables
    /// idempotency tracking entirely (every `apply` re-runs the patch).
    pub idempotency: Option<Arc<dyn Ledger>>,
}

impl std::fmt::Debug for PatchKitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchKitConfig")
            .field("allow_ddl", &self.allow_ddl)
            .field("max_bytes", &self.max_bytes)
            .field("max_actions", &self.max_actions)
            .field("per_action_timeout", &self.per_action_timeout)
            .field("total_timeout", &self.total_timeout)
            .field("verify_hash", &self.verify_hash)
            .field("checks_in_read_tx", &self.checks_in_read_tx)
            .field("idempotency", &self.idempotency.is_some())
            .finish()
    }
}

impl Default for PatchKitConfig {
    fn default() -> Self {
        Self {
            allow_ddl: false,
            max_bytes: 512_000,
            max_actions: 200,
            per_action_timeout: Duration::from_millis(10_000),
            total_timeout: Duration::from_millis(60_000),
            verify_hash: true,
            checks_in_read_tx: false,
            idempotency: Some(Arc::new(crate::core::ledger::SqliteLedger::new(Box::new(
                crate::core::clock::SystemClock,
            )))),
        }
    }
}
