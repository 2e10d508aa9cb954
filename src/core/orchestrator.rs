//! `PatchKit`: the end-to-end `apply` lifecycle (parse → validate →
//! idempotency gate → execute → record), per spec §4.6.
//!
//! Nothing escapes `apply` as an unhandled error — every failure mode
//! (parse, validation, unknown target, ledger, executor) is folded into an
//! `ExecutionReport` with a terminal event, exactly per spec §7's
//! propagation policy.

use crate::core::action::Patch;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::PatchKitConfig;
use crate::core::engine::EngineRegistry;
use crate::core::error::PatchKitError;
use crate::core::executor::{execute_patch, ExecutorConfig};
use crate::core::report::{EventCode, ExecutionEvent, ExecutionReport};
use crate::core::validate::{
    DmlOnlyValidator, HashValidator, MultiStatementValidator, SizeValidator, Validator,
    ValidationResult, ValidatorChain,
};

/// The embeddable patch-application engine: a target registry plus policy.
pub struct PatchKit {
    registry: EngineRegistry,
    config: PatchKitConfig,
    clock: Box<dyn Clock>,
}

impl PatchKit {
    pub fn new(registry: EngineRegistry, config: PatchKitConfig) -> Self {
        Self {
            registry,
            config,
            clock: Box::new(SystemClock),
        }
    }

    /// Swap in a test double for the timestamp source. Intended for tests
    /// that want deterministic `start_time`/`end_time`/event ordering.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Parse, validate, gate, execute, and report on one patch. Never
    /// panics and never returns an `Err`: every outcome is a report.
    pub fn apply(&self, raw_bytes: &[u8]) -> ExecutionReport {
        let start_time = self.clock.now_millis();

        let patch = match Patch::parse(raw_bytes) {
            Ok(patch) => patch,
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse patch");
                return self.failure_report("unknown", start_time, &err);
            }
        };

        let chain = self.build_validator_chain();
        if let ValidationResult::Failure { code, message } = chain.validate(&patch, Some(raw_bytes)) {
            tracing::warn!(patch_id = %patch.id, ?code, "patch rejected by validator chain");
            return ExecutionReport {
                patch_id: patch.id.clone(),
                events: vec![ExecutionEvent::new(
                    self.clock.now_millis(),
                    EventCode::ValidationFail,
                    message,
                )
                .with_detail("code", format!("{code:?}"))],
                start_time,
                end_time: self.clock.now_millis(),
                affected_rows: 0,
            };
        }

        match self.apply_to_engine(&patch, start_time) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(patch_id = %patch.id, error = %err, "patch application failed");
                self.failure_report(&patch.id, start_time, &err)
            }
        }
    }

    #[tracing::instrument(skip(self, patch))]
    fn apply_to_engine(
        &self,
        patch: &Patch,
        start_time: i64,
    ) -> Result<ExecutionReport, PatchKitError> {
        let engine = self.registry.resolve(&patch.target)?;

        if let Some(ledger) = &self.config.idempotency {
            ledger.initialize(engine.as_ref())?;
            if ledger.has_been_applied(&patch.id, engine.as_ref())? {
                tracing::debug!(patch_id = %patch.id, "patch already applied, skipping");
                return Ok(ExecutionReport {
                    patch_id: patch.id.clone(),
                    events: vec![ExecutionEvent::new(
                        self.clock.now_millis(),
                        EventCode::IdempotentSkip,
                        format!("patch {} already applied", patch.id),
                    )],
                    start_time,
                    end_time: self.clock.now_millis(),
                    affected_rows: 0,
                });
            }
        }

        let executor_config = ExecutorConfig {
            per_action_timeout: self.config.per_action_timeout,
            total_timeout: self.config.total_timeout,
            checks_in_read_tx: self.config.checks_in_read_tx,
        };
        let mut report = execute_patch(patch, engine.as_ref(), self.clock.as_ref(), &executor_config);

        if report.success() {
            if let Some(ledger) = &self.config.idempotency {
                if let Err(err) =
                    ledger.record_application(&patch.id, engine.as_ref(), &patch.metadata_string())
                {
                    tracing::error!(patch_id = %patch.id, error = %err, "ledger record_application failed after commit");
                    report.events.push(
                        ExecutionEvent::new(
                            self.clock.now_millis(),
                            EventCode::PatchFailure,
                            err.to_string(),
                        )
                        .with_detail("exception", err.exception_kind()),
                    );
                }
            }
        }

        Ok(report)
    }

    fn build_validator_chain(&self) -> ValidatorChain {
        let mut validators: Vec<Box<dyn Validator>> = vec![
            Box::new(SizeValidator {
                max_bytes: self.config.max_bytes,
                max_actions: self.config.max_actions,
            }),
            Box::new(MultiStatementValidator),
        ];
        if self.config.verify_hash {
            validators.push(Box::new(HashValidator));
        }
        validators.push(Box::new(DmlOnlyValidator {
            allow_ddl: self.config.allow_ddl,
        }));
        ValidatorChain::new(validators)
    }

    fn failure_report(&self, patch_id: &str, start_time: i64, err: &PatchKitError) -> ExecutionReport {
        ExecutionReport {
            patch_id: patch_id.to_string(),
            events: vec![ExecutionEvent::new(
                self.clock.now_millis(),
                EventCode::PatchFailure,
                err.to_string(),
            )
            .with_detail("exception", err.exception_kind())],
            start_time,
            end_time: self.clock.now_millis(),
            affected_rows: 0,
        }
    }
}
