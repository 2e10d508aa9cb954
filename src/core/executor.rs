//! The core state machine: preconditions → single write transaction →
//! postconditions, with per-action and total deadlines.
//!
//! No async runtime is used (the teacher crate and none of its SQLite
//! neighbors in the retrieval pack use async `rusqlite`). Timeouts are
//! enforced with `std::thread::scope` + a channel + `Engine::interrupt`:
//! the deadline-watcher thread calls `interrupt()` when a deadline elapses,
//! which — for the SQLite engine — aborts the in-flight statement
//! cooperatively via `rusqlite`'s interrupt handle (spec §5, §9
//! "Cooperative cancellation"). This is the synchronous analogue of the
//! `StorageBackend`-style operation dispatch the teacher's own
//! `core/pool.rs` doc comment sketches as a future direction.

use std::sync::mpsc;
use std::time::Duration;

use crate::core::action::{Condition, Patch};
use crate::core::clock::Clock;
use crate::core::engine::Engine;
use crate::core::error::PatchKitError;
use crate::core::report::{EventCode, ExecutionEvent, ExecutionReport};

/// Executor-level knobs. Distinct from `PatchKitConfig` because the
/// executor does not know about validators or the idempotency ledger —
/// those belong to the orchestrator.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub per_action_timeout: Duration,
    pub total_timeout: Duration,
    pub checks_in_read_tx: bool,
}

/// Run `patch` against `engine`, returning a complete audit report. Never
/// returns an error: every failure mode is folded into `report.events` and
/// `report.success() == false`.
#[tracing::instrument(skip_all, fields(patch_id = %patch.id, target = %patch.target))]
pub fn execute_patch(
    patch: &Patch,
    engine: &dyn Engine,
    clock: &dyn Clock,
    config: &ExecutorConfig,
) -> ExecutionReport {
    let start_time = clock.now_millis();
    let mut events: Vec<ExecutionEvent> = Vec::new();
    let mut total_rows: i32 = 0;

    let outcome = {
        let events_ref = &mut events;
        let rows_ref = &mut total_rows;
        with_timeout(engine, config.total_timeout, move || {
            run_phases(patch, engine, clock, config, events_ref, rows_ref)
        })
    };

    let affected_rows = match &outcome {
        Ok(()) => {
            tracing::debug!("patch applied successfully");
            events.push(ExecutionEvent::new(
                clock.now_millis(),
                EventCode::PatchSuccess,
                format!("patch {} applied successfully", patch.id),
            ));
            total_rows
        }
        Err(e) => {
            tracing::warn!(error = %e, "patch application failed");
            push_terminal_failure_if_needed(&mut events, clock, e);
            0
        }
    };

    ExecutionReport {
        patch_id: patch.id.clone(),
        events,
        start_time,
        end_time: clock.now_millis(),
        affected_rows,
    }
}

/// Append a generic `PATCH_FAILURE` event, unless the error already carries
/// its own terminal event (precondition/action failure: the specific
/// `PRECHECK_FAIL`/`ACTION_FAIL` event emitted at the point of detection is
/// itself the terminal event). Postcondition failure is the one case that
/// gets *both*: `POSTCHECK_FAIL` is emitted at detection time (the patch's
/// mutations are already committed by then), and `PATCH_FAILURE` is
/// appended here to mark the overall `apply` outcome as unsuccessful — the
/// postcheck is documented as an alarm, not a gate (spec §9), so its
/// failure must still surface a generic failure marker distinct from the
/// specific check that tripped it.
fn push_terminal_failure_if_needed(
    events: &mut Vec<ExecutionEvent>,
    clock: &dyn Clock,
    err: &PatchKitError,
) {
    let already_terminal = matches!(
        err,
        PatchKitError::PreconditionFailed(_) | PatchKitError::ActionFailed(_)
    );
    if already_terminal {
        return;
    }
    events.push(
        ExecutionEvent::new(clock.now_millis(), EventCode::PatchFailure, err.to_string())
            .with_detail("exception", err.exception_kind()),
    );
}

fn run_phases(
    patch: &Patch,
    engine: &dyn Engine,
    clock: &dyn Clock,
    config: &ExecutorConfig,
    events: &mut Vec<ExecutionEvent>,
    total_rows: &mut i32,
) -> Result<(), PatchKitError> {
    run_checks(
        &patch.preconditions,
        engine,
        clock,
        config,
        events,
        EventCode::PrecheckStart,
        EventCode::PrecheckOk,
        EventCode::PrecheckFail,
        PatchKitError::PreconditionFailed,
    )?;

    run_actions(patch, engine, clock, config, events, total_rows)?;

    run_checks(
        &patch.postconditions,
        engine,
        clock,
        config,
        events,
        EventCode::PostcheckStart,
        EventCode::PostcheckOk,
        EventCode::PostcheckFail,
        PatchKitError::PostconditionFailed,
    )?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_checks(
    conditions: &[Condition],
    engine: &dyn Engine,
    clock: &dyn Clock,
    config: &ExecutorConfig,
    events: &mut Vec<ExecutionEvent>,
    start_code: EventCode,
    ok_code: EventCode,
    fail_code: EventCode,
    to_error: fn(String) -> PatchKitError,
) -> Result<(), PatchKitError> {
    if conditions.is_empty() {
        return Ok(());
    }

    let run = || -> Result<(), PatchKitError> {
        events.push(ExecutionEvent::new(clock.now_millis(), start_code, "checks start"));
        for condition in conditions {
            let actual = engine.query_scalar(&condition.sql, &[])?.as_long();
            if condition.operator.apply(actual, condition.expected) {
                events.push(
                    ExecutionEvent::new(clock.now_millis(), ok_code, condition.label())
                        .with_detail("actual", actual.to_string())
                        .with_detail("expected", condition.expected.to_string()),
                );
            } else {
                events.push(
                    ExecutionEvent::new(
                        clock.now_millis(),
                        fail_code,
                        format!("check failed: {}", condition.label()),
                    )
                    .with_detail("actual", actual.to_string())
                    .with_detail("expected", condition.expected.to_string())
                    .with_detail("operator", condition.operator.as_str()),
                );
                return Err(to_error(condition.label()));
            }
        }
        Ok(())
    };

    if config.checks_in_read_tx {
        let result = std::cell::RefCell::new(Ok(()));
        engine.in_transaction(false, &mut |_e| {
            *result.borrow_mut() = run();
            Ok(())
        })?;
        result.into_inner()
    } else {
        run()
    }
}

fn run_actions(
    patch: &Patch,
    engine: &dyn Engine,
    clock: &dyn Clock,
    config: &ExecutorConfig,
    events: &mut Vec<ExecutionEvent>,
    total_rows: &mut i32,
) -> Result<(), PatchKitError> {
    let result = engine.in_transaction(true, &mut |e| {
        events.push(ExecutionEvent::new(clock.now_millis(), EventCode::TxBegin, "transaction begin"));
        for action in &patch.actions {
            let label = action.label();
            events.push(ExecutionEvent::new(clock.now_millis(), EventCode::ActionStart, label.clone()));

            let action_result = with_timeout(e, config.per_action_timeout, || {
                e.execute(action.sql(), action.parameters())
            });

            match action_result {
                Ok(rows) => {
                    *total_rows += rows;
                    events.push(
                        ExecutionEvent::new(clock.now_millis(), EventCode::ActionOk, label)
                            .with_detail("rows", rows.to_string()),
                    );
                }
                Err(err) => {
                    events.push(
                        ExecutionEvent::new(
                            clock.now_millis(),
                            EventCode::ActionFail,
                            format!("{label}: {err}"),
                        )
                        .with_detail("exception", err.exception_kind()),
                    );
                    return Err(PatchKitError::ActionFailed(label));
                }
            }
        }
        Ok(())
    });

    match result {
        Ok(()) => {
            events.push(ExecutionEvent::new(clock.now_millis(), EventCode::TxCommit, "transaction commit"));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Run `f` to completion or `timeout`, whichever comes first. On expiry,
/// calls `engine.interrupt()` to cooperatively abort the in-flight
/// statement, then waits for `f`'s thread to actually return before
/// reporting a `TimeoutExceeded` error — the crate never abandons a thread
/// still touching the shared connection.
fn with_timeout<T, F>(engine: &dyn Engine, timeout: Duration, f: F) -> Result<T, PatchKitError>
where
    F: FnOnce() -> Result<T, PatchKitError> + Send,
    T: Send,
{
    std::thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        scope.spawn(move || {
            let result = f();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => {
                engine.interrupt();
                let _ = rx.recv();
                Err(PatchKitError::TimeoutExceeded(format!(
                    "operation exceeded {timeout:?}"
                )))
            }
        }
    })
}
