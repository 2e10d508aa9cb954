//! Event taxonomy and the audit report produced by `PatchKit::apply`.
//!
//! `ExecutionReport` is the sole output of `apply`: it is always returned,
//! never an error, and its `events` vector is the complete, ordered audit
//! trail for the run (spec §4.7, §7). Grounded on the teacher's
//! `ProofEvent`/`ProofRunSummary` pair in `core/proof.rs` — a serialize-only
//! event log plus a derived summary — generalized here from proof-run
//! results to patch-application results, with `success`/`duration_ms`
//! computed from the event list instead of stored redundantly.

use std::collections::BTreeMap;

use serde::Serialize;

/// The closed set of event codes a patch-application run can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventCode {
    ValidationFail,
    VerificationFail,
    IdempotentSkip,
    TxBegin,
    TxCommit,
    TxRollback,
    PrecheckStart,
    PrecheckOk,
    PrecheckFail,
    ActionStart,
    ActionOk,
    ActionFail,
    PostcheckStart,
    PostcheckOk,
    PostcheckFail,
    PatchSuccess,
    PatchFailure,
}

/// A single timestamped, structured entry in a patch's execution timeline.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionEvent {
    pub ts: i64,
    pub code: EventCode,
    pub message: String,
    pub detail: BTreeMap<String, String>,
}

impl ExecutionEvent {
    pub fn new(ts: i64, code: EventCode, message: impl Into<String>) -> Self {
        Self {
            ts,
            code,
            message: message.into(),
            detail: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }
}

/// The full outcome of one `PatchKit::apply` call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub patch_id: String,
    pub events: Vec<ExecutionEvent>,
    pub start_time: i64,
    pub end_time: i64,
    pub affected_rows: i32,
}

impl ExecutionReport {
    /// `end_time - start_time`, in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.end_time - self.start_time
    }

    /// True iff the timeline contains a `PatchSuccess` event and no
    /// `PatchFailure` event. The executor never emits both; the
    /// orchestrator can append a post-commit `PatchFailure` (ledger
    /// `record_application` failing after a successful run), which must
    /// flip the overall verdict even though `PatchSuccess` already fired.
    pub fn success(&self) -> bool {
        let mut has_success = false;
        let mut has_failure = false;
        for event in &self.events {
            match event.code {
                EventCode::PatchSuccess => has_success = true,
                EventCode::PatchFailure => has_failure = true,
                _ => {}
            }
        }
        has_success && !has_failure
    }
}

/// Human-readable line-per-event rendering of a report. A collaborator, not
/// part of the core: never called by `orchestrator::apply` itself. Grounded
/// on the teacher's `flight_recorder.rs`/`proof.rs` table-printing style.
pub fn render_text(report: &ExecutionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "patch {} — {} ({} ms, {} events, affected_rows={})\n",
        report.patch_id,
        if report.success() { "SUCCESS" } else { "FAILURE" },
        report.duration_ms(),
        report.events.len(),
        report.affected_rows,
    ));
    for event in &report.events {
        out.push_str(&format!(
            "  [{}] {:?}: {}",
            event.ts, event.code, event.message
        ));
        if !event.detail.is_empty() {
            out.push_str(&format!(" {:?}", event.detail));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(codes: &[EventCode]) -> ExecutionReport {
        ExecutionReport {
            patch_id: "p1".to_string(),
            events: codes
                .iter()
                .enumerate()
                .map(|(i, c)| ExecutionEvent::new(1_000 + i as i64, *c, "msg"))
                .collect(),
            start_time: 1_000,
            end_time: 1_050,
            affected_rows: 2,
        }
    }

    #[test]
    fn success_requires_patch_success_event() {
        let report = report_with(&[EventCode::TxBegin, EventCode::PatchSuccess]);
        assert!(report.success());

        let report = report_with(&[EventCode::TxBegin, EventCode::PatchFailure]);
        assert!(!report.success());
    }

    #[test]
    fn patch_failure_after_patch_success_flips_verdict() {
        let report = report_with(&[
            EventCode::TxBegin,
            EventCode::TxCommit,
            EventCode::PatchSuccess,
            EventCode::PatchFailure,
        ]);
        assert!(!report.success());
    }

    #[test]
    fn duration_ms_is_derived() {
        let report = report_with(&[EventCode::PatchSuccess]);
        assert_eq!(report.duration_ms(), 50);
    }

    #[test]
    fn render_text_includes_verdict_and_events() {
        let report = report_with(&[EventCode::PrecheckOk, EventCode::PatchSuccess]);
        let text = render_text(&report);
        assert!(text.contains("SUCCESS"));
        assert!(text.contains("PrecheckOk"));
    }
}
