//! Thread-local context tracking for crash reports.
//!
//! `precdiff` is single-threaded (spec §5), so a simple `Cell`/`RefCell`
//! pair is enough — no atomics, no cross-thread synchronization.

use std::cell::Cell;
use std::cell::RefCell;

/// Which component of the pipeline (C1-C9) is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Startup,
    StructureScan,
    ElementWalk,
    AccumulationFinalize,
    Reporting,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisPhase::Startup => "startup",
            AnalysisPhase::StructureScan => "structure-scan",
            AnalysisPhase::ElementWalk => "element-walk",
            AnalysisPhase::AccumulationFinalize => "accumulation-finalize",
            AnalysisPhase::Reporting => "reporting",
        };
        write!(f, "{s}")
    }
}

thread_local! {
    static PHASE: Cell<AnalysisPhase> = const { Cell::new(AnalysisPhase::Startup) };
    static LINE: RefCell<Option<u64>> = const { RefCell::new(None) };
}

/// Snapshot of the current context, for the panic hook to capture.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub phase: AnalysisPhase,
    pub line: Option<u64>,
}

pub fn current_context() -> AnalysisContext {
    AnalysisContext {
        phase: PHASE.with(|p| p.get()),
        line: LINE.with(|l| *l.borrow()),
    }
}

/// Guard that restores the previous phase on drop.
pub struct ContextGuard {
    previous: AnalysisPhase,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        PHASE.with(|p| p.set(self.previous));
    }
}

/// Set the current phase for the duration of the returned guard's scope.
#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    let previous = PHASE.with(|p| p.replace(phase));
    ContextGuard { previous }
}

/// Record the line currently being processed (no guard: overwritten every
/// element, not scoped).
pub fn set_line(line: u64) {
    LINE.with(|l| *l.borrow_mut() = Some(line));
}
