//! Observability infrastructure: structured tracing and crash context.
//!
//! Scoped down from the teacher's original observability module to the
//! state this program actually owns: which component (C1-C9) is running
//! and which line of which side is currently being processed.

pub mod context;
pub mod panic_hook;
pub mod tracing_init;

pub use context::{current_context, set_line, set_phase, AnalysisPhase, ContextGuard};
pub use panic_hook::install_panic_hook;
pub use tracing_init::init_tracing;
