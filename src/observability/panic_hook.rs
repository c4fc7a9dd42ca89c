//! Custom panic hook for structured crash reports.
//!
//! On an unexpected panic, prints one line to STDERR naming the component
//! and the line number last processed, instead of a bare Rust backtrace,
//! before the process exits with the file-access exit code (spec §6: an
//! unrecoverable failure during comparison is an access-level failure,
//! not a data-classification outcome).

use super::context::current_context;

/// Install the panic hook. Call once, early in `main`.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let ctx = current_context();
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        eprintln!(
            "precdiff: internal error during {} (line {}): {message} [{location}]",
            ctx.phase,
            ctx.line.map(|l| l.to_string()).unwrap_or_else(|| "?".into()),
        );
        default_hook(info);
    }));
}
