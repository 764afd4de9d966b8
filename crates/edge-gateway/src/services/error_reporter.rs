//! Reporting seam for unexpected gateway failures.
//!
//! Verification and propagation collapse unexpected library errors to a
//! generic internal response; before they do, the underlying error goes
//! through the process-wide reporter so it is never silently swallowed.

use std::error::Error;

/// Sink for errors that indicate a gateway bug rather than bad input.
pub trait ErrorReporter: Send + Sync {
    /// Report an unexpected error.
    fn report(&self, error: &(dyn Error + 'static));
}

/// Reporter that writes to the structured log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &(dyn Error + 'static)) {
        match error.source() {
            Some(source) => {
                tracing::error!(target: "gw.report", error = %error, source = %source, "Unexpected gateway error");
            }
            None => {
                tracing::error!(target: "gw.report", error = %error, "Unexpected gateway error");
            }
        }
    }
}
