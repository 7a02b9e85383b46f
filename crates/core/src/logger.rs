//! Logging abstraction.
//!
//! Provides a [`Logger`] trait so deployments can route log output through
//! their own infrastructure, plus a default [`TracingLogger`] that delegates
//! to the [`tracing`] crate.

use std::fmt;
use std::sync::Arc;

/// Logging trait consumed by the request pipeline and plugins.
///
/// Collaborator failures (email, media store) are reported through
/// [`Logger::warn`] rather than propagated as errors.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Logger")
    }
}

/// Default logger delegating to the `tracing` crate.
#[derive(Debug, Clone)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}

/// Create the default logger instance.
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}
