//! Where harness assertions go.
//!
//! The harness never decides pass/fail policy itself. It reports through an
//! [`AssertionSink`]; a test runner plugs in whatever turns a message into a failure.

/// Receives assertion failures.
pub trait AssertionSink: Send + Sync {
    /// Record a failure.
    fn fail(&self, message: &str);

    /// Record a failure unless `condition` holds.
    fn require(&self, condition: bool, message: &str) {
        if !condition {
            self.fail(message);
        }
    }
}

/// Fails the current test by panicking with the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicSink;

impl AssertionSink for PanicSink {
    fn fail(&self, message: &str) {
        panic!("{}", message);
    }
}

impl<S: AssertionSink + ?Sized> AssertionSink for &S {
    fn fail(&self, message: &str) {
        (**self).fail(message);
    }
}

impl<S: AssertionSink + ?Sized> AssertionSink for std::sync::Arc<S> {
    fn fail(&self, message: &str) {
        (**self).fail(message);
    }
}
