//! Logger capability injected into each [`EventState`](crate::EventState).

/// Sink for the tracker's diagnostics.
///
/// Implementations must not panic: `warn` is called from inside `add` and
/// `remove`, so a panic would unwind through them.
pub trait EventLogger: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing`, tagged with the subscription they belong to.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    subscription: String,
}

impl TracingLogger {
    pub fn new(subscription: impl Into<String>) -> Self {
        Self {
            subscription: subscription.into(),
        }
    }
}

impl EventLogger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(subscription = %self.subscription, "{message}");
    }
}
