use crate::{Error, Severity};

/// Decouples *classifying/constructing* an error (library concern) from
/// *emitting* it (application concern): core logic returns `Result<T>` and
/// never logs; a policy supplied at the boundary decides what happens to a
/// finished [`Error`].
pub trait ErrorPolicy {
    fn emit(&self, error: &Error);
}

/// Discards errors. Useful in tests that only care about the `Result`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPolicy;

impl ErrorPolicy for NoopPolicy {
    fn emit(&self, _error: &Error) {}
}

#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPolicy;

#[cfg(feature = "tracing")]
impl ErrorPolicy for TracingPolicy {
    fn emit(&self, error: &Error) {
        match error.severity() {
            Severity::Fatal => tracing::error!(%error, "fatal"),
            Severity::Error => tracing::error!(%error),
            Severity::Warning => tracing::warn!(%error),
        }
    }
}

/// Runs a list of policies in registration order. Lets an application wire
/// up tracing plus, say, a metrics sink without the core ever knowing.
#[derive(Default)]
pub struct CombinedPolicy {
    policies: Vec<Box<dyn ErrorPolicy>>,
}

impl CombinedPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, policy: impl ErrorPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }
}

impl ErrorPolicy for CombinedPolicy {
    fn emit(&self, error: &Error) {
        for policy in &self.policies {
            policy.emit(error);
        }
    }
}
