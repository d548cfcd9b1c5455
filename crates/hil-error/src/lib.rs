#![doc = r#"
hil-error — workspace-wide error types, severity, and policy-driven emission.

One `Error` enum shared by every other crate, a `Severity` for coarse
programmatic handling, and an `ErrorPolicy` trait so library code never
has to decide how (or whether) to log.
"#]

pub mod domain;
pub mod fatal;
pub mod internal;
pub mod policy;
pub mod severity;
pub mod warning;

pub use domain::DomainError;
pub use fatal::FatalError;
pub use internal::InternalError;
pub use policy::{CombinedPolicy, ErrorPolicy, NoopPolicy};
#[cfg(feature = "tracing")]
pub use policy::TracingPolicy;
pub use severity::Severity;
pub use warning::WarningError;

/// Workspace-wide result alias. Library code should return this and let the
/// caller choose an [`ErrorPolicy`] at the boundary.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type shared by `hil-ast` and any binary built on top of
/// it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Warning(#[from] WarningError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl Error {
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::Warning(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }

    /// Coarse severity classification; see `spec.md §7`, "Propagation
    /// policy".
    pub fn severity(&self) -> Severity {
        match self {
            Error::Warning(_) => Severity::Warning,
            Error::Fatal(_) => Severity::Fatal,
            Error::Internal(_) | Error::Domain(_) => Severity::Error,
        }
    }
}
