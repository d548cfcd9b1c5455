/// Coarse, programmatic severity classification for an [`crate::Error`].
///
/// Used by application code to decide whether to keep running a pass
/// (`Warning`), stop the driver at the next step boundary (`Error`), or
/// abort immediately (`Fatal`) — see `spec.md §7`, "Propagation policy".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}
