//! Error types for admin-CLI interactions.

/// Errors raised while talking to the admin CLI.
///
/// These are discovery-level failures and are fatal to a run; per-slice
/// `repair` failures are reported through `CommandOutput` instead and
/// never surface here.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NodetoolError {
    /// A discovery command exited non-zero or could not be spawned.
    #[error("`{cmd}` failed: {stderr}")]
    CommandFailed { cmd: String, stderr: String },
    /// Command output did not match the expected shape.
    #[error("could not parse `{cmd}` output: {reason}")]
    Parse { cmd: String, reason: String },
}
