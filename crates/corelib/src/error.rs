//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The ring has no tokens, so ranges cannot be derived.
    #[error("ring has no tokens")]
    EmptyRing,
    /// A token string could not be parsed.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}
