//! Sub-range repair driver.
//!
//! Orchestrates small, recoverable repairs over a vnode ring:
//! - Immutable run configuration
//! - Exponential-backoff retry around the admin CLI
//! - A crash-consistent status journal with resume support
//! - Exclusion rules for slices and keyspaces
//! - The bounded-concurrency dispatcher itself

pub mod config;
pub mod driver;
pub mod exclude;
pub mod retry;
pub mod status;

pub use config::{ConfigError, RepairOptions};
pub use exclude::{check_excluded, Exclusion, ExclusionMatch, ExclusionParseError};
pub use retry::{ExponentialBackoffRetryer, RetryPolicy, Sleeper, TokioSleeper};
pub use status::{RepairRecord, SliceId, StatusDocument, StatusJournal, ALL};
