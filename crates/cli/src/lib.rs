//! Command-line front end for the sub-range repair driver.
//!
//! Provides:
//! - The argument surface and its conversion into `RepairOptions`
//! - Logging setup (stderr or file sink, `RUST_LOG` override)

pub mod config;
pub mod logging;

pub use config::RangeRepairCli;
pub use logging::init_logging;
