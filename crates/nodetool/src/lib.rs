//! Admin-CLI collaborator for the repair driver.
//!
//! The database's node-control tool (`nodetool`) is the only transport
//! this system has: ring discovery, keyspace enumeration and the repairs
//! themselves all go through it as a child process. This crate provides:
//! - The child-process invoker and the `CommandRunner` seam
//! - Ring/host-token/datacenter discovery (`ring`, `info -T`, `gossipinfo`)
//! - Keyspace and table enumeration (`cfstats`)

pub mod discovery;
pub mod error;
pub mod invoker;
pub mod keyspaces;

pub use discovery::{discover_ring, DiscoveryConfig};
pub use error::NodetoolError;
pub use invoker::{CommandOutput, CommandRunner, SystemRunner};
pub use keyspaces::enumerate_keyspaces;
