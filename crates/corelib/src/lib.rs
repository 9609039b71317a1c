//! Core library for sub-range repair planning.
//!
//! This crate provides the pure, I/O-free pieces of the repair driver:
//! - Partitioner regimes and token formatting
//! - The immutable token-ring model
//! - Preceding-token lookup and sub-range generation

pub mod error;
pub mod partitioner;
pub mod ring;
pub mod subrange;

pub use error::{Error, Result};
pub use partitioner::{Partitioner, TokenValue};
pub use ring::TokenRing;
pub use subrange::{SubRange, SubRanges};
