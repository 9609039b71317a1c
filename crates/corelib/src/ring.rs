//! Token-ring model for a single repair target.
//!
//! A `TokenRing` is an immutable snapshot of the cluster's token
//! placement, built once from admin-CLI output before a repair run and
//! shared read-only across workers:
//! - `ring_tokens`: every token owned by an Up/Down ring member (optionally
//!   restricted to one datacenter), sorted ascending
//! - `host_tokens`: the target node's own tokens, sorted ascending
//! - `local_nodes`: addresses in the local datacenter when a filter was
//!   requested (empty means every member counts as local)
//!
//! A node owns the range `(preceding_token, own_token]`, so repair ranges
//! are derived by pairing each host token with its ring predecessor.

use crate::error::{Error, Result};
use crate::partitioner::{Partitioner, TokenValue};
use crate::subrange::SubRanges;

/// Immutable view of ring and host token placement.
#[derive(Debug, Clone)]
pub struct TokenRing {
    ring_tokens: Vec<TokenValue>,
    host_tokens: Vec<TokenValue>,
    local_nodes: Vec<String>,
    partitioner: Partitioner,
}

impl TokenRing {
    /// Builds the ring model from discovered tokens.
    ///
    /// Both token lists are sorted here; the partitioner regime is
    /// detected from the smallest ring token (Murmur3 rings contain
    /// negative tokens, Random rings never do).
    pub fn new(
        mut ring_tokens: Vec<TokenValue>,
        mut host_tokens: Vec<TokenValue>,
        local_nodes: Vec<String>,
    ) -> Result<Self> {
        if ring_tokens.is_empty() {
            return Err(Error::EmptyRing);
        }
        ring_tokens.sort_unstable();
        host_tokens.sort_unstable();
        let partitioner = Partitioner::detect(ring_tokens[0]);
        Ok(TokenRing {
            ring_tokens,
            host_tokens,
            local_nodes,
            partitioner,
        })
    }

    pub fn partitioner(&self) -> Partitioner {
        self.partitioner
    }

    pub fn ring_tokens(&self) -> &[TokenValue] {
        &self.ring_tokens
    }

    pub fn host_tokens(&self) -> &[TokenValue] {
        &self.host_tokens
    }

    pub fn host_token_count(&self) -> usize {
        self.host_tokens.len()
    }

    pub fn local_nodes(&self) -> &[String] {
        &self.local_nodes
    }

    /// Renders a token in the ring's command-line format.
    pub fn format(&self, token: TokenValue) -> String {
        self.partitioner.format(token)
    }

    /// Returns the largest ring token strictly less than `token`.
    ///
    /// When `token` is the smallest ring token, the range wraps and the
    /// largest ring token overall is returned.
    pub fn preceding_token(&self, token: TokenValue) -> TokenValue {
        let idx = self.ring_tokens.partition_point(|&t| t < token);
        if idx == 0 {
            self.ring_tokens[self.ring_tokens.len() - 1]
        } else {
            self.ring_tokens[idx - 1]
        }
    }

    /// Splits `(start, stop]` into up to `steps` contiguous sub-ranges,
    /// rendered in this ring's token format.
    pub fn sub_ranges(&self, start: TokenValue, stop: TokenValue, steps: u32) -> SubRanges {
        SubRanges::new(self.partitioner, start, stop, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(tokens: &[i128]) -> TokenRing {
        TokenRing::new(tokens.to_vec(), tokens.to_vec(), Vec::new()).unwrap()
    }

    #[test]
    fn test_empty_ring_is_rejected() {
        assert!(matches!(
            TokenRing::new(Vec::new(), Vec::new(), Vec::new()),
            Err(Error::EmptyRing)
        ));
    }

    #[test]
    fn test_tokens_are_sorted_on_construction() {
        let r = TokenRing::new(vec![30, -10, 20], vec![20, -10], Vec::new()).unwrap();
        assert_eq!(r.ring_tokens(), &[-10, 20, 30]);
        assert_eq!(r.host_tokens(), &[-10, 20]);
    }

    #[test]
    fn test_partitioner_detection() {
        assert_eq!(ring(&[-5, 0, 5]).partitioner(), Partitioner::Murmur3);
        assert_eq!(ring(&[5, 10, 15]).partitioner(), Partitioner::Random);
    }

    #[test]
    fn test_preceding_token() {
        let r = ring(&[-100, 0, 100]);
        assert_eq!(r.preceding_token(100), 0);
        assert_eq!(r.preceding_token(0), -100);
        assert_eq!(r.preceding_token(50), 0);
    }

    #[test]
    fn test_preceding_token_wraps_for_smallest() {
        let r = ring(&[-100, 0, 100]);
        assert_eq!(r.preceding_token(-100), 100);
        assert_eq!(r.preceding_token(-200), 100);
    }
}
