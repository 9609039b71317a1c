//! Partitioner regimes and token formatting.
//!
//! Cassandra clusters run one of two partitioner families that matter here:
//! Murmur3 (signed 64-bit tokens) and Random (unsigned 127-bit tokens).
//! The regime decides the token range bounds and the zero-padded string
//! rendering used on `nodetool repair -st/-et` command lines.

/// Token value wide enough for both partitioner regimes.
///
/// Murmur3 tokens span `[-2^63, 2^63 - 1]`; Random tokens span
/// `[0, 2^127 - 1]`. `i128` covers both, and keeps subtraction exact for
/// the sub-range arithmetic.
pub type TokenValue = i128;

/// Partitioner regime governing token bounds and display format.
///
/// Detected from the first ring token: Murmur3 rings always contain
/// negative tokens once the cluster has a handful of vnodes, Random rings
/// never do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Partitioner {
    /// Murmur3 partitioner: signed 64-bit tokens.
    Murmur3,
    /// Random partitioner: unsigned 127-bit (MD5-derived) tokens.
    Random,
}

impl Partitioner {
    /// Picks the regime from the smallest token observed in the ring.
    pub fn detect(first_ring_token: TokenValue) -> Self {
        if first_ring_token < 0 {
            Partitioner::Murmur3
        } else {
            Partitioner::Random
        }
    }

    /// Smallest token value in this regime.
    pub fn range_min(&self) -> TokenValue {
        match self {
            Partitioner::Murmur3 => i64::MIN as i128,
            Partitioner::Random => 0,
        }
    }

    /// Largest token value in this regime.
    pub fn range_max(&self) -> TokenValue {
        match self {
            Partitioner::Murmur3 => i64::MAX as i128,
            Partitioner::Random => i128::MAX,
        }
    }

    /// Renders a token in the regime's zero-padded command-line format.
    ///
    /// Murmur3: signed decimal, width 21 including the sign.
    /// Random: unsigned decimal, width 39.
    pub fn format(&self, token: TokenValue) -> String {
        match self {
            Partitioner::Murmur3 => format!("{:+021}", token),
            Partitioner::Random => format!("{:039}", token),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Partitioner::Murmur3 => "Murmur3Partitioner",
            Partitioner::Random => "RandomPartitioner",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_murmur3_on_negative_first_token() {
        assert_eq!(Partitioner::detect(-1), Partitioner::Murmur3);
        assert_eq!(Partitioner::detect(i64::MIN as i128), Partitioner::Murmur3);
    }

    #[test]
    fn test_detect_random_on_non_negative_first_token() {
        assert_eq!(Partitioner::detect(0), Partitioner::Random);
        assert_eq!(Partitioner::detect(42), Partitioner::Random);
    }

    #[test]
    fn test_murmur3_format_is_signed_width_21() {
        let p = Partitioner::Murmur3;
        assert_eq!(p.format(-1), "-00000000000000000001");
        assert_eq!(p.format(1), "+00000000000000000001");
        assert_eq!(p.format(i64::MIN as i128), "-09223372036854775808");
        assert_eq!(p.format(i64::MAX as i128), "+09223372036854775807");
        assert_eq!(p.format(0).len(), 21);
    }

    #[test]
    fn test_random_format_is_unsigned_width_39() {
        let p = Partitioner::Random;
        assert_eq!(p.format(0).len(), 39);
        assert_eq!(p.format(1), "000000000000000000000000000000000000001");
        assert_eq!(p.format(i128::MAX).len(), 39);
    }

    #[test]
    fn test_range_bounds() {
        assert_eq!(Partitioner::Murmur3.range_min(), -(1i128 << 63));
        assert_eq!(Partitioner::Murmur3.range_max(), (1i128 << 63) - 1);
        assert_eq!(Partitioner::Random.range_min(), 0);
        assert_eq!(Partitioner::Random.range_max(), i128::MAX);
    }
}
