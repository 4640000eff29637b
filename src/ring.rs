//! # Identifier Space
//!
//! Chord places every peer and every lookup key on a modular ring of size
//! 2^32. All arithmetic in the simulator goes through the free functions in
//! this module so that comparisons near the wraparound point behave the same
//! way everywhere.
//!
//! | Function | Meaning |
//! |----------|---------|
//! | [`add`] | `(a + b) mod 2^32` |
//! | [`sub`] | `(a - b) mod 2^32` |
//! | [`wrapped_distance`] | clockwise distance from `x` to `target` |
//! | [`in_interval`] | membership in the half-open arc `(a, b]` |
//!
//! Identifiers are plain values. Peers expose their identifier and never take
//! part in arithmetic themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of bits in the identifier space. Also the finger table length.
pub const RING_BITS: u32 = 32;

/// Number of distinct identifiers on the ring.
pub const RING_SIZE: u64 = 1 << RING_BITS;

/// A position on the identifier ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(u32);

impl Identifier {
    pub const MIN: Identifier = Identifier(0);
    pub const MAX: Identifier = Identifier(u32::MAX);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Big-endian hex rendering used in logs and reports.
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }

    /// Absolute numeric difference, ignoring ring direction.
    #[inline]
    pub fn abs_diff(self, other: Identifier) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// Parse a decimal or `0x`-prefixed hex identifier.
    ///
    /// Values outside `[0, 2^32)` are rejected rather than reduced.
    pub fn parse(s: &str) -> Result<Self, RingError> {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(digits) => u64::from_str_radix(digits, 16),
            None => trimmed.parse::<u64>(),
        };
        match parsed {
            Ok(value) => Self::try_from(value),
            Err(_) => Err(RingError::InvalidOperand(trimmed.to_string())),
        }
    }
}

impl From<u32> for Identifier {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl TryFrom<u64> for Identifier {
    type Error = RingError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| RingError::InvalidOperand(value.to_string()))
    }
}

impl FromStr for Identifier {
    type Err = RingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error raised when a value cannot be used as a ring operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    /// The operand is not an identifier in `[0, 2^32)`.
    InvalidOperand(String),
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOperand(value) => write!(
                f,
                "invalid ring operand `{}`: expected an identifier in [0, {})",
                value, RING_SIZE
            ),
        }
    }
}

impl std::error::Error for RingError {}

/// `(a + b) mod 2^32`.
#[inline]
pub fn add(a: Identifier, b: Identifier) -> Identifier {
    Identifier(a.0.wrapping_add(b.0))
}

/// `(a - b) mod 2^32`.
#[inline]
pub fn sub(a: Identifier, b: Identifier) -> Identifier {
    Identifier(a.0.wrapping_sub(b.0))
}

/// Clockwise distance from `x` to `target`, i.e. `(target - x) mod 2^32`.
#[inline]
pub fn wrapped_distance(x: Identifier, target: Identifier) -> u32 {
    target.0.wrapping_sub(x.0)
}

/// `2^i` as an identifier offset. `i` must be below [`RING_BITS`].
#[inline]
pub fn finger_offset(i: usize) -> Identifier {
    debug_assert!(i < RING_BITS as usize);
    Identifier(1u32 << i)
}

/// Whether `query` lies on the clockwise arc `(a, b]`.
///
/// An arc with `a == b` is treated as empty.
#[inline]
pub fn in_interval(query: Identifier, a: Identifier, b: Identifier) -> bool {
    wrapped_distance(query, b) < wrapped_distance(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(raw: u32) -> Identifier {
        Identifier::new(raw)
    }

    #[test]
    fn add_wraps_past_ring_end() {
        assert_eq!(add(id(u32::MAX), id(1)), id(0));
        assert_eq!(add(id(u32::MAX - 5), id(10)), id(4));
    }

    #[test]
    fn sub_wraps_below_zero() {
        assert_eq!(sub(id(0), id(1)), id(u32::MAX));
        assert_eq!(sub(id(3), id(10)), id(u32::MAX - 6));
    }

    #[test]
    fn wrapped_distance_is_directional() {
        assert_eq!(wrapped_distance(id(10), id(15)), 5);
        assert_eq!(wrapped_distance(id(15), id(10)), u32::MAX - 4);
        assert_eq!(wrapped_distance(id(u32::MAX), id(2)), 3);
        assert_eq!(wrapped_distance(id(7), id(7)), 0);
    }

    #[test]
    fn finger_offsets_are_powers_of_two() {
        assert_eq!(finger_offset(0), id(1));
        assert_eq!(finger_offset(10), id(1024));
        assert_eq!(finger_offset(31), id(1 << 31));
    }

    #[test]
    fn interval_membership_across_wraparound() {
        assert!(in_interval(id(5), id(u32::MAX - 10), id(20)));
        assert!(in_interval(id(20), id(u32::MAX - 10), id(20)));
        assert!(!in_interval(id(u32::MAX - 10), id(u32::MAX - 10), id(20)));
        assert!(!in_interval(id(21), id(u32::MAX - 10), id(20)));
        assert!(!in_interval(id(3), id(3), id(3)));
    }

    #[test]
    fn out_of_range_operands_are_rejected() {
        assert_eq!(
            Identifier::try_from(RING_SIZE),
            Err(RingError::InvalidOperand(RING_SIZE.to_string()))
        );
        assert!(Identifier::parse("peer-7").is_err());
        assert!(Identifier::parse("0x1_0000_0000").is_err());
        assert!("4294967296".parse::<Identifier>().is_err());
    }

    #[test]
    fn parse_accepts_decimal_and_hex() {
        assert_eq!(Identifier::parse("4294967295").unwrap(), Identifier::MAX);
        assert_eq!(Identifier::parse("0xff").unwrap(), id(255));
        assert_eq!(Identifier::parse(" 42 ").unwrap(), id(42));
    }

    #[test]
    fn hex_rendering_is_zero_padded() {
        assert_eq!(id(0xab).to_hex(), "000000ab");
        assert_eq!(id(0xdead_beef).to_string(), "deadbeef");
        assert_eq!(format!("{}", id(0x1234)), id(0x1234).to_hex());
    }

    proptest! {
        #[test]
        fn sub_undoes_add(a in any::<u32>(), b in any::<u32>()) {
            prop_assert_eq!(sub(add(id(a), id(b)), id(b)), id(a));
        }

        #[test]
        fn distance_to_offset_point_is_the_offset(x in any::<u32>(), d in any::<u32>()) {
            prop_assert_eq!(wrapped_distance(id(x), add(id(x), id(d))), d);
        }

        #[test]
        fn forward_and_backward_distances_cover_the_ring(a in any::<u32>(), b in any::<u32>()) {
            prop_assume!(a != b);
            let forward = u64::from(wrapped_distance(id(a), id(b)));
            let backward = u64::from(wrapped_distance(id(b), id(a)));
            prop_assert_eq!(forward + backward, RING_SIZE);
        }
    }
}
