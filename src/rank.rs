//! Small integer type shared by the engines for degree, rank and tree height.
//!
//! Fibonacci nodes store their degree, rank-pairing nodes their rank, and quake
//! tournament nodes their height. All three are bounded by O(log n): the
//! Fibonacci degree by `log_φ n`, rank-pairing ranks by `log_φ n`, and quake
//! heights by `log_{1/α} n` once the level invariant holds.
//!
//! # Why u8?
//!
//! `u8` can represent values 0-255, which supports heaps with far more
//! elements than could ever fit in memory, and keeps the per-node bookkeeping
//! next to the flag fields instead of forcing a word of padding.
//!
//! # Runtime Checks
//!
//! [`checked_increment`] panics if the theoretical limit is exceeded. That can
//! only happen if an engine invariant is broken, so it is treated as a bug,
//! not as a recoverable error.

/// Type alias for node degree, rank or height.
pub type Rank = u8;

/// Maximum valid rank value.
pub const MAX_RANK: Rank = u8::MAX;

/// Increments a rank value, panicking on overflow.
///
/// # Panics
///
/// Panics if `rank == MAX_RANK`.
///
/// # Example
///
/// ```rust
/// use meldable_heaps::rank::{checked_increment, Rank};
///
/// let rank: Rank = 5;
/// assert_eq!(checked_increment(rank), 6);
/// ```
#[inline]
pub fn checked_increment(rank: Rank) -> Rank {
    rank.checked_add(1)
        .expect("rank overflow: degree, rank and height are bounded by O(log n)")
}

/// Decrements a rank value, saturating at 0.
///
/// Used when a Fibonacci node loses a child; leaves legitimately reach 0.
///
/// ```rust
/// use meldable_heaps::rank::saturating_decrement;
///
/// assert_eq!(saturating_decrement(5), 4);
/// assert_eq!(saturating_decrement(0), 0);
/// ```
#[inline]
pub fn saturating_decrement(rank: Rank) -> Rank {
    rank.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_increment() {
        assert_eq!(checked_increment(0), 1);
        assert_eq!(checked_increment(127), 128);
        assert_eq!(checked_increment(254), 255);
    }

    #[test]
    #[should_panic(expected = "rank overflow")]
    fn test_checked_increment_overflow() {
        checked_increment(MAX_RANK);
    }

    #[test]
    fn test_saturating_decrement() {
        assert_eq!(saturating_decrement(5), 4);
        assert_eq!(saturating_decrement(1), 0);
        assert_eq!(saturating_decrement(0), 0);
    }

    #[test]
    fn test_rank_is_one_byte() {
        assert_eq!(std::mem::size_of::<Rank>(), 1);
    }
}
