//! Tuning for the quake heap's level invariant
//!
//! The quake heap keeps, after every extraction, `count[l + 1] <= α · count[l]`
//! for every height `l`, where `count[l]` is the number of tournament nodes at
//! height `l`. When an extraction leaves some level above that ratio, a
//! seismic rebuild discards every node above the lowest violating level.
//!
//! A rebuild at level `l` relinks the level-`l` roots pairwise, so each level
//! above ends up at most half the size of the one below it. That restores the
//! invariant only when `α >= 1/2`, and `α = 1` would never trigger a rebuild,
//! hence the accepted range `[0.5, 1)`.

use thiserror::Error;

/// Error type for invalid configuration values
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// α outside `[0.5, 1)`, or not a number
    #[error("quake ratio {0} must lie in [0.5, 1)")]
    AlphaOutOfRange(f64),
}

/// Configuration for [`QuakeHeap`](crate::quake::QuakeHeap)
///
/// # Example
///
/// ```rust
/// use meldable_heaps::config::QuakeConfig;
///
/// let config = QuakeConfig::new(0.6).unwrap();
/// assert_eq!(config.alpha(), 0.6);
/// assert!(QuakeConfig::new(0.25).is_err());
/// assert_eq!(QuakeConfig::default().alpha(), 0.75);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuakeConfig {
    alpha: f64,
}

impl QuakeConfig {
    /// The ratio used by [`QuakeConfig::default`]
    pub const DEFAULT_ALPHA: f64 = 0.75;

    /// Creates a configuration with the given level ratio
    ///
    /// # Errors
    /// [`ConfigError::AlphaOutOfRange`] unless `0.5 <= alpha < 1`.
    pub fn new(alpha: f64) -> Result<Self, ConfigError> {
        if (0.5..1.0).contains(&alpha) {
            Ok(Self { alpha })
        } else {
            Err(ConfigError::AlphaOutOfRange(alpha))
        }
    }

    /// Returns the level ratio α
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns true if `upper` nodes at height `l + 1` are too many for
    /// `lower` nodes at height `l`
    pub(crate) fn violated_by(&self, upper: usize, lower: usize) -> bool {
        upper as f64 > self.alpha * lower as f64
    }
}

impl Default for QuakeConfig {
    fn default() -> Self {
        Self {
            alpha: Self::DEFAULT_ALPHA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_half_open_range() {
        assert!(QuakeConfig::new(0.5).is_ok());
        assert!(QuakeConfig::new(0.99).is_ok());
        assert_eq!(QuakeConfig::new(1.0), Err(ConfigError::AlphaOutOfRange(1.0)));
        assert_eq!(QuakeConfig::new(0.49), Err(ConfigError::AlphaOutOfRange(0.49)));
        assert!(QuakeConfig::new(f64::NAN).is_err());
    }

    #[test]
    fn test_violation_threshold() {
        let config = QuakeConfig::default();
        // 3 / 4 is exactly at the limit
        assert!(!config.violated_by(3, 4));
        assert!(config.violated_by(4, 4));
        assert!(config.violated_by(1, 0));
        assert!(!config.violated_by(0, 0));
    }

    #[test]
    fn test_error_message() {
        let err = QuakeConfig::new(2.0).unwrap_err();
        assert_eq!(err.to_string(), "quake ratio 2 must lie in [0.5, 1)");
    }
}
