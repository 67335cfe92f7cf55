// SPDX-License-Identifier: Apache-2.0
//! Content-authoring-time slope trigonometry.
//!
//! Unlike a general-purpose deterministic `sin`/`cos` backend, the track
//! graph only ever needs `sin θ` for the two slope states a ramp can take:
//! flat (`θ = 0`) and a one-cell-rise-per-cell ramp (`θ = π/4`, see
//! `spec.md` §4.4's slope contract). Both are precomputed constants rather
//! than evaluated through a lookup table; the hot tick loop never calls into
//! this module, matching the "transcendentals only at authoring time" rule.

use super::fixed::Fixed;

/// The slope angle of a track cell, derived once when the track graph is
/// built and cached thereafter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Slope {
    /// `θ = 0`: no elevation change.
    Flat,
    /// `θ = π/4`: one cell of rise per cell of run.
    Ramp,
}

impl Slope {
    /// Returns `sin θ` for this slope, as a deterministic fixed-point
    /// constant derived once from the `f32` boundary at build time.
    #[must_use]
    pub fn sin(self) -> Fixed {
        match self {
            Self::Flat => Fixed::ZERO,
            // sin(π/4) = √2/2 ≈ 0.707_106_78
            Self::Ramp => Fixed::from_f32(core::f32::consts::FRAC_1_SQRT_2),
        }
    }

    /// Returns whether this slope is flat, used by Phase B's friction term.
    #[must_use]
    pub const fn is_flat(self) -> bool {
        matches!(self, Self::Flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_sine_is_zero() {
        assert_eq!(Slope::Flat.sin(), Fixed::ZERO);
    }

    #[test]
    fn ramp_sine_is_positive_and_less_than_one() {
        let s = Slope::Ramp.sin();
        assert!(s > Fixed::ZERO);
        assert!(s < Fixed::ONE);
    }

    #[test]
    fn flat_is_flat() {
        assert!(Slope::Flat.is_flat());
        assert!(!Slope::Ramp.is_flat());
    }
}
