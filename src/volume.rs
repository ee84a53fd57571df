//! Stereo volume target applied to a device sink.

//---------------------------------------------------------------------------------------------------- Volume
/// Per-channel audio volume level.
///
/// This is a pair of [`f32`]'s between `0.0..=1.0`, where `0.0`
/// represents silence and `1.0` represents using the PCM samples
/// as-is, aka, max volume.
///
/// This unit is linear, not logarithmic - so `1.0` is 2x louder than `0.5`.
///
/// This is the type that [`Audio::set_volume`](crate::Audio::set_volume)
/// builds from its raw `left`/`right` inputs.
#[derive(Copy,Clone,Debug,PartialEq,PartialOrd)]
pub struct Volume {
	left:  f32,
	right: f32,
}

impl Volume {
	/// ```rust
	/// # use pcmflow::*;
	/// assert_eq!(Volume::MAX.left(), 1.0);
	/// assert_eq!(Volume::MAX.right(), 1.0);
	/// ```
	pub const MAX: Self = Self { left: 1.0, right: 1.0 };
	/// ```rust
	/// # use pcmflow::*;
	/// assert_eq!(Volume::MIN.left(), 0.0);
	/// assert_eq!(Volume::MIN.right(), 0.0);
	/// ```
	pub const MIN: Self = Self { left: 0.0, right: 0.0 };
	/// Sinks start at max volume, matching the raw PCM data.
	pub const DEFAULT: Self = Self::MAX;

	#[inline]
	#[must_use]
	/// Create a new [`Volume`] from a left/right [`f32`] pair.
	///
	/// Each channel is ran through [`Self::fix`] before returning.
	pub fn new(left: f32, right: f32) -> Self {
		Self { left, right }.fix()
	}

	#[inline]
	#[must_use]
	/// Checks a [`Volume`] for correctness and fixes it, per channel.
	///
	/// # Saturating
	/// Gains greater than `1.0` saturate to `1.0`.
	///
	/// # `NaN` & `infinity` & negatives
	/// - [`f32::NAN`] becomes `0.0`
	/// - [`f32::INFINITY`] becomes `1.0`
	/// - [`f32::NEG_INFINITY`] and negative floats become `0.0`
	///
	/// ```rust
	/// # use pcmflow::*;
	/// assert_eq!(Volume::new(0.25, 2.0),      Volume::new(0.25, 1.0));
	/// assert_eq!(Volume::new(f32::NAN, -1.0), Volume::MIN);
	/// ```
	pub fn fix(self) -> Self {
		Self {
			left:  fix_gain(self.left),
			right: fix_gain(self.right),
		}
	}

	#[inline]
	#[must_use]
	/// Returns the left channel gain.
	pub const fn left(&self) -> f32 {
		self.left
	}

	#[inline]
	#[must_use]
	/// Returns the right channel gain.
	pub const fn right(&self) -> f32 {
		self.right
	}
}

/// Clamp a single channel gain into `0.0..=1.0`, mapping weird floats down.
fn fix_gain(gain: f32) -> f32 {
	use std::num::FpCategory as F;
	match gain.classify() {
		F::Normal => {
			if gain > 1.0 {
				1.0
			} else if gain.is_sign_negative() {
				0.0
			} else {
				gain
			}
		},
		F::Infinite => {
			if gain.is_sign_positive() {
				1.0
			} else {
				0.0
			}
		},
		F::Zero | F::Nan | F::Subnormal => 0.0,
	}
}

impl Default for Volume {
	#[inline]
	fn default() -> Self {
		Self::DEFAULT
	}
}

impl std::fmt::Display for Volume {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "({}, {})", self.left, self.right)
	}
}

//---------------------------------------------------------------------------------------------------- TESTS
#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn fix() {
		// Normal.
		assert_eq!(Volume::new(0.00, 1.00), Volume { left: 0.00, right: 1.00 });
		assert_eq!(Volume::new(0.25, 0.50), Volume { left: 0.25, right: 0.50 });

		// Saturating.
		assert_eq!(Volume::new(1.1, 100.0), Volume::MAX);

		// Weird floats.
		assert_eq!(Volume::new(f32::NAN, f32::NAN),               Volume::MIN);
		assert_eq!(Volume::new(f32::INFINITY, f32::INFINITY),     Volume::MAX);
		assert_eq!(Volume::new(f32::NEG_INFINITY, -1.0),          Volume::MIN);
	}
}
