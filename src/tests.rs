//! Shared test helpers.

//---------------------------------------------------------------------------------------------------- Use
use crate::audio::Audio;

//---------------------------------------------------------------------------------------------------- Helpers
/// Poll `condition` for up to ~500ms, panicking on timeout.
///
/// Writer threads flush on their own schedule; tests wait
/// on observable state instead of sleeping fixed amounts.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) {
	for _ in 0..500 {
		if condition() {
			return;
		}
		std::thread::sleep(std::time::Duration::from_millis(1));
	}
	panic!("condition not reached within 500ms");
}

/// A pool-allocated buffer of `len` samples
/// filled with an audible (non-zero) ramp.
pub(crate) fn pcm(audio: &Audio, len: usize) -> Vec<i16> {
	let mut buffer = audio.allocate(len);
	for (i, sample) in buffer.iter_mut().enumerate().take(len) {
		*sample = (i % 127 + 1) as i16;
	}
	buffer
}
