//! Device sink backends.

mod constants;
mod sink;
pub(crate) use sink::AudioSink;

// Use the dummy backend if:
// - we're testing
// - it was explicitly enabled
// - no real backend is enabled
cfg_if::cfg_if! {
	if #[cfg(any(test, feature = "dummy"))] {
		mod dummy;
		pub(crate) use dummy::DummySink as AudioSinkStruct;
		#[cfg(test)]
		pub(crate) use dummy::SinkEvent;
		/// The device sink backend used.
		pub(crate) const AUDIO_SINK_BACKEND: &str = "dummy";
	} else if #[cfg(feature = "cpal")] {
		mod cpal;
		pub(crate) use self::cpal::CpalSink as AudioSinkStruct;
		/// The device sink backend used.
		pub(crate) const AUDIO_SINK_BACKEND: &str = "cpal";
	} else {
		mod dummy;
		pub(crate) use dummy::DummySink as AudioSinkStruct;
		/// The device sink backend used.
		pub(crate) const AUDIO_SINK_BACKEND: &str = "dummy";
	}
}
