//! Device sink abstraction.
//!
//! This file defines the trait required to take ready-to-go mono
//! PCM samples (concretely, [`i16`]'s) and actually send/write them
//! to the audio hardware/server.
//!
//! The trait `AudioSink` is the ideal abstract
//! simplification of what this part of the system should do.

//----------------------------------------------------------------------------------------------- use
use crate::error::SinkError;
use crate::volume::Volume;

//----------------------------------------------------------------------------------------------- AudioSink Trait
/// One connection to the audio hardware/server.
///
/// Implementations are internally synchronized: every method takes
/// `&self` so a sink can be driven concurrently by a player's writer
/// thread (writes) and the caller thread (control and queries), the
/// same way a platform audio track object is shared in place.
///
/// # Invariants
/// 1. Writes while paused or stopped are accepted and buffered
///    (pre-roll); only active playback consumes them.
/// 2. `stop()` discards buffered-but-unplayed samples and unblocks
///    any concurrently-hanging `write()`.
/// 3. `position()` only ever moves forward while the sink is active.
pub(crate) trait AudioSink: Send + Sync + Sized + 'static {
	/// Initialize a connection with the audio hardware/server
	/// for mono playback at `sample_rate`.
	///
	/// This is the only fallible entry point the pipeline surfaces to
	/// its caller - if the device cannot be opened at this rate, player
	/// creation fails and the caller decides what to do about it.
	fn try_open(sample_rate: u32) -> Result<Self, SinkError>;

	/// Fully write `samples` to the hardware/server (or internal buffer).
	///
	/// This may hang on device backpressure - the backend will have a
	/// backlog of previous samples. A concurrent [`Self::stop`] unblocks it.
	fn write(&self, samples: &[i16]) -> Result<(), SinkError>;

	/// Start playback.
	///
	/// This should "enable" the stream so that it is
	/// active and consuming whatever samples it has.
	fn play(&self) -> Result<(), SinkError>;

	/// Pause playback.
	///
	/// This should _not_ discard buffered samples, it should
	/// solely stop consuming them and return immediately.
	fn pause(&self) -> Result<(), SinkError>;

	/// Halt playback and discard every buffered-but-unplayed sample.
	///
	/// Infallible: a sink that cannot stop cleanly
	/// has nothing useful to report back.
	fn stop(&self);

	/// Record that frame `0` of this stream sits at absolute frame
	/// `origin` on the master timeline (synchronized-start bookkeeping).
	///
	/// Position reporting stays stream-local; the writer realizes the
	/// alignment itself by pre-writing silence.
	fn start_at(&self, origin: u64);

	/// The current playback head, in frames consumed by the device.
	fn position(&self) -> u64;

	/// Is the stream currently in active playback?
	fn is_active(&self) -> bool;

	/// Apply a stereo volume target to the device.
	///
	/// Best-effort: callers log and ignore a non-success result,
	/// a transient device hiccup must not abort an active stream.
	fn set_volume(&self, volume: Volume) -> Result<(), SinkError>;

	/// The sample rate this sink was opened with.
	fn sample_rate(&self) -> u32;
}
