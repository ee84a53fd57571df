//! Dummy device sink.
//!
//! This file implements the abstract `AudioSink` trait
//! using a fake backend that connects to nothing.
//!
//! Functionally, it behaves the same as a real backend - writes
//! buffer while paused, playback consumes them - except consumption
//! is instantaneous and deterministic, and every call is recorded
//! in a bounded event log.
//!
//! This is used for testing purposes.

//----------------------------------------------------------------------------------------------- use
use crate::error::SinkError;
use crate::macros::{debug2,trace2};
use crate::sink::AudioSink;
use crate::sink::constants::EVENT_LOG_LEN;
use crate::volume::Volume;
use parking_lot::Mutex;

//----------------------------------------------------------------------------------------------- SinkEvent
/// One recorded call onto a [`DummySink`].
///
/// The test-suite asserts on sequences of these to verify dispatch
/// ordering, teardown safety, and synchronized starts.
#[derive(Debug,Clone,Copy,PartialEq)]
pub(crate) enum SinkEvent {
	/// `write()` with this many frames.
	Write(u64),
	/// `play()`.
	Play,
	/// `pause()`.
	Pause,
	/// `stop()`.
	Stop,
	/// `start_at()` with this origin.
	StartAt(u64),
	/// `set_volume()` with this target.
	Volume(Volume),
}

//----------------------------------------------------------------------------------------------- DummySink
/// The mutable state behind the sink's lock.
#[derive(Debug,Default)]
struct DummyState {
	/// Frames written but not yet consumed (pre-roll).
	pending: u64,
	/// Frames consumed, aka the playback head.
	head: u64,
	/// Synchronized-start bookkeeping.
	origin: u64,
	/// Are we consuming frames?
	playing: bool,
	/// Last applied volume target.
	volume: Volume,
	/// Everything that happened to this sink, in order.
	events: Vec<SinkEvent>,
}

/// A fake connection to the audio hardware/server.
#[derive(Debug)]
pub(crate) struct DummySink {
	state: Mutex<DummyState>,
	sample_rate: u32,
}

impl DummyState {
	/// Record one event, dropping new
	/// events once the log is full.
	fn record(&mut self, event: SinkEvent) {
		if self.events.len() < EVENT_LOG_LEN {
			self.events.push(event);
		}
	}
}

impl DummySink {
	/// Everything that happened to this sink so far, in order.
	#[cfg(test)]
	pub(crate) fn events(&self) -> Vec<SinkEvent> {
		self.state.lock().events.clone()
	}

	/// Frames written but not yet consumed.
	#[cfg(test)]
	pub(crate) fn pending(&self) -> u64 {
		self.state.lock().pending
	}

	/// The synchronized-start origin last recorded.
	#[cfg(test)]
	pub(crate) fn origin(&self) -> u64 {
		self.state.lock().origin
	}

	/// The last applied volume target.
	#[cfg(test)]
	pub(crate) fn volume(&self) -> Volume {
		self.state.lock().volume
	}
}

//----------------------------------------------------------------------------------------------- `AudioSink` Impl
impl AudioSink for DummySink {
	fn try_open(sample_rate: u32) -> Result<Self, SinkError> {
		debug2!("DummySink - try_open({sample_rate})");

		// A real device refuses a zero rate, so does the fake one.
		if sample_rate == 0 {
			return Err(SinkError::InvalidSampleRate);
		}

		Ok(Self {
			state: Mutex::new(DummyState::default()),
			sample_rate,
		})
	}

	fn write(&self, samples: &[i16]) -> Result<(), SinkError> {
		trace2!("DummySink - write, samples: {}", samples.len());

		let frames = samples.len() as u64;
		let mut state = self.state.lock();
		state.record(SinkEvent::Write(frames));

		if state.playing {
			// Instantaneous consumption: the fake device
			// plays everything the moment it arrives.
			let pending = state.pending;
			state.head += pending + frames;
			state.pending = 0;
		} else {
			state.pending += frames;
		}

		Ok(())
	}

	fn play(&self) -> Result<(), SinkError> {
		debug2!("DummySink - play()");

		let mut state = self.state.lock();
		state.record(SinkEvent::Play);
		state.playing = true;

		// Pre-roll becomes audible.
		let pending = state.pending;
		state.head += pending;
		state.pending = 0;
		Ok(())
	}

	fn pause(&self) -> Result<(), SinkError> {
		debug2!("DummySink - pause()");

		let mut state = self.state.lock();
		state.record(SinkEvent::Pause);
		state.playing = false;
		Ok(())
	}

	fn stop(&self) {
		debug2!("DummySink - stop()");

		let mut state = self.state.lock();
		state.record(SinkEvent::Stop);
		state.playing = false;
		state.pending = 0;
	}

	fn start_at(&self, origin: u64) {
		debug2!("DummySink - start_at({origin})");

		let mut state = self.state.lock();
		state.record(SinkEvent::StartAt(origin));
		state.origin = origin;
	}

	fn position(&self) -> u64 {
		self.state.lock().head
	}

	fn is_active(&self) -> bool {
		self.state.lock().playing
	}

	fn set_volume(&self, volume: Volume) -> Result<(), SinkError> {
		debug2!("DummySink - set_volume({volume})");

		let mut state = self.state.lock();
		state.record(SinkEvent::Volume(volume));
		state.volume = volume;
		Ok(())
	}

	fn sample_rate(&self) -> u32 {
		self.sample_rate
	}
}

//----------------------------------------------------------------------------------------------- TESTS
#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn zero_rate_is_refused() {
		assert!(matches!(DummySink::try_open(0), Err(SinkError::InvalidSampleRate)));
	}

	#[test]
	fn preroll_buffers_until_play() {
		let sink = DummySink::try_open(44_100).unwrap();

		sink.write(&[0; 100]).unwrap();
		sink.write(&[0; 50]).unwrap();
		assert_eq!(sink.position(), 0);
		assert_eq!(sink.pending(), 150);
		assert_eq!(sink.is_active(), false);

		sink.play().unwrap();
		assert_eq!(sink.position(), 150);
		assert_eq!(sink.pending(), 0);
		assert_eq!(sink.is_active(), true);
	}

	#[test]
	fn stop_discards_preroll() {
		let sink = DummySink::try_open(44_100).unwrap();

		sink.write(&[0; 100]).unwrap();
		sink.stop();
		assert_eq!(sink.pending(), 0);

		// Whatever was discarded never reaches the head.
		sink.play().unwrap();
		assert_eq!(sink.position(), 0);
	}

	#[test]
	fn pause_keeps_buffered_samples() {
		let sink = DummySink::try_open(44_100).unwrap();

		sink.play().unwrap();
		sink.write(&[0; 10]).unwrap();
		sink.pause().unwrap();
		sink.write(&[0; 20]).unwrap();
		assert_eq!(sink.position(), 10);
		assert_eq!(sink.pending(), 20);

		sink.play().unwrap();
		assert_eq!(sink.position(), 30);
	}
}
