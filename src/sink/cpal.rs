//! Real device sink.
//!
//! This file implements the abstract `AudioSink`
//! trait using `cpal` as a backend.
//!
//! Mono `i16` frames arrive via `write()`, get volume-scaled and
//! fanned out to the device channel count inside the data callback.
//!
//! `cpal::Stream` is neither `Send` nor `Sync`, so the stream lives on
//! a dedicated thread spawned by `try_open()`, which reports open
//! success/failure back over a channel and then sleeps until shutdown.

//----------------------------------------------------------------------------------------------- use
use crate::error::SinkError;
use crate::macros::{debug2,error2,trace2};
use crate::sink::AudioSink;
use crate::sink::constants::SINK_MILLISECOND_BUFFER;
use crate::volume::Volume;
use crossbeam::channel::{Receiver,Sender};
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool,AtomicU32,AtomicU64,Ordering};
use cpal::traits::{DeviceTrait,HostTrait,StreamTrait};

//----------------------------------------------------------------------------------------------- CpalSink
/// State shared with the device data callback.
#[derive(Debug)]
struct CpalShared {
	/// Gates consumption; the stream itself is never paused,
	/// a non-playing callback just outputs silence.
	playing: AtomicBool,
	/// Frames consumed by the callback, aka the playback head.
	frames: AtomicU64,
	/// Left/right gains as `f32` bits, read by the callback per cycle.
	volume_left:  AtomicU32,
	volume_right: AtomicU32,
	/// Synchronized-start bookkeeping, kept for diagnostics.
	origin: AtomicU64,
}

/// A `cpal` connection to the audio hardware/server.
#[derive(Debug)]
pub(crate) struct CpalSink {
	/// We send samples to this channel which the
	/// device data callback will receive and play.
	///
	/// Bounded - sending hangs when the device has
	/// a full backlog, which is our backpressure.
	to_device: Sender<i16>,

	/// A signal to the data callback that it should discard
	/// all buffered samples and return ASAP.
	discard: Sender<()>,

	/// Tells the stream thread to drop the stream and exit.
	shutdown: Sender<()>,

	/// State shared with the data callback.
	shared: Arc<CpalShared>,

	/// Sample rate this sink was opened with.
	sample_rate: u32,
}

//----------------------------------------------------------------------------------------------- `AudioSink` Impl
impl AudioSink for CpalSink {
	#[cold]
	#[inline(never)]
	fn try_open(sample_rate: u32) -> Result<Self, SinkError> {
		debug2!("CpalSink - try_open({sample_rate})");

		if sample_rate == 0 {
			return Err(SinkError::InvalidSampleRate);
		}

		// The writer <-> callback channel holds `SINK_MILLISECOND_BUFFER`
		// worth of mono samples at this rate.
		let channel_len = (SINK_MILLISECOND_BUFFER * sample_rate as usize) / 1000;
		debug2!("CpalSink - channel_len: {channel_len}");

		let (to_device, from_writer)     = crossbeam::channel::bounded::<i16>(channel_len);
		let (discard, discard_recv)      = crossbeam::channel::bounded::<()>(1);
		let (shutdown, shutdown_recv)    = crossbeam::channel::bounded::<()>(1);
		let (open_result, open_received) = crossbeam::channel::bounded::<Result<(), SinkError>>(1);

		let shared = Arc::new(CpalShared {
			playing:      AtomicBool::new(false),
			frames:       AtomicU64::new(0),
			volume_left:  AtomicU32::new(Volume::DEFAULT.left().to_bits()),
			volume_right: AtomicU32::new(Volume::DEFAULT.right().to_bits()),
			origin:       AtomicU64::new(0),
		});

		// The stream must be created _and_ dropped on this thread.
		let callback_shared = Arc::clone(&shared);
		let spawned = std::thread::Builder::new()
			.name("CpalStream".into())
			.spawn(move || {
				let stream = match open_stream(sample_rate, callback_shared, from_writer, discard_recv) {
					Ok(stream) => {
						drop(open_result.send(Ok(())));
						stream
					},
					Err(e) => {
						drop(open_result.send(Err(e)));
						return;
					},
				};

				// Hang until shutdown, keeping the stream alive.
				// An `Err` here means the sink was leaked without
				// a shutdown signal; exiting is still correct.
				drop(shutdown_recv.recv());
				drop(stream);
				debug2!("CpalStream - shutdown ... OK");
			});

		if let Err(e) = spawned {
			return Err(SinkError::Unknown(Cow::Owned(format!("failed to spawn stream thread: {e}"))));
		}

		// Surface device-open failure synchronously.
		match open_received.recv() {
			Ok(Ok(())) => {},
			Ok(Err(e)) => return Err(e),
			Err(_) => return Err(SinkError::DeviceUnavailable),
		}

		Ok(Self {
			to_device,
			discard,
			shutdown,
			shared,
			sample_rate,
		})
	}

	fn write(&self, samples: &[i16]) -> Result<(), SinkError> {
		trace2!("CpalSink - write, samples: {}", samples.len());

		// This hangs once the device backlog is full; a concurrent
		// `stop()` drains the channel and lets it proceed.
		for sample in samples {
			if self.to_device.send(*sample).is_err() {
				return Err(SinkError::StreamClosed);
			}
		}

		Ok(())
	}

	fn play(&self) -> Result<(), SinkError> {
		debug2!("CpalSink - play()");
		self.shared.playing.store(true, Ordering::Release);
		Ok(())
	}

	fn pause(&self) -> Result<(), SinkError> {
		debug2!("CpalSink - pause()");
		self.shared.playing.store(false, Ordering::Release);
		Ok(())
	}

	fn stop(&self) {
		debug2!("CpalSink - stop()");
		self.shared.playing.store(false, Ordering::Release);

		// The callback runs even while "paused" (it outputs silence),
		// so the discard request is always serviced - this is also what
		// unblocks a writer hanging in `write()`.
		if self.discard.is_empty() {
			drop(self.discard.try_send(()));
		}
	}

	fn start_at(&self, origin: u64) {
		debug2!("CpalSink - start_at({origin})");
		self.shared.origin.store(origin, Ordering::Release);
	}

	fn position(&self) -> u64 {
		self.shared.frames.load(Ordering::Acquire)
	}

	fn is_active(&self) -> bool {
		self.shared.playing.load(Ordering::Acquire)
	}

	fn set_volume(&self, volume: Volume) -> Result<(), SinkError> {
		debug2!("CpalSink - set_volume({volume})");
		self.shared.volume_left.store(volume.left().to_bits(), Ordering::Release);
		self.shared.volume_right.store(volume.right().to_bits(), Ordering::Release);
		Ok(())
	}

	fn sample_rate(&self) -> u32 {
		self.sample_rate
	}
}

impl Drop for CpalSink {
	fn drop(&mut self) {
		// The stream thread may already be gone (open failed); ignore.
		drop(self.shutdown.try_send(()));
	}
}

//----------------------------------------------------------------------------------------------- Stream setup
/// Open the default output device at `sample_rate` and
/// start a stream pulling samples out of `from_writer`.
///
/// Runs on the stream thread.
#[cold]
#[inline(never)]
fn open_stream(
	sample_rate: u32,
	shared: Arc<CpalShared>,
	from_writer: Receiver<i16>,
	discard_recv: Receiver<()>,
) -> Result<cpal::Stream, SinkError> {
	// Get default host.
	let host = cpal::default_host();

	// Get the default audio output device.
	let Some(device) = host.default_output_device() else {
		return Err(SinkError::DeviceUnavailable);
	};

	// Get the default device config.
	let default_config = device.default_output_config()?;
	debug2!("CpalSink - device_config:\n{default_config:#?}");

	if default_config.sample_format() != cpal::SampleFormat::F32 {
		return Err(SinkError::InvalidFormat);
	}

	// Keep the device's preferred channel layout,
	// open at the track's own sample rate.
	let channels = std::cmp::max(default_config.channels(), 1);
	let config = cpal::StreamConfig {
		channels,
		sample_rate: cpal::SampleRate(sample_rate),
		buffer_size: cpal::BufferSize::Default,
	};
	debug2!("CpalSink - config:\n{config:#?}");

	let channels = channels as usize;

	// The actual callback `cpal` will call when polling for audio data.
	let data_callback = move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
		// We received a "discard" signal.
		// Drop all buffered audio and go silent ASAP.
		if discard_recv.try_recv().is_ok() {
			while from_writer.try_recv().is_ok() {} // drain channel
			output.fill(0.0);
			return;
		}

		// Not playing: the buffered samples keep
		// waiting (pre-roll), we output silence.
		if !shared.playing.load(Ordering::Acquire) {
			output.fill(0.0);
			return;
		}

		let left  = f32::from_bits(shared.volume_left.load(Ordering::Acquire));
		let right = f32::from_bits(shared.volume_right.load(Ordering::Acquire));

		// Fill output while there are samples in the channel,
		// fanning each mono frame out to every device channel.
		let mut frames_written: u64 = 0;
		for frame in output.chunks_mut(channels) {
			let Ok(sample) = from_writer.try_recv() else {
				frame.fill(0.0);
				continue;
			};

			let sample = f32::from(sample) / -(f32::from(i16::MIN));
			for (i, out) in frame.iter_mut().enumerate() {
				*out = sample * if i == 0 { left } else { right };
			}
			frames_written += 1;
		}

		if frames_written > 0 {
			shared.frames.fetch_add(frames_written, Ordering::Release);
		}
	};

	// The callback `cpal` will call when errors occur.
	//
	// Device-call soft errors: logged, never propagated -
	// a transient hiccup must not abort an active stream.
	let error_callback = move |error: cpal::StreamError| {
		error2!("CpalSink - stream error: {error}");
	};

	// Build the audio stream.
	let stream = device.build_output_stream(&config, data_callback, error_callback, None)?;

	// Start it immediately; `playing` gates actual consumption.
	stream.play()?;

	Ok(stream)
}

//----------------------------------------------------------------------------------------------- Error re-map
impl From<cpal::DefaultStreamConfigError> for SinkError {
	fn from(error: cpal::DefaultStreamConfigError) -> Self {
		use cpal::DefaultStreamConfigError as E;
		match error {
			E::DeviceNotAvailable => Self::DeviceUnavailable,
			E::StreamTypeNotSupported => Self::InvalidFormat,
			E::BackendSpecific { err } => Self::Unknown(Cow::Owned(err.description)),
		}
	}
}

impl From<cpal::BuildStreamError> for SinkError {
	fn from(error: cpal::BuildStreamError) -> Self {
		use cpal::BuildStreamError as E;
		match error {
			E::DeviceNotAvailable | E::InvalidArgument | E::StreamIdOverflow => Self::DeviceUnavailable,
			E::StreamConfigNotSupported => Self::InvalidFormat,
			E::BackendSpecific { err } => Self::Unknown(Cow::Owned(err.description)),
		}
	}
}

impl From<cpal::PlayStreamError> for SinkError {
	fn from(error: cpal::PlayStreamError) -> Self {
		use cpal::PlayStreamError as E;
		match error {
			E::DeviceNotAvailable => Self::DeviceUnavailable,
			E::BackendSpecific { err } => Self::Unknown(Cow::Owned(err.description)),
		}
	}
}
