//! The writer execution context.
//!
//! One thread per player: drains that player's command queue in
//! submission order and performs the actual device writes. Suspends
//! only inside the queue's blocking pop - it never busy-waits.

//---------------------------------------------------------------------------------------------------- Use
use crate::command::{Command,MasterRef};
use crate::macros::{debug2,trace2,warn2};
use crate::player::PlayerShared;
use crate::sink::AudioSink;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

//---------------------------------------------------------------------------------------------------- Constants
/// Largest single silence write during a synchronized start.
///
/// Chunked so the pool lends at most one modest buffer
/// at a time no matter how large the start offset is.
const SILENCE_CHUNK_LEN: usize = 4096;

//---------------------------------------------------------------------------------------------------- Writer
/// The writer side of one player.
pub(crate) struct Writer<Sink: AudioSink> {
	/// State shared with the caller side.
	shared: Arc<PlayerShared<Sink>>,
}

//---------------------------------------------------------------------------------------------------- Writer Impl
impl<Sink: AudioSink> Writer<Sink> {
	//---------------------------------------------------------------------------------------------------- Init
	#[cold]
	#[inline(never)]
	/// Spawn the writer thread for `shared`.
	pub(crate) fn init(id: u64, shared: Arc<PlayerShared<Sink>>) -> Result<JoinHandle<()>, std::io::Error> {
		std::thread::Builder::new()
			.name(format!("Writer-{id}"))
			.spawn(move || {
				let this = Writer { shared };
				Writer::main(this);
			})
	}

	//---------------------------------------------------------------------------------------------------- Main Loop
	#[cold]
	#[inline(never)]
	/// `Writer`'s main function.
	fn main(self) {
		debug2!("Writer - main()");

		// `pop_blocking` returns `None` only once `running`
		// is false and every queued command was handed out.
		while let Some(command) = self.shared.queue.pop_blocking(&self.shared.running) {
			// Route the command to its appropriate handler function.
			match command {
				Command::Buffer { data, valid } => self.buffer(data, valid),
				Command::Play { master, offset } => self.play(master, offset),
				Command::Pause => self.pause(),
			}
		}

		// A `queue_data` racing our shutdown may have slipped a
		// buffer in after the last pop; it goes back to the pool
		// unwritten so nothing ever leaks.
		self.shared.queue.drain_into(&self.shared.pool);
		debug2!("Writer - shutdown ... OK");
	}

	//---------------------------------------------------------------------------------------------------- Command Handlers
	// Command handlers.
	//
	// These are the functions invoked in response
	// to exact commands popped off our queue.

	#[inline]
	/// Write a buffer's valid prefix to the sink,
	/// then release it back to the pool.
	fn buffer(&self, data: Vec<i16>, valid: usize) {
		trace2!("Writer - buffer, valid: {valid}");
		self.write_to_sink(&data[..valid]);
		self.shared.pool.release(data);
	}

	#[inline]
	/// Unpause the sink, aligning to the
	/// master's live position first if asked.
	fn play(&self, master: Option<MasterRef>, offset: u64) {
		debug2!("Writer - play, offset: {offset}");

		if let Some(master) = master {
			// The master's position is read now, at execution time, not
			// at enqueue time - device playback position only exists
			// once frames have actually been written.
			match master.position() {
				Some(position) => {
					let origin = position + offset;
					self.shared.sink.start_at(origin);
					self.write_silence(offset);
				},
				// Master was deleted; degrade to an unsynchronized start.
				None => debug2!("Writer - master is gone, starting unsynchronized"),
			}
		}

		// Soft error: a device that refuses to unpause
		// right now gets retried by the next `Play`.
		if let Err(e) = self.shared.sink.play() {
			warn2!("Writer - sink play failed (ignored): {e}");
		}
	}

	#[inline]
	/// Pause the sink. The queue stays alive.
	fn pause(&self) {
		debug2!("Writer - pause");

		if let Err(e) = self.shared.sink.pause() {
			warn2!("Writer - sink pause failed (ignored): {e}");
		}
	}

	//---------------------------------------------------------------------------------------------------- Sink access
	/// One guarded device write.
	///
	/// The teardown guard plus the `running` re-check is what
	/// guarantees no write begins after deletion has stopped the sink.
	fn write_to_sink(&self, samples: &[i16]) {
		let _teardown = self.shared.teardown.lock();

		if !self.shared.running.load(Ordering::Acquire) {
			trace2!("Writer - skipping write, player deleted");
			return;
		}

		// Soft error: the buffer still goes back to the
		// pool afterwards, the command is never retried.
		if let Err(e) = self.shared.sink.write(samples) {
			warn2!("Writer - sink write failed (ignored): {e}");
		}
	}

	/// Realize a synchronized start by pre-writing
	/// `frames` frames of silence from the pool.
	fn write_silence(&self, frames: u64) {
		if frames == 0 {
			return;
		}
		debug2!("Writer - write_silence({frames})");

		let mut remaining = usize::try_from(frames).unwrap_or(usize::MAX);
		while remaining > 0 {
			let len = remaining.min(SILENCE_CHUNK_LEN);
			// `allocate` zeroes the prefix, so this is already silence.
			let silence = self.shared.pool.allocate(len);
			self.write_to_sink(&silence);
			self.shared.pool.release(silence);
			remaining -= len;
		}
	}
}
