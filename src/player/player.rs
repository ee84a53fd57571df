//! Player state machine.

//---------------------------------------------------------------------------------------------------- Use
use crate::command::{Command,CommandQueue,MasterRef,PositionSource};
use crate::macros::{debug2,warn2};
use crate::player::Writer;
use crate::pool::BufferPool;
use crate::sink::AudioSink;
use crate::volume::Volume;
use parking_lot::Mutex;
use std::sync::{Arc,Weak};
use std::sync::atomic::{AtomicBool,Ordering};
use std::thread::JoinHandle;

//---------------------------------------------------------------------------------------------------- PlayerShared
/// The state shared between a player's caller
/// thread and its writer thread.
#[derive(Debug)]
pub(crate) struct PlayerShared<Sink: AudioSink> {
	/// Ordered commands for the writer.
	pub(crate) queue: CommandQueue,
	/// The device sink (internally synchronized).
	pub(crate) sink: Sink,
	/// Has a `Play` been issued without an intervening stop?
	pub(crate) playing: AtomicBool,
	/// Writer-loop continuation flag; flips
	/// false exactly once, at deletion.
	pub(crate) running: AtomicBool,
	/// Destruction-scoped lock, distinct from the queue's.
	///
	/// Held around sink-stop-and-drain, and by the writer around
	/// its `running` re-check before each device write - which is
	/// what makes "no write begins after teardown" hold.
	pub(crate) teardown: Mutex<()>,
	/// Where buffers go when the writer (or a drain) is done with them.
	pub(crate) pool: Arc<BufferPool>,
}

impl<Sink: AudioSink> PositionSource for PlayerShared<Sink> {
	fn position(&self) -> u64 {
		if self.sink.is_active() {
			self.sink.position()
		} else {
			0
		}
	}
}

//---------------------------------------------------------------------------------------------------- Player
/// One audio track: a device sink, its command
/// queue, and (once started) a writer thread.
///
/// State machine: `Stopped -> Playing -> Paused -> Playing -> Stopped`,
/// with `Deleted` reachable from any state (terminal).
#[derive(Debug)]
pub(crate) struct Player<Sink: AudioSink> {
	/// Facade-assigned id, used for the writer thread name.
	id: u64,
	/// State shared with the writer thread.
	pub(crate) shared: Arc<PlayerShared<Sink>>,
	/// The writer thread, spawned lazily by the first
	/// [`Player::start`], at most once. Never joined on
	/// deletion - the writer flushes and exits on its own.
	writer: Option<JoinHandle<()>>,
}

impl<Sink: AudioSink> Player<Sink> {
	#[cold]
	#[inline(never)]
	/// Wrap a freshly-opened sink into a (stopped, writerless) player.
	pub(crate) fn new(id: u64, sink: Sink, pool: Arc<BufferPool>) -> Self {
		Self {
			id,
			shared: Arc::new(PlayerShared {
				queue: CommandQueue::new(),
				sink,
				playing: AtomicBool::new(false),
				running: AtomicBool::new(true),
				teardown: Mutex::new(()),
				pool,
			}),
			writer: None,
		}
	}

	/// A non-owning position accessor onto this player,
	/// for use as another track's master reference.
	pub(crate) fn master_ref(&self) -> MasterRef {
		let weak: Weak<dyn PositionSource> = Arc::downgrade(&self.shared) as _;
		MasterRef::new(weak)
	}

	/// Wrap `data`/`valid` as a buffer command and enqueue it.
	///
	/// Ownership of `data` transfers immediately; it comes back
	/// to the pool once the writer (or a drain) is done with it.
	pub(crate) fn queue_data(&self, data: Vec<i16>, valid: usize) {
		let valid = valid.min(data.len());
		self.shared.queue.push(Command::Buffer { data, valid });
	}

	/// Enqueue a `Play`, spawning the writer thread if
	/// this is the first start on this player.
	pub(crate) fn start(&mut self, master: Option<MasterRef>, offset: u64) -> Result<(), std::io::Error> {
		debug2!("Player {} - start, offset: {offset}", self.id);

		if self.writer.is_none() {
			self.writer = Some(Writer::init(self.id, Arc::clone(&self.shared))?);
		}

		self.shared.playing.store(true, Ordering::Release);
		self.shared.queue.push(Command::Play { master, offset });
		Ok(())
	}

	/// Enqueue a `Pause`.
	///
	/// The writer stops feeding the sink when it gets there; buffer
	/// commands after it accumulate until the next `Play`. The
	/// `playing` flag stays set - a paused track still counts as
	/// playing until an explicit stop.
	pub(crate) fn pause(&self) {
		debug2!("Player {} - pause", self.id);
		self.shared.queue.push(Command::Pause);
	}

	/// Stop the sink and drain the queue, synchronously.
	///
	/// Unlike pause, stop is not queued - it preempts. On return the
	/// sink is silent, the queue is empty, and every pending buffer
	/// is back in the pool.
	pub(crate) fn stop(&self) {
		debug2!("Player {} - stop", self.id);

		// Stopping first unblocks a writer hanging in a device write,
		// so taking the teardown guard below cannot deadlock on it.
		self.shared.sink.stop();
		{
			let _teardown = self.shared.teardown.lock();
			self.shared.queue.drain_into(&self.shared.pool);
		}
		self.shared.playing.store(false, Ordering::Release);
	}

	/// Flip `running`, stop the sink, drain the queue, wake the writer.
	///
	/// Not joined - this returns while the writer may still be
	/// winding down, but it will never touch the sink again.
	pub(crate) fn delete(&mut self) {
		debug2!("Player {} - delete", self.id);

		self.shared.running.store(false, Ordering::Release);

		// First stop unblocks a writer hanging in a device write,
		// so taking the teardown guard below cannot deadlock on it.
		self.shared.sink.stop();
		{
			// Any in-flight write has finished once we hold the guard,
			// and with `running` false no new one begins - this second
			// stop is the sink's final word.
			let _teardown = self.shared.teardown.lock();
			self.shared.sink.stop();
			self.shared.queue.drain_into(&self.shared.pool);
		}
		self.shared.queue.wake();
	}

	/// Deliberately conservative: a track with buffered-but-unwritten
	/// data still counts as playing, preventing premature
	/// "song ended" signals on the caller side.
	pub(crate) fn is_playing(&self) -> bool {
		!self.shared.queue.is_empty()
			|| self.shared.sink.is_active()
			|| self.shared.playing.load(Ordering::Acquire)
	}

	/// The device playback head in frames,
	/// or `0` if the sink is not in active playback.
	pub(crate) fn position(&self) -> u64 {
		self.shared.position()
	}

	/// Apply a volume target to the sink. Best-effort.
	pub(crate) fn set_volume(&self, volume: Volume) {
		if let Err(e) = self.shared.sink.set_volume(volume) {
			warn2!("Player {} - set_volume({volume}) failed (ignored): {e}", self.id);
		}
	}

	/// The sample rate this player's sink was opened with.
	pub(crate) fn sample_rate(&self) -> u32 {
		self.shared.sink.sample_rate()
	}
}

impl<Sink: AudioSink> Drop for Player<Sink> {
	fn drop(&mut self) {
		// Dropping without an explicit delete still
		// shuts the writer down; delete is idempotent.
		if self.shared.running.load(Ordering::Acquire) {
			self.delete();
		}
	}
}
