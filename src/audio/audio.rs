//! Audio pipeline facade.

//---------------------------------------------------------------------------------------------------- Use
use crate::error::SinkError;
use crate::macros::{error2,info2,warn2};
use crate::player::Player;
use crate::pool::BufferPool;
use crate::sink::{AUDIO_SINK_BACKEND,AudioSink,AudioSinkStruct};
use crate::volume::Volume;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64,Ordering};

//---------------------------------------------------------------------------------------------------- PlayerHandle
/// An opaque ticket identifying one player inside an [`Audio`].
///
/// Handles are never reused, so a handle held past its player's
/// deletion is harmless - every operation on it becomes a no-op
/// (or returns `0`/`false` for queries).
#[derive(Copy,Clone,Debug,PartialEq,Eq,Hash)]
pub struct PlayerHandle(u64);

//---------------------------------------------------------------------------------------------------- Audio
/// The audio pipeline.
///
/// Owns the shared [`BufferPool`] and every live [`Player`],
/// keyed by [`PlayerHandle`]. All methods take `&self` and are
/// safe to call from any thread.
///
/// The intended call pattern per buffer is:
/// [`Audio::allocate`], fill with samples, [`Audio::queue_data`] -
/// ownership transfers on queue and the buffer returns to the pool
/// once played (or discarded).
#[derive(Debug)]
pub struct Audio {
	/// Recycled sample buffers, shared by every player.
	pool: Arc<BufferPool>,
	/// Every live player. This is the outermost
	/// lock - always taken before any player-internal one.
	players: Mutex<HashMap<PlayerHandle, Player<AudioSinkStruct>>>,
	/// Monotonic handle source.
	next_id: AtomicU64,
}

impl Audio {
	#[cold]
	#[inline(never)]
	/// Create a new, empty [`Audio`] with its own buffer pool.
	pub fn new() -> Self {
		Self::with_pool(Arc::new(BufferPool::new()))
	}

	#[cold]
	#[inline(never)]
	/// Create a new, empty [`Audio`] sharing an existing buffer pool.
	pub fn with_pool(pool: Arc<BufferPool>) -> Self {
		info2!("Audio - init, backend: {AUDIO_SINK_BACKEND}");

		Self {
			pool,
			players: Mutex::new(HashMap::new()),
			next_id: AtomicU64::new(0),
		}
	}

	//---------------------------------------------------------------------------------------------------- Player lifecycle
	/// Open a device sink at `sample_rate` and register
	/// a new (stopped) player around it.
	///
	/// ## Errors
	/// Fails if the backend refuses the rate or no device is available.
	pub fn create_player(&self, sample_rate: u32) -> Result<PlayerHandle, SinkError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		info2!("Audio - create_player({sample_rate}), id: {id}");

		let sink = AudioSinkStruct::try_open(sample_rate)?;
		let player = Player::new(id, sink, Arc::clone(&self.pool));
		let handle = PlayerHandle(id);

		self.players.lock().insert(handle, player);
		Ok(handle)
	}

	/// Unregister a player and begin its teardown.
	///
	/// Returns immediately; the player's writer thread (if any)
	/// drains its remaining buffers back to the pool and exits
	/// on its own. The handle is dead afterwards.
	pub fn delete_player(&self, handle: PlayerHandle) {
		info2!("Audio - delete_player({handle:?})");

		// Deletion itself happens outside the map
		// lock, it never blocks other callers.
		let player = self.players.lock().remove(&handle);

		match player {
			Some(mut player) => player.delete(),
			None => warn2!("Audio - delete_player on unknown {handle:?}, ignoring"),
		}
	}

	//---------------------------------------------------------------------------------------------------- Buffers
	/// Take a buffer of at least `min_len` samples from the pool.
	///
	/// The prefix `[..min_len]` is zeroed. Give it back via
	/// [`Audio::queue_data`] or [`Audio::deallocate`].
	pub fn allocate(&self, min_len: usize) -> Vec<i16> {
		self.pool.allocate(min_len)
	}

	/// Return an unused buffer to the pool.
	pub fn deallocate(&self, buffer: Vec<i16>) {
		self.pool.release(buffer);
	}

	/// Hand a filled buffer to `handle`'s player.
	///
	/// Only the first `valid` samples are played. Ownership of
	/// `data` transfers unconditionally - on an unknown handle the
	/// buffer goes straight back to the pool instead of leaking.
	pub fn queue_data(&self, handle: PlayerHandle, data: Vec<i16>, valid: usize, sample_rate: u32) {
		let players = self.players.lock();

		let Some(player) = players.get(&handle) else {
			warn2!("Audio - queue_data on unknown {handle:?}, releasing buffer");
			self.pool.release(data);
			return;
		};

		// The rate was fixed at `create_player`; a mismatch here
		// means the caller mixed up handles.
		debug_assert_eq!(sample_rate, player.sample_rate());

		player.queue_data(data, valid);
	}

	//---------------------------------------------------------------------------------------------------- Transport
	/// Start (or resume) playback on `handle`'s player.
	///
	/// With a `master`, playback is synchronized: this track's frame
	/// `0` is aligned to the master's live position plus `offset`
	/// frames, read at the moment the writer executes the start. A
	/// master deleted by then degrades to an unsynchronized start.
	pub fn start_playing(&self, handle: PlayerHandle, master: Option<PlayerHandle>, offset: u64) {
		let mut players = self.players.lock();

		// Resolved under the same map lock, so the master
		// cannot be swapped out between lookup and use.
		let master_ref = master.and_then(|master| {
			let master_ref = players.get(&master).map(Player::master_ref);
			if master_ref.is_none() {
				warn2!("Audio - start_playing({handle:?}) with unknown master {master:?}, starting unsynchronized");
			}
			master_ref
		});

		let Some(player) = players.get_mut(&handle) else {
			warn2!("Audio - start_playing on unknown {handle:?}, ignoring");
			return;
		};

		// Thread-spawn failure is terminal for this start but not
		// for the player; a later `start_playing` retries.
		if let Err(e) = player.start(master_ref, offset) {
			error2!("Audio - start_playing({handle:?}) failed to spawn writer: {e}");
		}
	}

	/// Pause `handle`'s player, in queue order.
	///
	/// Buffers queued before this keep playing first; buffers queued
	/// after it wait, buffered, for the next [`Audio::start_playing`].
	pub fn pause_player(&self, handle: PlayerHandle) {
		match self.players.lock().get(&handle) {
			Some(player) => player.pause(),
			None => warn2!("Audio - pause_player on unknown {handle:?}, ignoring"),
		}
	}

	/// Stop `handle`'s player, synchronously.
	///
	/// On return the sink is silent, the player's queue is empty,
	/// and every pending buffer is back in the pool. The player
	/// itself stays alive and restartable.
	pub fn stop_player(&self, handle: PlayerHandle) {
		match self.players.lock().get(&handle) {
			Some(player) => player.stop(),
			None => warn2!("Audio - stop_player on unknown {handle:?}, ignoring"),
		}
	}

	//---------------------------------------------------------------------------------------------------- Queries
	/// The player's device playback head in frames.
	///
	/// `0` while the sink is not in active playback (stopped or
	/// paused), and `0` for an unknown handle.
	pub fn get_position(&self, handle: PlayerHandle) -> u64 {
		self.players.lock().get(&handle).map_or(0, Player::position)
	}

	/// Is this player still busy?
	///
	/// `true` while any of: buffers remain queued, the sink is in
	/// active playback, or a start was issued without a stop since.
	/// Deliberately conservative - `false` means "safe to treat
	/// the track as finished".
	pub fn is_playing(&self, handle: PlayerHandle) -> bool {
		self.players.lock().get(&handle).is_some_and(Player::is_playing)
	}

	/// Set per-channel gain on `handle`'s player. Best-effort.
	///
	/// Gains are clamped to `0.0..=1.0` (NaN becomes `0.0`).
	pub fn set_volume(&self, handle: PlayerHandle, left: f32, right: f32) {
		match self.players.lock().get(&handle) {
			Some(player) => player.set_volume(Volume::new(left, right)),
			None => warn2!("Audio - set_volume on unknown {handle:?}, ignoring"),
		}
	}

	/// The shared buffer pool.
	pub fn pool(&self) -> &Arc<BufferPool> {
		&self.pool
	}

	/// The name of the device sink backend compiled in.
	pub const fn backend(&self) -> &'static str {
		AUDIO_SINK_BACKEND
	}

	//---------------------------------------------------------------------------------------------------- Test access
	/// Reach into a player's shared state (and through
	/// it, the sink's event log).
	#[cfg(test)]
	pub(crate) fn shared(&self, handle: PlayerHandle) -> Option<Arc<crate::player::PlayerShared<AudioSinkStruct>>> {
		self.players.lock().get(&handle).map(|player| Arc::clone(&player.shared))
	}
}

impl Default for Audio {
	fn default() -> Self {
		Self::new()
	}
}

//---------------------------------------------------------------------------------------------------- TESTS
#[cfg(test)]
mod tests {
	use super::*;
	use crate::sink::SinkEvent;
	use crate::tests::{pcm,wait_until};
	use pretty_assertions::assert_eq;

	const RATE: u32 = 44_100;

	#[test]
	fn dummy_backend_selected_under_test() {
		assert_eq!(Audio::new().backend(), "dummy");
	}

	#[test]
	fn commands_reach_the_sink_in_queue_order() {
		let audio = Audio::new();
		let handle = audio.create_player(RATE).unwrap();
		let shared = audio.shared(handle).unwrap();

		audio.queue_data(handle, pcm(&audio, 100), 100, RATE);
		audio.queue_data(handle, pcm(&audio, 50), 30, RATE);
		audio.pause_player(handle);
		audio.start_playing(handle, None, 0);
		// Active only once the trailing `Play` has executed.
		wait_until(|| shared.sink.is_active());

		// Both buffers land before the pause, and only
		// their valid prefixes; the play comes last.
		assert_eq!(shared.sink.events(), vec![
			SinkEvent::Write(100),
			SinkEvent::Write(30),
			SinkEvent::Pause,
			SinkEvent::Play,
		]);

		// Play consumed the pre-roll.
		assert_eq!(audio.get_position(handle), 130);
	}

	#[test]
	fn is_playing_is_conservative() {
		let audio = Audio::new();
		let handle = audio.create_player(RATE).unwrap();
		let shared = audio.shared(handle).unwrap();

		// Fresh player: idle.
		assert_eq!(audio.is_playing(handle), false);

		// Queued-but-unwritten data already counts.
		audio.queue_data(handle, pcm(&audio, 10), 10, RATE);
		assert_eq!(audio.is_playing(handle), true);

		audio.start_playing(handle, None, 0);
		wait_until(|| shared.queue.is_empty());
		assert_eq!(audio.is_playing(handle), true);

		// A pause alone does not end the track.
		audio.pause_player(handle);
		wait_until(|| !shared.sink.is_active());
		assert_eq!(audio.is_playing(handle), true);

		// Only an explicit stop does.
		audio.stop_player(handle);
		assert_eq!(audio.is_playing(handle), false);
	}

	#[test]
	fn position_is_gated_on_active_playback() {
		let audio = Audio::new();
		let handle = audio.create_player(RATE).unwrap();
		let shared = audio.shared(handle).unwrap();

		audio.start_playing(handle, None, 0);
		audio.queue_data(handle, pcm(&audio, 500), 500, RATE);
		wait_until(|| audio.get_position(handle) == 500);

		// The head is still at 500 inside the sink, but a paused
		// track reports 0 until it is actively playing again.
		audio.pause_player(handle);
		wait_until(|| !shared.sink.is_active());
		assert_eq!(audio.get_position(handle), 0);

		audio.start_playing(handle, None, 0);
		wait_until(|| shared.sink.is_active());
		assert_eq!(audio.get_position(handle), 500);
	}

	#[test]
	fn stop_is_synchronous_and_conserves_buffers() {
		let audio = Audio::new();
		let handle = audio.create_player(RATE).unwrap();
		let shared = audio.shared(handle).unwrap();

		audio.start_playing(handle, None, 0);
		wait_until(|| shared.sink.is_active());
		for _ in 0..8 {
			audio.queue_data(handle, pcm(&audio, 256), 256, RATE);
		}

		audio.stop_player(handle);

		// Synchronous: silent and empty the moment it returns.
		assert_eq!(shared.sink.is_active(), false);
		assert_eq!(shared.queue.is_empty(), true);
		assert_eq!(audio.is_playing(handle), false);

		// At most one buffer was in the writer's hands mid-stop;
		// every single one ends up back in the pool.
		let pool = Arc::clone(audio.pool());
		wait_until(|| pool.pooled() == pool.created());
	}

	#[test]
	fn stop_then_restart_plays_new_data() {
		let audio = Audio::new();
		let handle = audio.create_player(RATE).unwrap();
		let shared = audio.shared(handle).unwrap();

		audio.start_playing(handle, None, 0);
		audio.queue_data(handle, pcm(&audio, 100), 100, RATE);
		wait_until(|| audio.get_position(handle) == 100);

		audio.stop_player(handle);

		audio.start_playing(handle, None, 0);
		audio.queue_data(handle, pcm(&audio, 40), 40, RATE);
		wait_until(|| shared.queue.is_empty() && audio.get_position(handle) == 140);
	}

	#[test]
	fn delete_never_writes_after_sink_stop() {
		let audio = Audio::new();
		let pool = Arc::clone(audio.pool());
		let handle = audio.create_player(RATE).unwrap();
		let shared = audio.shared(handle).unwrap();

		audio.start_playing(handle, None, 0);
		for _ in 0..16 {
			audio.queue_data(handle, pcm(&audio, 64), 64, RATE);
		}
		audio.delete_player(handle);

		// The handle is dead immediately.
		assert_eq!(audio.is_playing(handle), false);
		assert_eq!(audio.get_position(handle), 0);

		// The writer drains the remainder back to the pool on its own.
		wait_until(|| pool.pooled() == pool.created());

		// Nothing was written to the sink after its final stop.
		let events = shared.sink.events();
		let stop = events.iter().rposition(|e| *e == SinkEvent::Stop).unwrap();
		assert!(!events[stop..].iter().any(|e| matches!(e, SinkEvent::Write(_))));
	}

	#[test]
	fn concurrent_queue_data_and_delete_is_teardown_safe() {
		// Repeated so the producer and the deletion
		// interleave differently across runs.
		for _ in 0..50 {
			let audio = Audio::new();
			let pool = Arc::clone(audio.pool());
			let handle = audio.create_player(RATE).unwrap();
			let shared = audio.shared(handle).unwrap();

			audio.start_playing(handle, None, 0);

			std::thread::scope(|s| {
				// Hammers `queue_data` from another thread while
				// the deletion below races it; submissions landing
				// after the handle dies go straight back to the pool.
				s.spawn(|| {
					for _ in 0..64 {
						audio.queue_data(handle, pcm(&audio, 64), 64, RATE);
					}
				});

				audio.delete_player(handle);
			});

			// Every buffer is recovered no matter where the race landed.
			wait_until(|| pool.pooled() == pool.created());

			// And nothing reached the sink after its final stop.
			let events = shared.sink.events();
			let stop = events.iter().rposition(|e| *e == SinkEvent::Stop).unwrap();
			assert!(!events[stop..].iter().any(|e| matches!(e, SinkEvent::Write(_))));
		}
	}

	#[test]
	fn delete_without_start_recovers_queued_buffers() {
		let audio = Audio::new();
		let pool = Arc::clone(audio.pool());
		let handle = audio.create_player(RATE).unwrap();

		// No writer thread exists yet; deletion
		// itself must return these to the pool.
		audio.queue_data(handle, pcm(&audio, 128), 128, RATE);
		audio.queue_data(handle, pcm(&audio, 128), 128, RATE);
		audio.delete_player(handle);

		assert_eq!(pool.pooled(), pool.created());
	}

	#[test]
	fn synchronized_start_aligns_to_master_position() {
		let audio = Audio::new();
		let master = audio.create_player(RATE).unwrap();
		let slave = audio.create_player(RATE).unwrap();
		let slave_shared = audio.shared(slave).unwrap();

		// Get the master to a known position.
		audio.start_playing(master, None, 0);
		audio.queue_data(master, pcm(&audio, 1000), 1000, RATE);
		wait_until(|| audio.get_position(master) == 1000);

		// Start the slave 250 frames behind the master's head.
		audio.start_playing(slave, Some(master), 250);
		wait_until(|| slave_shared.queue.is_empty() && slave_shared.sink.is_active());

		// Frame 0 of the slave's own data is master position + offset,
		// and the offset was realized as leading silence.
		assert_eq!(slave_shared.sink.origin(), 1250);
		assert_eq!(audio.get_position(slave), 250);

		let events = slave_shared.sink.events();
		let silence: u64 = events
			.iter()
			.take_while(|e| !matches!(e, SinkEvent::Play))
			.filter_map(|e| if let SinkEvent::Write(frames) = e { Some(frames) } else { None })
			.sum();
		assert_eq!(silence, 250);
	}

	#[test]
	fn deleted_master_degrades_to_unsynchronized_start() {
		let audio = Audio::new();
		let master = audio.create_player(RATE).unwrap();
		let slave = audio.create_player(RATE).unwrap();
		let slave_shared = audio.shared(slave).unwrap();

		audio.delete_player(master);

		// The stale master handle is tolerated; the
		// slave simply starts on its own timeline.
		audio.start_playing(slave, Some(master), 500);
		wait_until(|| slave_shared.sink.is_active());

		assert_eq!(slave_shared.sink.origin(), 0);
		assert_eq!(slave_shared.sink.events(), vec![SinkEvent::Play]);
	}

	#[test]
	fn volume_is_forwarded_and_clamped() {
		let audio = Audio::new();
		let handle = audio.create_player(RATE).unwrap();
		let shared = audio.shared(handle).unwrap();

		audio.set_volume(handle, 0.5, 2.0);
		assert_eq!(shared.sink.volume(), Volume::new(0.5, 1.0));
	}

	#[test]
	fn unknown_handles_are_harmless() {
		let audio = Audio::new();
		let pool = Arc::clone(audio.pool());
		let handle = audio.create_player(RATE).unwrap();
		audio.delete_player(handle);

		audio.start_playing(handle, None, 0);
		audio.pause_player(handle);
		audio.stop_player(handle);
		audio.set_volume(handle, 1.0, 1.0);
		audio.delete_player(handle);
		assert_eq!(audio.get_position(handle), 0);
		assert_eq!(audio.is_playing(handle), false);

		// A buffer queued onto a dead handle
		// still goes back to the pool.
		let before = pool.pooled();
		audio.queue_data(handle, audio.allocate(64), 64, RATE);
		assert_eq!(pool.pooled(), before + 1);
	}

	#[test]
	fn allocate_and_deallocate_delegate_to_the_pool() {
		let audio = Audio::new();

		let buffer = audio.allocate(512);
		assert_eq!(buffer.len(), 512);
		assert_eq!(audio.pool().created(), 1);

		audio.deallocate(buffer);
		assert_eq!(audio.pool().pooled(), 1);
	}

	#[test]
	fn handles_are_never_reused() {
		let audio = Audio::new();

		let a = audio.create_player(RATE).unwrap();
		audio.delete_player(a);
		let b = audio.create_player(RATE).unwrap();

		assert!(a != b);
	}
}
