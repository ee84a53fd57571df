//! Process-wide pool of reusable PCM sample buffers.

//---------------------------------------------------------------------------------------------------- Use
use crate::macros::trace2;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize,Ordering};

//---------------------------------------------------------------------------------------------------- BufferPool
/// A pool of reusable 16-bit PCM sample buffers.
///
/// Buffers are keyed only by capacity - [`BufferPool::allocate`] hands
/// out the first pooled buffer big enough for the request, or constructs
/// a fresh one if none fits. [`BufferPool::release`] puts a buffer back.
///
/// At steady-state playback (~10 buffers a second) every `allocate`
/// is served from the pool, so the hot path never touches the heap.
/// "First adequate" rather than "best fit" trades a little waste for a
/// linear scan instead of a sorted structure, which is fine because the
/// pool stays bounded by the number of in-flight buffers (typically < 10).
///
/// One pool is shared by all players; it is created by (or handed to)
/// [`Audio`](crate::Audio) and passed into each player at construction,
/// so tests can instantiate isolated pools.
#[derive(Debug,Default)]
pub struct BufferPool {
	/// Previously-used buffers, no ordering requirement.
	buffers: Mutex<Vec<Vec<i16>>>,
	/// How many buffers this pool ever constructed.
	///
	/// INVARIANT: every one of them is either free in
	/// `buffers` or owned by exactly one in-flight command.
	created: AtomicUsize,
}

impl BufferPool {
	#[cold]
	#[inline(never)]
	/// Create a new, empty [`BufferPool`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Take a buffer with `len >= min_len` out of the pool.
	///
	/// The first pooled buffer with sufficient capacity wins; its prefix
	/// is zeroed and its length set to exactly `min_len` (the underlying
	/// capacity may be larger). If no pooled buffer fits, a fresh one of
	/// exactly `min_len` is constructed.
	///
	/// This never fails.
	pub fn allocate(&self, min_len: usize) -> Vec<i16> {
		let mut buffers = self.buffers.lock();

		for i in 0..buffers.len() {
			if buffers[i].capacity() >= min_len {
				let mut buffer = buffers.swap_remove(i);
				drop(buffers);

				trace2!("BufferPool - allocate({min_len}), reusing capacity: {}", buffer.capacity());
				buffer.clear();
				buffer.resize(min_len, 0);
				return buffer;
			}
		}
		drop(buffers);

		trace2!("BufferPool - allocate({min_len}), constructing fresh");
		self.created.fetch_add(1, Ordering::Relaxed);
		vec![0; min_len]
	}

	/// Put `buffer` back into the pool.
	///
	/// No capacity check, no dedup - a buffer can be released
	/// even if it was never fully used. Buffers never shrink.
	pub fn release(&self, buffer: Vec<i16>) {
		trace2!("BufferPool - release, capacity: {}", buffer.capacity());
		self.buffers.lock().push(buffer);
	}

	#[must_use]
	/// How many buffers are currently sitting free in the pool.
	pub fn pooled(&self) -> usize {
		self.buffers.lock().len()
	}

	#[must_use]
	/// How many buffers this pool has ever constructed.
	///
	/// `created() - pooled()` is the number of buffers currently in flight.
	pub fn created(&self) -> usize {
		self.created.load(Ordering::Relaxed)
	}
}
