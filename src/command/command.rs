//! One action for a player's writer loop.

//---------------------------------------------------------------------------------------------------- Use
use std::sync::Weak;

//---------------------------------------------------------------------------------------------------- PositionSource
/// Read-only access to a player's live device-time position, in frames.
///
/// The writer reads this at the moment a `Play` command _executes_, not
/// at the moment it was enqueued - device playback position only exists
/// once frames have actually been written.
pub(crate) trait PositionSource: Send + Sync {
	/// The current playback head, or `0` if
	/// the sink is not in active playback.
	fn position(&self) -> u64;
}

//---------------------------------------------------------------------------------------------------- MasterRef
/// A non-owning capability handle onto another player's device position.
///
/// Purely a read-only relation, never a lifetime dependency: the master
/// may be deleted at any time, in which case [`MasterRef::position`]
/// returns `None` and the start degrades to an unsynchronized one.
pub(crate) struct MasterRef(Weak<dyn PositionSource>);

impl MasterRef {
	/// Wrap a weak reference to some position source.
	pub(crate) const fn new(source: Weak<dyn PositionSource>) -> Self {
		Self(source)
	}

	/// The master's live position, or `None` if the master is gone.
	pub(crate) fn position(&self) -> Option<u64> {
		self.0.upgrade().map(|source| source.position())
	}
}

impl std::fmt::Debug for MasterRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("MasterRef").finish()
	}
}

//---------------------------------------------------------------------------------------------------- Command
/// One action for a player's writer loop.
///
/// Immutable after construction. Ownership of `Buffer` payloads
/// transfers caller -> queue -> writer -> (on completion) the pool.
///
/// Control commands flow through the same queue as buffer commands,
/// which is what guarantees their ordering relative to each other.
#[derive(Debug)]
pub(crate) enum Command {
	/// Write `data[..valid]` to the device sink,
	/// then release `data` back to the pool.
	Buffer {
		/// The pooled sample buffer. Only the prefix the
		/// caller filled (`valid`) carries meaningful samples.
		data: Vec<i16>,
		/// How many samples of `data` to write.
		valid: usize,
	},

	/// Unpause the sink and start feeding it.
	Play {
		/// If set, align this track's first written frame to the
		/// master's current device position plus `offset`, not to
		/// absolute zero.
		master: Option<MasterRef>,
		/// Frame offset on the master's timeline. Unused without `master`.
		offset: u64,
	},

	/// Pause the sink. Buffered commands after this
	/// accumulate until the next [`Command::Play`].
	Pause,
}
