//! Ordered, thread-safe queue of [`Command`]'s.

//---------------------------------------------------------------------------------------------------- Use
use crate::command::Command;
use crate::macros::trace2;
use crate::pool::BufferPool;
use parking_lot::{Condvar,Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool,Ordering};

//---------------------------------------------------------------------------------------------------- CommandQueue
/// FIFO queue of [`Command`]'s with blocking wait/notify semantics.
///
/// One per player, shared between the caller thread (producer) and the
/// writer thread (consumer). Bounded only by memory.
///
/// INVARIANT: commands are dequeued in the exact order they were
/// enqueued - no reordering, no priority. A `Pause` must never be
/// applied before a `Buffer` enqueued earlier, and a `Play` must see
/// exactly the buffers queued up to that point as pre-roll.
#[derive(Debug,Default)]
pub(crate) struct CommandQueue {
	commands: Mutex<VecDeque<Command>>,
	ready:    Condvar,
}

impl CommandQueue {
	/// Create a new, empty [`CommandQueue`].
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Append `command` to the tail and wake one waiting consumer.
	pub(crate) fn push(&self, command: Command) {
		trace2!("CommandQueue - push: {command:?}");
		self.commands.lock().push_back(command);
		self.ready.notify_one();
	}

	/// Block until the queue is non-empty, then remove and return the head.
	///
	/// Returns `None` only when `running` is false _and_ the queue is
	/// empty - a teardown [`Self::wake`] with commands still pending
	/// keeps handing them out first, so nothing is lost.
	///
	/// Robust to spurious wakeups (emptiness is re-checked in a loop).
	pub(crate) fn pop_blocking(&self, running: &AtomicBool) -> Option<Command> {
		let mut commands = self.commands.lock();
		loop {
			if let Some(command) = commands.pop_front() {
				return Some(command);
			}
			if !running.load(Ordering::Acquire) {
				return None;
			}
			// The lock is released while waiting.
			self.ready.wait(&mut commands);
		}
	}

	/// Wake every waiting consumer. Used only for teardown.
	pub(crate) fn wake(&self) {
		self.ready.notify_all();
	}

	/// Remove every pending command, returning
	/// `Buffer` payloads to `pool`.
	///
	/// The caller observes an empty queue on return; no buffer is
	/// ever dropped, which keeps the pool's accounting exact.
	pub(crate) fn drain_into(&self, pool: &BufferPool) {
		let mut commands = self.commands.lock();
		trace2!("CommandQueue - drain_into, pending: {}", commands.len());

		for command in commands.drain(..) {
			if let Command::Buffer { data, .. } = command {
				pool.release(data);
			}
		}
	}

	/// Is the queue currently empty?
	pub(crate) fn is_empty(&self) -> bool {
		self.commands.lock().is_empty()
	}
}

//---------------------------------------------------------------------------------------------------- TESTS
#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use std::sync::Arc;
	use std::sync::atomic::AtomicBool;

	fn buffer(tag: i16) -> Command {
		Command::Buffer { data: vec![tag; 4], valid: 4 }
	}

	#[test]
	fn fifo_order() {
		let queue = CommandQueue::new();
		let running = AtomicBool::new(true);

		queue.push(buffer(1));
		queue.push(Command::Pause);
		queue.push(buffer(2));

		assert!(matches!(queue.pop_blocking(&running), Some(Command::Buffer { valid: 4, .. })));
		assert!(matches!(queue.pop_blocking(&running), Some(Command::Pause)));
		assert!(matches!(queue.pop_blocking(&running), Some(Command::Buffer { .. })));
		assert_eq!(queue.is_empty(), true);
	}

	#[test]
	fn blocking_consumer_wakes_on_push() {
		let queue = Arc::new(CommandQueue::new());
		let running = Arc::new(AtomicBool::new(true));

		let consumer = {
			let queue = Arc::clone(&queue);
			let running = Arc::clone(&running);
			std::thread::spawn(move || {
				// Hangs until the producer below pushes.
				queue.pop_blocking(&running)
			})
		};

		std::thread::sleep(std::time::Duration::from_millis(10));
		queue.push(buffer(7));

		let command = consumer.join().unwrap();
		assert!(matches!(command, Some(Command::Buffer { .. })));
	}

	#[test]
	fn teardown_wake_returns_none_when_empty() {
		let queue = Arc::new(CommandQueue::new());
		let running = Arc::new(AtomicBool::new(true));

		let consumer = {
			let queue = Arc::clone(&queue);
			let running = Arc::clone(&running);
			std::thread::spawn(move || queue.pop_blocking(&running))
		};

		std::thread::sleep(std::time::Duration::from_millis(10));
		running.store(false, Ordering::Release);
		queue.wake();

		assert!(consumer.join().unwrap().is_none());
	}

	#[test]
	fn pending_commands_survive_teardown_wake() {
		let queue = CommandQueue::new();
		let running = AtomicBool::new(false);

		// Even with `running` false, a pending command is handed out.
		queue.push(buffer(3));
		assert!(queue.pop_blocking(&running).is_some());
		assert!(queue.pop_blocking(&running).is_none());
	}

	#[test]
	fn drain_returns_buffers_to_pool() {
		let queue = CommandQueue::new();
		let pool = BufferPool::new();

		queue.push(Command::Buffer { data: pool.allocate(16), valid: 16 });
		queue.push(Command::Pause);
		queue.push(Command::Buffer { data: pool.allocate(32), valid: 8 });
		assert_eq!(pool.created(), 2);
		assert_eq!(pool.pooled(), 0);

		queue.drain_into(&pool);
		assert_eq!(queue.is_empty(), true);
		assert_eq!(pool.pooled(), 2);
	}
}
