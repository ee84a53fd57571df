//! Per-player writer commands and their ordered queue.

mod command;
pub(crate) use command::{Command,MasterRef,PositionSource};

mod queue;
pub(crate) use queue::CommandQueue;
