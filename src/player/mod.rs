//! One device sink + command queue + writer thread.

mod player;
pub(crate) use player::{Player,PlayerShared};

mod writer;
pub(crate) use writer::Writer;
