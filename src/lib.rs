//! PCM audio-output pipeline.
//!
//! `pcmflow` moves pre-rendered 16-bit PCM sample buffers from an
//! application thread to an audio device sink.
//!
//! Each player owns an ordered command queue and a dedicated writer
//! thread that drains it; sample buffers are recycled through a shared
//! [`BufferPool`] so steady-state playback performs no per-call heap
//! allocation. The public entry point is [`Audio`].
//!
//! This crate does no mixing, decoding, or resampling - samples go in,
//! samples come out.

//---------------------------------------------------------------------------------------------------- Lints
#![allow(
	clippy::len_zero,
	clippy::type_complexity,
	clippy::module_inception,
)]

#![deny(
	nonstandard_style,
	deprecated,
	missing_docs,
)]

#![forbid(
	unused_mut,
	unused_unsafe,
	future_incompatible,
	break_with_label_and_loop,
	coherence_leak_check,
	duplicate_macro_attributes,
	for_loops_over_fallibles,
	large_assignments,
	overlapping_range_endpoints,
	semicolon_in_expressions_from_macros,
	redundant_semicolons,
	unconditional_recursion,
	unreachable_patterns,
	unused_allocation,
	unused_braces,
	unused_comparisons,
	unused_doc_comments,
	unused_parens,
	unused_labels,
	while_true,
	keyword_idents,
	non_ascii_idents,
	noop_method_call,
)]

//---------------------------------------------------------------------------------------------------- Public API
mod audio;
pub use audio::{Audio,PlayerHandle};

mod pool;
pub use pool::BufferPool;

mod volume;
pub use volume::Volume;

mod error;
pub use error::SinkError;

//---------------------------------------------------------------------------------------------------- Private Usage
mod command;
mod player;
mod sink;

mod macros;

#[cfg(test)]
mod tests;

//----------------------------------------------------------------------------------------------------
