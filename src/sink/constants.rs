//! Shared constants used for device sinks.

// Not every backend is compiled at once,
// so some of these go unused per-config.
#![allow(dead_code)]

//----------------------------------------------------------------------------------------------- Constants
/// How many milliseconds of audio sit between `write()` and the
/// device callback. 100ms of pre-buffer keeps a briefly-stalled
/// producer from audibly underrunning.
pub(super) const SINK_MILLISECOND_BUFFER: usize = 100;

/// How many device-sink events the dummy backend remembers.
///
/// Bounded so a headless fallback build does not grow without limit.
pub(super) const EVENT_LOG_LEN: usize = 1024;
