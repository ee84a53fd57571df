//! The public entry point to the pipeline.

mod audio;
pub use audio::{Audio,PlayerHandle};
