//! Test helpers shared across helloEx crates.

pub mod memory;
pub mod transcribe;

pub use memory::{FailingBackend, RecordingBackend};
pub use transcribe::{FailingTranscriber, FixedTranscriber};
