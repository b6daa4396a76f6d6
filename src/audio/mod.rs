pub mod backend;
pub mod file;
pub mod slicer;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use file::{AudioFile, FileBackend};
pub use slicer::{encode_wav, AudioSlice, AudioSlicer, SliceConfig};
