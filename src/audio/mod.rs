// Audio module - file decoding, resampling and preview playback

pub mod decoder;
pub mod playback;
mod waveform;

// Re-export commonly used types for convenience
pub use decoder::{load_waveform, resample, DecodedAudio};
pub use playback::{spawn_preview, PlaybackHandle};
pub use waveform::Waveform;
