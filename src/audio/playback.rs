// Playback module - audible preview of the file being classified
//
// The preview runs on its own thread so that a missing device or a slow
// decode never delays or fails the prediction. The thread decodes the file
// independently, resamples it to the device rate and feeds a cpal output
// stream until the preview is exhausted or cancelled. Completion (or the
// failure) is reported once through a oneshot channel.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tokio::sync::oneshot;

use super::decoder::{decode_mono, resample};
use crate::error::{log_playback_error, PlaybackError};

/// How often the playback thread checks for completion or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extra time a device gets to drain the preview before it is stopped
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Mono preview samples shared with the audio callback
#[derive(Debug, Clone)]
pub struct PreviewSource {
    samples: Arc<Vec<f32>>,
    position: Arc<AtomicUsize>,
}

impl PreviewSource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: Arc::new(samples),
            position: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fill an interleaved output buffer, duplicating the mono signal into
    /// every channel and writing silence once the preview is exhausted
    pub fn fill<T>(&self, data: &mut [T], channels: usize)
    where
        T: Sample + FromSample<f32>,
    {
        let channels = channels.max(1);
        let mut pos = self.position.load(Ordering::Relaxed);
        for frame in data.chunks_mut(channels) {
            let value = T::from_sample(self.samples.get(pos).copied().unwrap_or(0.0));
            frame.iter_mut().for_each(|s| *s = value);
            if pos < self.samples.len() {
                pos += 1;
            }
        }
        self.position.store(pos, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.position.load(Ordering::Relaxed) >= self.samples.len()
    }
}

/// Handle to a running preview
///
/// Dropping the handle cancels the preview.
pub struct PlaybackHandle {
    cancel: Arc<AtomicBool>,
    done: Option<oneshot::Receiver<Result<(), PlaybackError>>>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    /// Stop playback early; the thread exits at its next poll
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the preview finishes, is cancelled or fails
    pub fn wait(mut self) -> Result<(), PlaybackError> {
        let result = match self.done.take() {
            Some(done) => done.blocking_recv().unwrap_or_else(|_| {
                Err(PlaybackError::StreamFailed {
                    reason: "playback thread exited without reporting".to_string(),
                })
            }),
            None => Ok(()),
        };
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        result
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start playing the first `seconds` of `path` in the background
///
/// Failures are logged at warn level and reported through `wait()`; they
/// never affect classification.
pub fn spawn_preview(path: &Path, seconds: f32) -> PlaybackHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = oneshot::channel();
    let path: PathBuf = path.to_path_buf();
    let thread_cancel = Arc::clone(&cancel);

    let thread = thread::Builder::new()
        .name("genre-preview".to_string())
        .spawn(move || {
            let result = play(&path, seconds, &thread_cancel);
            if let Err(err) = &result {
                log_playback_error(err, "spawn_preview");
            }
            let _ = tx.send(result);
        });

    let thread = match thread {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!("[Playback] Could not start preview thread: {}", err);
            None
        }
    };

    PlaybackHandle {
        cancel,
        done: Some(rx),
        thread,
    }
}

fn play(path: &Path, seconds: f32, cancel: &AtomicBool) -> Result<(), PlaybackError> {
    let decoded = decode_mono(path, Some(seconds)).map_err(|err| PlaybackError::Decode {
        reason: err.to_string(),
    })?;
    if decoded.samples.is_empty() {
        return Err(PlaybackError::Decode {
            reason: format!("{} contains no audio", path.display()),
        });
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(PlaybackError::NoOutputDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| PlaybackError::StreamFailed {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;
    let stream_config: cpal::StreamConfig = config.clone().into();
    let channels = stream_config.channels as usize;

    let samples = resample(
        &decoded.samples,
        decoded.sample_rate,
        stream_config.sample_rate.0,
    )
    .map_err(|err| PlaybackError::Decode {
        reason: err.to_string(),
    })?;
    let length = Duration::from_secs_f64(
        samples.len() as f64 / stream_config.sample_rate.0.max(1) as f64,
    );
    let source = PreviewSource::new(samples);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, source.clone()),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, source.clone()),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, source.clone()),
        other => {
            return Err(PlaybackError::StreamFailed {
                reason: format!("unsupported output sample format {:?}", other),
            })
        }
    }
    .map_err(|e| PlaybackError::StreamFailed {
        reason: format!("{:?}", e),
    })?;

    stream.play().map_err(|e| PlaybackError::StreamFailed {
        reason: format!("{:?}", e),
    })?;
    tracing::info!(
        "[Playback] Playing {:.1}s preview of {} at {} Hz",
        seconds,
        path.display(),
        stream_config.sample_rate.0
    );

    let deadline = Instant::now() + length + DRAIN_GRACE;
    while !source.is_finished() && !cancel.load(Ordering::Relaxed) {
        if Instant::now() >= deadline {
            tracing::warn!("[Playback] Output device stalled; stopping preview");
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if cancel.load(Ordering::Relaxed) {
        tracing::debug!("[Playback] Preview cancelled");
    }
    Ok(())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    source: PreviewSource,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| source.fill(data, channels),
        |err| tracing::warn!("[Playback] Output stream error: {}", err),
        None,
    )
}
