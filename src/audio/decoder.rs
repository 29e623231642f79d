//! Audio file decoding
//!
//! Loads an audio file into a mono waveform at the analysis sample rate.
//! WAV files are read with `hound`; every other container (MP3, FLAC, OGG,
//! M4A) goes through `symphonia`. Multi-channel audio is averaged down to
//! mono and resampled with a `rubato` sinc resampler when the source rate
//! differs from the target.

use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::Waveform;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Mono samples at their source rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Load `path` as a mono waveform at `config.sample_rate`
///
/// Only the first `config.max_duration_secs` seconds are kept: decoding stops
/// once that much source audio is available, and the resampled signal is
/// truncated again to the exact sample budget.
///
/// # Errors
/// * `Decode` - the file cannot be opened or parsed as audio
/// * `EmptySignal` - the file decodes to zero samples
pub fn load_waveform(path: &Path, config: &AnalysisConfig) -> Result<Waveform, AnalysisError> {
    let decoded = decode_mono(path, Some(config.max_duration_secs))?;
    if decoded.samples.is_empty() {
        return Err(AnalysisError::EmptySignal);
    }

    let samples = resample(&decoded.samples, decoded.sample_rate, config.sample_rate)?;
    let waveform = Waveform::new(samples, config.sample_rate)?.truncated(config.max_samples());
    if waveform.is_empty() {
        return Err(AnalysisError::EmptySignal);
    }

    debug!(
        "[Decoder] Loaded {} ({:.2}s @ {} Hz, source {} Hz)",
        path.display(),
        waveform.duration_secs(),
        waveform.sample_rate(),
        decoded.sample_rate
    );
    Ok(waveform)
}

/// Decode `path` to mono samples at the source sample rate
///
/// When `max_secs` is given, decoding stops after that many seconds of
/// source audio.
pub fn decode_mono(path: &Path, max_secs: Option<f32>) -> Result<DecodedAudio, AnalysisError> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let mut decoded = if is_wav {
        read_wav(path)?
    } else {
        read_compressed(path, max_secs)?
    };

    if let Some(secs) = max_secs {
        let max_frames = (secs.max(0.0) as f64 * decoded.sample_rate as f64) as usize;
        decoded.samples.truncate(max_frames);
    }
    Ok(decoded)
}

fn read_wav(path: &Path) -> Result<DecodedAudio, AnalysisError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| {
        AnalysisError::decode(format!("failed to open {}: {err}", path.display()))
    })?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AnalysisError::decode(format!(
            "{} has an invalid format ({} channels @ {} Hz)",
            path.display(),
            spec.channels,
            spec.sample_rate
        )));
    }

    let read_err =
        |err: hound::Error| AnalysisError::decode(format!("error reading {}: {err}", path.display()));

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(read_err))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            match spec.bits_per_sample {
                8 => reader
                    .samples::<i8>()
                    .map(|sample| sample.map(|v| v as f32 * scale).map_err(read_err))
                    .collect::<Result<Vec<f32>, _>>()?,
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|v| v as f32 * scale).map_err(read_err))
                    .collect::<Result<Vec<f32>, _>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 * scale).map_err(read_err))
                    .collect::<Result<Vec<f32>, _>>()?,
                bits => {
                    return Err(AnalysisError::decode(format!(
                        "unsupported bits_per_sample={} for {}",
                        bits,
                        path.display()
                    )))
                }
            }
        }
    };

    Ok(DecodedAudio {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

fn read_compressed(path: &Path, max_secs: Option<f32>) -> Result<DecodedAudio, AnalysisError> {
    let file = std::fs::File::open(path).map_err(|err| {
        AnalysisError::decode(format!("failed to open {}: {err}", path.display()))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| AnalysisError::decode(format!("failed to probe format: {err}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::decode("no audio track found"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::decode("sample rate not found"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| AnalysisError::decode(format!("failed to create decoder: {err}")))?;

    let max_frames =
        max_secs.map(|secs| (secs.max(0.0) as f64 * sample_rate as f64).ceil() as usize);
    let mut samples = Vec::new();

    loop {
        if max_frames.map_or(false, |max| samples.len() >= max) {
            break;
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => {
                warn!("[Decoder] Error reading packet: {}", err);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend(downmix(buf.samples(), spec.channels.count()));
            }
            Err(SymphoniaError::DecodeError(err)) => {
                warn!("[Decoder] Skipping corrupt packet: {}", err);
            }
            Err(err) => {
                return Err(AnalysisError::decode(format!("decode failed: {err}")));
            }
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Average interleaved frames down to one channel
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample a mono signal from `input_rate` to `output_rate`
///
/// Returns a copy when the rates already match. The sinc filter delay is
/// removed so the output stays time-aligned with the input.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = output_rate as f64 / input_rate as f64;
    let expected = (input.len() as f64 * ratio).ceil() as usize;
    debug!(
        "[Decoder] Resampling {} samples from {} Hz to {} Hz",
        input.len(),
        input_rate,
        output_rate
    );

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let resample_err = |err: String| AnalysisError::decode(format!("resampling failed: {err}"));

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, input.len(), 1)
        .map_err(|err| resample_err(err.to_string()))?;
    let delay = resampler.output_delay();

    let mut output = resampler
        .process(&[input], None)
        .map_err(|err| resample_err(err.to_string()))?
        .swap_remove(0);
    let tail = resampler
        .process_partial(None::<&[&[f32]]>, None)
        .map_err(|err| resample_err(err.to_string()))?
        .swap_remove(0);
    output.extend(tail);

    let mut aligned: Vec<f32> = output.into_iter().skip(delay).collect();
    aligned.truncate(expected);
    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, samples: &[i16], channels: u16, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn tone_i16(frequency: f32, sample_rate: u32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                ((2.0 * std::f32::consts::PI * frequency * t).sin() * 16_000.0) as i16
            })
            .collect()
    }

    #[test]
    fn test_downmix_averages_channels() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.25, 0.75], 1), vec![0.25, 0.75]);
    }

    #[test]
    fn test_wav_at_target_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, &tone_i16(440.0, 22_050, 22_050), 1, 22_050);

        let waveform = load_waveform(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(waveform.sample_rate(), 22_050);
        assert_eq!(waveform.len(), 22_050);
        let expected = 16_000.0 * (2.0 * std::f32::consts::PI * 440.0 / 22_050.0).sin() / 32_768.0;
        assert!((waveform.samples()[1] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_stereo_wav_is_downmixed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames: Vec<i16> = (0..1000).flat_map(|_| [16_384i16, -16_384i16]).collect();
        write_wav(&path, &frames, 2, 22_050);

        let waveform = load_waveform(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(waveform.len(), 1000);
        assert!(waveform.samples().iter().all(|&s| s.abs() < 1e-6));
    }

    #[test]
    fn test_long_wav_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.wav");
        write_wav(&path, &vec![100i16; 22_050 * 3], 1, 22_050);

        let config = AnalysisConfig {
            max_duration_secs: 2.0,
            ..AnalysisConfig::default()
        };
        let waveform = load_waveform(&path, &config).unwrap();
        assert_eq!(waveform.len(), 44_100);
    }

    #[test]
    fn test_wav_is_resampled_to_target_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hires.wav");
        write_wav(&path, &tone_i16(440.0, 44_100, 44_100), 1, 44_100);

        let waveform = load_waveform(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(waveform.sample_rate(), 22_050);
        assert!((waveform.len() as i64 - 22_050).abs() <= 1, "len {}", waveform.len());

        // Amplitude survives resampling away from the edges
        let mid = &waveform.samples()[5_000..17_000];
        let peak = mid.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        assert!((peak - 16_000.0 / 32_768.0).abs() < 0.05, "peak {}", peak);
    }

    #[test]
    fn test_empty_wav_is_empty_signal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, &[], 1, 22_050);

        let err = load_waveform(&path, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err, AnalysisError::EmptySignal);
    }

    #[test]
    fn test_missing_and_garbage_files_fail_to_decode() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.wav");
        assert!(matches!(
            load_waveform(&missing, &AnalysisConfig::default()),
            Err(AnalysisError::Decode { .. })
        ));

        let garbage = dir.path().join("noise.mp3");
        std::fs::write(&garbage, b"definitely not an mp3 stream").unwrap();
        assert!(matches!(
            load_waveform(&garbage, &AnalysisConfig::default()),
            Err(AnalysisError::Decode { .. })
        ));
    }

    #[test]
    fn test_resample_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&input, 22_050, 22_050).unwrap(), input);
    }
}
