//! Speech playback for assistant replies.
//!
//! Synthesized audio arrives as mono PCM16 from the TTS provider. This module
//! owns the cpal output stream and a per-message audio cache so replaying a
//! message never hits the network twice. At most one message plays at a time;
//! pausing keeps the stream alive so playback resumes where it left off.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig};
use rankchat_core::providers::tts::SynthesizedAudio;

/// Audio cache and playback state for the chat session.
///
/// cpal streams are not `Send`, so this lives on the event loop thread and is
/// driven through effects.
pub struct SpeechController {
    cache: HashMap<String, Arc<SynthesizedAudio>>,
    playback: Option<Playback>,
}

struct Playback {
    message_id: String,
    // Held for its side effect: dropping the stream stops output.
    _stream: Stream,
    shared: Arc<PlaybackShared>,
}

/// State shared with the audio callback.
struct PlaybackShared {
    cursor: AtomicUsize,
    finished: AtomicBool,
}

impl SpeechController {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            playback: None,
        }
    }

    /// True when audio for this message has already been synthesized.
    pub fn has_audio(&self, message_id: &str) -> bool {
        self.cache.contains_key(message_id)
    }

    /// Caches synthesized audio for a message.
    pub fn store(&mut self, message_id: &str, audio: SynthesizedAudio) {
        self.cache.insert(message_id.to_string(), Arc::new(audio));
    }

    /// Starts or resumes playback for a message.
    ///
    /// Resumes in place when the message is already loaded into the stream;
    /// otherwise any current playback is dropped and a fresh stream starts
    /// from the beginning of the cached audio.
    pub fn play(&mut self, message_id: &str) -> Result<()> {
        if let Some(playback) = &self.playback
            && playback.message_id == message_id
            && !playback.shared.finished.load(Ordering::Relaxed)
        {
            playback._stream.play().context("Failed to resume audio playback")?;
            return Ok(());
        }

        let audio = self
            .cache
            .get(message_id)
            .cloned()
            .ok_or_else(|| anyhow!("No synthesized audio cached for message"))?;

        self.playback = None;
        let playback = start_stream(message_id, &audio)?;
        self.playback = Some(playback);
        Ok(())
    }

    /// Pauses the current playback, keeping its position.
    pub fn pause(&mut self) -> Result<()> {
        if let Some(playback) = &self.playback {
            playback._stream.pause().context("Failed to pause audio playback")?;
        }
        Ok(())
    }

    /// Stops playback and drops cached audio.
    ///
    /// With a message id only that message is torn down; without one the whole
    /// controller resets (session switch or exit).
    pub fn teardown(&mut self, message_id: Option<&str>) {
        match message_id {
            Some(id) => {
                if self.playback.as_ref().is_some_and(|p| p.message_id == id) {
                    self.playback = None;
                }
                self.cache.remove(id);
            }
            None => {
                self.playback = None;
                self.cache.clear();
            }
        }
    }

    /// Returns the id of a playback that ran to the end of its samples, once.
    pub fn poll_finished(&mut self) -> Option<String> {
        let finished = self
            .playback
            .as_ref()
            .is_some_and(|p| p.shared.finished.load(Ordering::Relaxed));
        if finished {
            self.playback.take().map(|p| p.message_id)
        } else {
            None
        }
    }
}

impl Default for SpeechController {
    fn default() -> Self {
        Self::new()
    }
}

fn start_stream(message_id: &str, audio: &Arc<SynthesizedAudio>) -> Result<Playback> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No audio output device available"))?;

    let samples = Arc::new(samples_from_pcm16(&audio.pcm));
    let shared = Arc::new(PlaybackShared {
        cursor: AtomicUsize::new(0),
        finished: AtomicBool::new(false),
    });

    let config = StreamConfig {
        channels: 1,
        sample_rate: SampleRate(audio.sample_rate),
        buffer_size: BufferSize::Default,
    };

    let cb_samples = Arc::clone(&samples);
    let cb_shared = Arc::clone(&shared);
    let stream = device
        .build_output_stream(
            &config,
            move |out: &mut [f32], _| {
                let mut pos = cb_shared.cursor.load(Ordering::Relaxed);
                for slot in out.iter_mut() {
                    *slot = cb_samples.get(pos).copied().unwrap_or(0.0);
                    pos += 1;
                }
                if pos >= cb_samples.len() {
                    cb_shared.finished.store(true, Ordering::Relaxed);
                }
                cb_shared.cursor.store(pos, Ordering::Relaxed);
            },
            move |err| {
                tracing::debug!(error = %err, "audio stream error");
            },
            None,
        )
        .context("Failed to build audio output stream")?;

    stream.play().context("Failed to start audio playback")?;

    Ok(Playback {
        message_id: message_id.to_string(),
        _stream: stream,
        shared,
    })
}

/// Converts little-endian PCM16 bytes to f32 samples in [-1, 1].
fn samples_from_pcm16(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / f32::from(i16::MAX).abs())
        .collect()
}

/// Writes synthesized audio to a WAV file (mono PCM16).
pub fn write_wav(path: &Path, audio: &SynthesizedAudio) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file at {}", path.display()))?;
    for pair in audio.pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_from_samples(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn pcm16_decodes_to_unit_range() {
        let pcm = pcm_from_samples(&[0, i16::MAX, i16::MIN, 16384]);
        let samples = samples_from_pcm16(&pcm);
        assert_eq!(samples.len(), 4);
        assert!((samples[0] - 0.0).abs() < f32::EPSILON);
        assert!((samples[1] - 1.0).abs() < 1e-4);
        assert!(samples[2] <= -1.0 && samples[2] > -1.001);
        assert!((samples[3] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        let samples = samples_from_pcm16(&[0, 0, 7]);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn wav_roundtrip_preserves_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        let audio = SynthesizedAudio {
            pcm: pcm_from_samples(&[100, -200, 300, -400]),
            sample_rate: 24_000,
        };

        write_wav(&path, &audio).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![100, -200, 300, -400]);
    }

    #[test]
    fn cache_tracks_stored_audio() {
        let mut speech = SpeechController::new();
        assert!(!speech.has_audio("m1"));

        speech.store(
            "m1",
            SynthesizedAudio {
                pcm: vec![0, 0],
                sample_rate: 24_000,
            },
        );
        assert!(speech.has_audio("m1"));

        speech.teardown(Some("m1"));
        assert!(!speech.has_audio("m1"));

        speech.store(
            "m2",
            SynthesizedAudio {
                pcm: vec![0, 0],
                sample_rate: 24_000,
            },
        );
        speech.teardown(None);
        assert!(!speech.has_audio("m2"));
    }
}
