//! Normalisation of uploaded audio into 16-bit mono PCM
//!
//! Browsers hand us either a RIFF/WAVE file or headerless PCM. Both are
//! reduced to little-endian `i16` samples plus a sample rate, which every
//! speech backend can consume.

use crate::speech::SpeechError;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Decoded mono PCM clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    /// Decode an upload; headerless input is taken as PCM at `default_sample_rate`
    pub fn from_upload(bytes: &[u8], default_sample_rate: u32) -> Result<Self, SpeechError> {
        if bytes.is_empty() {
            return Err(SpeechError::Audio("audio upload is empty".to_string()));
        }

        if is_wav(bytes) {
            Self::from_wav(bytes)
        } else {
            Self::from_raw_pcm(bytes, default_sample_rate)
        }
    }

    fn from_wav(bytes: &[u8]) -> Result<Self, SpeechError> {
        let mut reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| SpeechError::Audio(format!("invalid WAV data: {e}")))?;
        let spec = reader.spec();

        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(SpeechError::Audio(format!(
                "unsupported WAV encoding: {:?} {}-bit",
                spec.sample_format, spec.bits_per_sample
            )));
        }

        let interleaved = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SpeechError::Audio(format!("truncated WAV data: {e}")))?;

        Ok(Self {
            samples: downmix(&interleaved, spec.channels),
            sample_rate: spec.sample_rate,
        })
    }

    fn from_raw_pcm(bytes: &[u8], sample_rate: u32) -> Result<Self, SpeechError> {
        if bytes.len() % 2 != 0 {
            return Err(SpeechError::Audio(
                "raw PCM upload has an odd number of bytes".to_string(),
            ));
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Little-endian PCM bytes
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Encode as a mono 16-bit WAV file
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, SpeechError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| SpeechError::Audio(format!("failed to create WAV writer: {e}")))?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| SpeechError::Audio(format!("failed to write sample: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| SpeechError::Audio(format!("failed to finalize WAV: {e}")))?;
        }
        Ok(cursor.into_inner())
    }
}

fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

fn downmix(interleaved: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}
