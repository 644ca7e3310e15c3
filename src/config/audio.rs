// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::str::FromStr;

use serde::Deserialize;

use super::error::ConfigError;
use crate::audio::SampleFormat;

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BLOCK_SIZE: usize = 256;
const DEFAULT_DECLICK: usize = 64;
const DEFAULT_THREAD_PRIORITY: u8 = 70;

/// How to choose the stream buffer size (period size). Affects latency vs underrun tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamBufferSize {
    /// Use the backend's default (may be high latency on some systems).
    Default,
    /// Use the device's minimum supported period size (lowest latency, most jitter-sensitive).
    Min,
    /// Use a fixed size in frames.
    Fixed(u32),
}

impl FromStr for StreamBufferSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" => Ok(StreamBufferSize::Default),
            "min" => Ok(StreamBufferSize::Min),
            frames => match frames.parse::<u32>() {
                Ok(frames) if frames > 0 => Ok(StreamBufferSize::Fixed(frames)),
                _ => Err(ConfigError::Invalid {
                    field: "audio.stream_buffer_size",
                    reason: format!("expected default, min or a frame count, got {}", s),
                }),
            },
        }
    }
}

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The audio device. "default" for the host's default output, "raw:<path>" to
    /// write PCM to a file ("raw:-" for stdout), or "mock" for a device that plays nothing.
    device: Option<String>,

    /// Output sample rate in Hz (default: 44100)
    sample_rate: Option<u32>,

    /// Output sample format, "int" (16-bit) or "float" (default: "int")
    sample_format: Option<String>,

    /// Frames rendered from the oscillator at a time (default: 256)
    block_size: Option<usize>,

    /// Stream buffer: "default" (backend default), "min" (lowest latency), or a number (frames).
    stream_buffer_size: Option<String>,

    /// Length of the gain ramp applied when the gate opens or closes, in samples (default: 64)
    declick: Option<usize>,

    /// Moving average window applied to the output, in samples. 0 disables (default: 0)
    smoothing: Option<usize>,

    /// Priority of the audio thread, 0-99 (default: 70)
    thread_priority: Option<u8>,

    /// Whether to try realtime (SCHED_FIFO) scheduling for the audio thread (default: true)
    realtime: Option<bool>,
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            ..Default::default()
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the output sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the output sample format (default: Int)
    pub fn sample_format(&self) -> Result<SampleFormat, ConfigError> {
        match self.sample_format.as_deref() {
            Some(format) => SampleFormat::from_str(format).map_err(|e| ConfigError::Invalid {
                field: "audio.sample_format",
                reason: e.to_string(),
            }),
            None => Ok(SampleFormat::Int),
        }
    }

    /// Returns the oscillator block size in frames (default: 256)
    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE).max(1)
    }

    /// Returns the stream buffer size choice (default/min/fixed).
    pub fn stream_buffer_size(&self) -> Result<StreamBufferSize, ConfigError> {
        match self.stream_buffer_size.as_deref() {
            Some(size) => StreamBufferSize::from_str(size),
            None => Ok(StreamBufferSize::Default),
        }
    }

    /// Returns the gate ramp length in samples (default: 64)
    pub fn declick(&self) -> usize {
        self.declick.unwrap_or(DEFAULT_DECLICK)
    }

    /// Returns the smoothing window in samples (default: disabled)
    pub fn smoothing(&self) -> usize {
        self.smoothing.unwrap_or(0)
    }

    /// Returns the audio thread priority, capped at 99 (default: 70)
    pub fn thread_priority(&self) -> u8 {
        self.thread_priority
            .unwrap_or(DEFAULT_THREAD_PRIORITY)
            .min(99)
    }

    /// Returns whether realtime scheduling should be attempted (default: true)
    pub fn realtime(&self) -> bool {
        self.realtime.unwrap_or(true)
    }
}

#[cfg(test)]
mod test {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_defaults() {
        let audio = Audio::default();
        assert_eq!("default", audio.device());
        assert_eq!(44100, audio.sample_rate());
        assert_eq!(SampleFormat::Int, audio.sample_format().unwrap());
        assert_eq!(256, audio.block_size());
        assert_eq!(StreamBufferSize::Default, audio.stream_buffer_size().unwrap());
        assert_eq!(64, audio.declick());
        assert_eq!(0, audio.smoothing());
        assert_eq!(70, audio.thread_priority());
        assert!(audio.realtime());
    }

    #[test]
    fn test_deserialize() {
        let yaml = r#"
            device: mock-device
            sample_rate: 48000
            sample_format: float
            block_size: 128
            stream_buffer_size: min
            declick: 0
            smoothing: 4
            thread_priority: 120
            realtime: false
        "#;

        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!("mock-device", audio.device());
        assert_eq!(48000, audio.sample_rate());
        assert_eq!(SampleFormat::Float, audio.sample_format().unwrap());
        assert_eq!(128, audio.block_size());
        assert_eq!(StreamBufferSize::Min, audio.stream_buffer_size().unwrap());
        assert_eq!(0, audio.declick());
        assert_eq!(4, audio.smoothing());
        assert_eq!(99, audio.thread_priority());
        assert!(!audio.realtime());
    }

    #[test]
    fn test_stream_buffer_size() {
        assert_eq!(
            StreamBufferSize::Fixed(512),
            StreamBufferSize::from_str("512").unwrap()
        );
        assert!(StreamBufferSize::from_str("0").is_err());
        assert!(StreamBufferSize::from_str("lots").is_err());
    }

    #[test]
    fn test_invalid_sample_format() {
        let audio = Audio {
            sample_format: Some("double".to_string()),
            ..Default::default()
        };
        assert!(audio.sample_format().is_err());
    }
}
