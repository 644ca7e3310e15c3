// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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

use std::{fmt, str::FromStr};

use super::AudioError;

/// The default output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Sample format handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 16-bit signed integer samples.
    Int,
    /// 32-bit float samples, for hardware that won't take integers.
    Float,
}

impl FromStr for SampleFormat {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float" | "Float" => Ok(SampleFormat::Float),
            "int" | "Int" => Ok(SampleFormat::Int),
            _ => Err(AudioError::UnsupportedFormat(format!(
                "unknown sample format {}",
                s
            ))),
        }
    }
}

impl SampleFormat {
    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Float => "float",
            SampleFormat::Int => "int",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The mono format the voice is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Sample format (integer or float)
    pub sample_format: SampleFormat,
}

impl OutputFormat {
    /// Creates a new OutputFormat
    pub fn new(sample_rate: u32, sample_format: SampleFormat) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::UnsupportedFormat(
                "sample rate must be greater than 0".to_string(),
            ));
        }

        Ok(OutputFormat {
            sample_rate,
            sample_format,
        })
    }
}

impl Default for OutputFormat {
    /// 44.1kHz, 16-bit integer.
    fn default() -> Self {
        OutputFormat {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_format: SampleFormat::Int,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz {}", self.sample_rate, self.sample_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_from_str() {
        assert_eq!(
            SampleFormat::from_str("float").unwrap(),
            SampleFormat::Float
        );
        assert_eq!(
            SampleFormat::from_str("Float").unwrap(),
            SampleFormat::Float
        );
        assert_eq!(SampleFormat::from_str("int").unwrap(), SampleFormat::Int);
        assert_eq!(SampleFormat::from_str("Int").unwrap(), SampleFormat::Int);
    }

    #[test]
    fn test_sample_format_from_str_invalid() {
        assert!(SampleFormat::from_str("invalid").is_err());
        assert!(SampleFormat::from_str("").is_err());
        assert!(SampleFormat::from_str("double").is_err());
    }

    #[test]
    fn test_output_format_new() {
        let format = OutputFormat::new(48000, SampleFormat::Float).unwrap();
        assert_eq!(format.sample_rate, 48000);
        assert_eq!(format.sample_format, SampleFormat::Float);
        assert_eq!("48000Hz float", format.to_string());

        assert!(OutputFormat::new(0, SampleFormat::Int).is_err());
    }

    #[test]
    fn test_output_format_default() {
        let format = OutputFormat::default();
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.sample_format, SampleFormat::Int);
    }
}
