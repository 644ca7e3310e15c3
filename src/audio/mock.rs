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
use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::info;

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{renderer::Renderer, AudioError, OutputFormat, Stream};

/// A mock device. Doesn't actually play anything; tests pull samples from it by hand.
#[derive(Clone)]
pub struct Device {
    name: String,
    format: OutputFormat,
    /// The renderer of the open stream, if any.
    renderer: Arc<Mutex<Option<Renderer>>>,
    #[cfg(test)]
    closes: Arc<AtomicUsize>,
}

impl Device {
    /// Gets the given mock device. Devices named "mock-unavailable" fail to open.
    pub fn get(name: &str, format: OutputFormat) -> Device {
        Device {
            name: name.to_string(),
            format,
            renderer: Arc::new(Mutex::new(None)),
            #[cfg(test)]
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns true if a stream is currently open.
    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.renderer.lock().is_some()
    }

    /// Returns how many times a stream has been closed.
    #[cfg(test)]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::Acquire)
    }

    /// Pulls frames from the open stream the way a sound card would. Returns nothing if
    /// the stream is closed.
    #[cfg(test)]
    pub fn pull(&self, frames: usize) -> Vec<f32> {
        match self.renderer.lock().as_mut() {
            Some(renderer) => {
                let mut out = vec![0.0; frames];
                renderer.fill(&mut out);
                out
            }
            None => Vec::new(),
        }
    }
}

impl super::Device for Device {
    fn open(&self, renderer: Renderer) -> Result<Box<dyn Stream>, AudioError> {
        if self.name == "mock-unavailable" {
            return Err(AudioError::DeviceNotFound(self.name.clone()));
        }

        info!(device = self.name, format = %self.format, "Opened mock stream.");
        *self.renderer.lock() = Some(renderer);
        Ok(Box::new(MockStream {
            device: self.clone(),
        }))
    }

    fn format(&self) -> OutputFormat {
        self.format
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, AudioError> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

struct MockStream {
    device: Device,
}

impl Stream for MockStream {
    fn close(&mut self) -> Result<(), AudioError> {
        if self.device.renderer.lock().take().is_some() {
            info!(device = self.device.name, "Closed mock stream.");
            #[cfg(test)]
            self.device.closes.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::{
        renderer::{voice, RenderSettings, VoiceCommand},
        Device as _,
    };

    #[test]
    fn test_open_pull_close() {
        let device = Device::get("mock", OutputFormat::default());
        let (voice, renderer) = voice(&RenderSettings::default());
        let mut stream = device.open(renderer).unwrap();
        assert!(device.is_open());

        voice.send(VoiceCommand::GateOn {
            frequency: 440.0,
            volume: 1.0,
        });
        let samples = device.pull(512);
        assert_eq!(512, samples.len());
        assert!(samples.iter().any(|sample| *sample != 0.0));

        stream.close().unwrap();
        stream.close().unwrap();
        assert!(!device.is_open());
        assert_eq!(1, device.closes());
        assert!(device.pull(512).is_empty());
    }

    #[test]
    fn test_unavailable() {
        let device = Device::get("mock-unavailable", OutputFormat::default());
        let (_voice, renderer) = voice(&RenderSettings::default());
        assert!(matches!(
            device.open(renderer),
            Err(AudioError::DeviceNotFound(_))
        ));
    }
}
