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
use std::{any::Any, fmt, sync::Arc};

use crate::config;

pub mod cpal;
pub mod error;
pub mod format;
pub mod mock;
pub mod raw;
pub mod renderer;
pub mod thread_priority;

pub use error::AudioError;
pub use format::{OutputFormat, SampleFormat};

use renderer::Renderer;

/// Something that can consume the rendered tone. Opening a device hands it the renderer,
/// which it pulls samples from until the returned stream is closed.
pub trait Device: Any + fmt::Display + std::marker::Send + std::marker::Sync {
    /// Acquires the output and starts pulling from the renderer.
    fn open(&self, renderer: Renderer) -> Result<Box<dyn Stream>, AudioError>;

    /// The format the device will be opened with.
    fn format(&self) -> OutputFormat;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, AudioError>;
}

/// An open output. Closing releases the device; closing twice is a no-op.
pub trait Stream: std::marker::Send {
    fn close(&mut self) -> Result<(), AudioError>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, AudioError> {
    cpal::Device::list()
}

/// Gets the device described by the config. Names starting with "mock" give a mock
/// device, "raw:<path>" writes PCM to a file ("raw:-" for stdout), and anything else is
/// looked up through cpal.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, AudioError> {
    let device = config.device();
    let format = OutputFormat::new(config.sample_rate(), config.sample_format()?)?;

    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device, format)));
    }
    if let Some(target) = device.strip_prefix("raw:") {
        return Ok(Arc::new(raw::Device::get(target, config)?));
    }

    Ok(Arc::new(cpal::Device::get(config)?))
}
