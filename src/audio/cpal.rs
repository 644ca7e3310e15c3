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
use std::{fmt, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::{
    renderer::Renderer, thread_priority::AudioThreadPriority, AudioError, OutputFormat,
    SampleFormat, Stream,
};
use crate::{
    audio::Device as AudioDevice,
    config::{self, StreamBufferSize},
    pcm,
};

/// A small wrapper around a cpal::Device. Used for storing the format and scheduling the
/// tone will be played with.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The format the stream is opened with.
    format: OutputFormat,
    /// Scheduling for the callback thread.
    priority: AudioThreadPriority,
    /// Stream buffer size choice.
    stream_buffer_size: StreamBufferSize,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, AudioError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                if let Some(device) = Device::wrap(host_id, device)? {
                    devices.push(device);
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Wraps a cpal device, returning None if it has no outputs.
    fn wrap(host_id: cpal::HostId, device: cpal::Device) -> Result<Option<Device>, AudioError> {
        let output_configs = match device.supported_output_configs() {
            Ok(output_configs) => output_configs,
            Err(_) => return Ok(None),
        };
        let max_channels = output_configs
            .map(|output_config| output_config.channels())
            .max()
            .unwrap_or(0);
        if max_channels == 0 {
            return Ok(None);
        }

        Ok(Some(Device {
            name: device.name()?,
            max_channels,
            host_id,
            device,
            format: OutputFormat::default(),
            priority: AudioThreadPriority::from_config(&config::Audio::default()),
            stream_buffer_size: StreamBufferSize::Default,
        }))
    }

    /// Gets the given cpal device. "default" is the default host's default output.
    pub fn get(config: &config::Audio) -> Result<Device, AudioError> {
        let name = config.device();
        let device = if name == "default" {
            let _shh_stderr = shh::stderr()?;
            let host = cpal::default_host();
            match host.default_output_device() {
                Some(device) => Device::wrap(host.id(), device)?,
                None => None,
            }
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
        };

        match device {
            Some(mut device) => {
                device.format = OutputFormat::new(config.sample_rate(), config.sample_format()?)?;
                device.priority = AudioThreadPriority::from_config(config);
                device.stream_buffer_size = config.stream_buffer_size()?;
                Ok(device)
            }
            None => Err(AudioError::DeviceNotFound(name.to_string())),
        }
    }

    /// Picks the fewest channels the device can open at the sample rate, along with the
    /// buffer size to request. The mono tone is copied to every channel.
    fn stream_config(&self) -> Result<cpal::StreamConfig, AudioError> {
        let rate = cpal::SampleRate(self.format.sample_rate);
        let supported = self
            .device
            .supported_output_configs()?
            .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
            .min_by_key(|range| range.channels())
            .ok_or_else(|| {
                AudioError::UnsupportedFormat(format!(
                    "{} does not support {}Hz",
                    self.name, self.format.sample_rate
                ))
            })?;

        let buffer_size = match (self.stream_buffer_size, supported.buffer_size()) {
            (StreamBufferSize::Default, _) => cpal::BufferSize::Default,
            (StreamBufferSize::Min, cpal::SupportedBufferSize::Range { min, .. }) => {
                cpal::BufferSize::Fixed(*min)
            }
            (StreamBufferSize::Min, cpal::SupportedBufferSize::Unknown) => {
                cpal::BufferSize::Default
            }
            (StreamBufferSize::Fixed(frames), _) => cpal::BufferSize::Fixed(frames),
        };

        Ok(cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: rate,
            buffer_size,
        })
    }
}

/// Builds a stream that renders frames and converts them to the device's sample type.
fn build_stream<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
    priority: AudioThreadPriority,
    convert: F,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    F: Fn(f32) -> T + Send + 'static,
{
    let channels = usize::from(config.channels);
    let mut priority_set = false;
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            priority.configure_current_thread(&mut priority_set);
            renderer.fill_frames(data, channels, &convert);
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

impl AudioDevice for Device {
    fn open(&self, renderer: Renderer) -> Result<Box<dyn Stream>, AudioError> {
        let config = self.stream_config()?;
        let device = self.device.clone();
        let format = self.format;
        let priority = self.priority;
        let name = self.name.clone();

        info!(
            device = self.name,
            format = %format,
            channels = config.channels,
            "Opening output stream."
        );

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        // The cpal stream can't leave the thread that built it, so it lives out its life
        // on a thread of its own.
        let output_thread = thread::Builder::new()
            .name("keysax-output".to_string())
            .spawn(move || {
                let span = span!(Level::INFO, "output stream (cpal)");
                let _enter = span.enter();

                let stream = match format.sample_format {
                    SampleFormat::Int => {
                        build_stream::<i16, _>(&device, &config, renderer, priority, pcm::quantize)
                    }
                    SampleFormat::Float => build_stream::<f32, _>(
                        &device,
                        &config,
                        renderer,
                        priority,
                        |sample: f32| sample.clamp(-1.0, 1.0),
                    ),
                };
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
                info!("CPAL output stream started successfully");
                let _ = ready_tx.send(Ok(()));

                // Blocks until the sender is dropped.
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(OutputStream {
                name,
                stop_tx: Some(stop_tx),
                output_thread: Some(output_thread),
            })),
            Ok(Err(e)) => {
                let _ = output_thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = output_thread.join();
                Err(AudioError::OutputThread(format!(
                    "{} output thread exited before starting",
                    name
                )))
            }
        }
    }

    fn format(&self) -> OutputFormat {
        self.format
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<std::sync::Arc<super::mock::Device>, AudioError> {
        Err(AudioError::DeviceNotFound(format!("{} is not a mock", self)))
    }
}

/// A running cpal stream, held by its output thread.
struct OutputStream {
    name: String,
    stop_tx: Option<crossbeam_channel::Sender<()>>,
    output_thread: Option<thread::JoinHandle<()>>,
}

impl Stream for OutputStream {
    fn close(&mut self) -> Result<(), AudioError> {
        drop(self.stop_tx.take());
        if let Some(output_thread) = self.output_thread.take() {
            output_thread.join().map_err(|_| {
                AudioError::OutputThread(format!("{} output thread panicked", self.name))
            })?;
            info!(device = self.name, "Closed output stream.");
        }
        Ok(())
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
