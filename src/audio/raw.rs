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
use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use tracing::{error, info, span, warn, Level};

use super::{
    renderer::Renderer, thread_priority::AudioThreadPriority, AudioError, OutputFormat,
    SampleFormat, Stream,
};
use crate::{config, pcm};

/// Where the raw PCM goes.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Target {
    Stdout,
    File(PathBuf),
}

/// A device that writes signed 16-bit little-endian mono PCM at the output rate,
/// suitable for piping into aplay or sox.
pub struct Device {
    target: Target,
    format: OutputFormat,
    /// Frames rendered and written per write.
    period: usize,
    priority: AudioThreadPriority,
}

impl Device {
    /// Gets a raw device writing to the given target, "-" meaning stdout.
    pub fn get(target: &str, config: &config::Audio) -> Result<Device, AudioError> {
        if target.is_empty() {
            return Err(AudioError::DeviceNotFound("raw:".to_string()));
        }
        if config.sample_format()? == SampleFormat::Float {
            warn!("Raw output is always 16-bit integer, ignoring float sample format");
        }

        Ok(Device {
            target: if target == "-" {
                Target::Stdout
            } else {
                Target::File(PathBuf::from(target))
            },
            format: OutputFormat::new(config.sample_rate(), SampleFormat::Int)?,
            period: config.block_size(),
            priority: AudioThreadPriority::from_config(config),
        })
    }

    fn writer(&self) -> Result<Box<dyn Write + Send>, AudioError> {
        Ok(match &self.target {
            Target::Stdout => Box::new(BufWriter::new(io::stdout())),
            Target::File(path) => Box::new(BufWriter::new(File::create(path)?)),
        })
    }
}

impl super::Device for Device {
    fn open(&self, mut renderer: Renderer) -> Result<Box<dyn Stream>, AudioError> {
        let mut writer = self.writer()?;
        let running = Arc::new(AtomicBool::new(true));
        let period = self.period;
        let sample_rate = self.format.sample_rate;
        let priority = self.priority;
        let name = self.to_string();

        info!(device = name, format = %self.format, period, "Opening raw PCM output.");

        let thread_running = running.clone();
        let thread = thread::Builder::new()
            .name("keysax-raw-output".to_string())
            .spawn(move || -> Result<(), AudioError> {
                let span = span!(Level::INFO, "raw output");
                let _enter = span.enter();

                let mut priority_set = false;
                let mut samples = vec![0.0f32; period];
                let mut bytes = Vec::with_capacity(period * 2);
                let started = Instant::now();
                let mut frames: u64 = 0;

                while thread_running.load(Ordering::Acquire) {
                    priority.configure_current_thread(&mut priority_set);

                    renderer.fill(&mut samples);
                    bytes.clear();
                    pcm::encode(&samples, &mut bytes);
                    writer.write_all(&bytes)?;
                    frames += period as u64;

                    // Keep to real time so gate changes are heard when they happen.
                    let due = started
                        + Duration::from_secs_f64(frames as f64 / f64::from(sample_rate));
                    let now = Instant::now();
                    if due > now {
                        spin_sleep::sleep(due - now);
                    }
                }

                writer.flush()?;
                Ok(())
            })?;

        Ok(Box::new(RawStream {
            name,
            running,
            thread: Some(thread),
        }))
    }

    fn format(&self) -> OutputFormat {
        self.format
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, AudioError> {
        Err(AudioError::DeviceNotFound(format!("{} is not a mock", self)))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Stdout => write!(f, "stdout (Raw PCM)"),
            Target::File(path) => write!(f, "{} (Raw PCM)", path.display()),
        }
    }
}

struct RawStream {
    name: String,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<(), AudioError>>>,
}

impl Stream for RawStream {
    fn close(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Release);
        let thread = match self.thread.take() {
            Some(thread) => thread,
            None => return Ok(()),
        };

        match thread.join() {
            Ok(Ok(())) => {
                info!(device = self.name, "Closed raw PCM output.");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(device = self.name, err = %e, "Raw PCM output failed.");
                Err(e)
            }
            Err(_) => Err(AudioError::OutputThread(format!(
                "{} output thread panicked",
                self.name
            ))),
        }
    }
}

impl Drop for RawStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::audio::{
        renderer::{voice, RenderSettings, VoiceCommand},
        Device as _,
    };

    #[test]
    fn test_target() {
        let config = config::Audio::new("raw:-");
        assert_eq!(Target::Stdout, Device::get("-", &config).unwrap().target);
        assert_eq!(
            Target::File(PathBuf::from("/tmp/out.pcm")),
            Device::get("/tmp/out.pcm", &config).unwrap().target
        );
        assert!(matches!(
            Device::get("", &config),
            Err(AudioError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_writes_pcm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pcm");
        let config = config::Audio::new("raw");
        let device = Device::get(path.to_str().unwrap(), &config).unwrap();

        let settings = RenderSettings {
            block_size: 64,
            ..Default::default()
        };
        let (voice, renderer) = voice(&settings);
        voice.send(VoiceCommand::GateOn {
            frequency: 440.0,
            volume: 1.0,
        });

        let mut stream = device.open(renderer).unwrap();
        thread::sleep(Duration::from_millis(50));
        stream.close().unwrap();
        stream.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(0, bytes.len() % (device.period * 2));
        assert!(bytes
            .chunks_exact(2)
            .any(|sample| i16::from_le_bytes([sample[0], sample[1]]) != 0));
    }
}
