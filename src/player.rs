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
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    audio::{
        self,
        renderer::{self, RenderSettings, Voice, VoiceCommand, VoiceStatus},
        AudioError,
    },
    note::Note,
};

/// Extra time allowed for the sink to pull the release ramp on shutdown.
const RELEASE_SLACK: Duration = Duration::from_millis(50);
const RELEASE_POLL: Duration = Duration::from_millis(1);

/// Turns notes into gate and pitch changes on an open audio stream.
pub struct Playback {
    /// The renderer's command queue.
    voice: Voice,
    /// The open stream. None once shut down.
    stream: Option<Box<dyn audio::Stream>>,
    /// Whether a voice is active.
    gate: bool,
    /// How long to wait for the release ramp before closing the stream.
    release_timeout: Duration,
}

impl Playback {
    /// Acquires the device and starts the stream, silent until the first note.
    pub fn open(device: &dyn audio::Device, settings: RenderSettings) -> Result<Playback, AudioError> {
        let (voice, renderer) = renderer::voice(&settings);
        let stream = device.open(renderer)?;
        info!(device = %device, "Playback started.");

        let release_frames = (settings.declick.max(1) + settings.block_size.max(1)) as f64;
        Ok(Playback {
            voice,
            stream: Some(stream),
            gate: false,
            release_timeout: Duration::from_secs_f64(
                release_frames / f64::from(settings.sample_rate.max(1)),
            ) + RELEASE_SLACK,
        })
    }

    /// Applies a coalesced note. A silent note closes the gate, a note while silent opens
    /// it, and a note while sounding only changes pitch.
    pub fn apply(&mut self, note: Note) {
        self.voice.status().record_note();
        self.play(note);
    }

    fn play(&mut self, note: Note) {
        let command = match (note.is_silent(), self.gate) {
            (true, false) => return,
            (true, true) => VoiceCommand::GateOff,
            (false, false) => VoiceCommand::GateOn {
                frequency: note.frequency,
                volume: note.volume,
            },
            (false, true) => VoiceCommand::Retune {
                frequency: note.frequency,
                volume: note.volume,
            },
        };

        debug!(note = %note, command = ?command, "Applying note.");
        if !self.voice.send(command) {
            warn!(note = %note, "Audio stream is gone, dropping note.");
        }
        self.gate = !note.is_silent();
    }

    /// Returns true if a voice is active.
    pub fn is_gated(&self) -> bool {
        self.gate
    }

    /// The voice status as reported by the renderer.
    pub fn status(&self) -> Arc<VoiceStatus> {
        self.voice.status().clone()
    }

    /// Gates off, gives the sink a bounded amount of time to play the release ramp, then
    /// releases the device. Blocks until the device is released.
    pub fn shutdown(&mut self) -> Result<(), AudioError> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => return Ok(()),
        };

        self.play(Note::SILENCE);
        let deadline = Instant::now() + self.release_timeout;
        while self.voice.status().is_sounding() && Instant::now() < deadline {
            thread::sleep(RELEASE_POLL);
        }

        stream.close()?;
        info!("Playback stopped.");
        Ok(())
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(err = %e, "Unable to close audio stream.");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::{mock, OutputFormat};

    fn settings() -> RenderSettings {
        RenderSettings {
            block_size: 64,
            declick: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_gate_transitions() {
        let device = mock::Device::get("mock", OutputFormat::default());
        let mut playback = Playback::open(&device, settings()).unwrap();
        let status = playback.status();
        assert!(!playback.is_gated());

        // Silence while silent does nothing.
        playback.apply(Note::SILENCE);
        assert!(!playback.is_gated());
        assert!(!status.is_gated());

        playback.apply(Note::new(440.0, 1.0));
        assert!(playback.is_gated());
        assert!(status.is_gated());
        assert_eq!(440.0, status.frequency());
        assert!(device.pull(128).iter().any(|sample| *sample != 0.0));

        playback.apply(Note::new(392.0, 1.0));
        assert!(playback.is_gated());
        assert_eq!(392.0, status.frequency());

        playback.apply(Note::new(0.0, 1.0));
        assert!(!playback.is_gated());
        assert!(!status.is_gated());
        let released = device.pull(256);
        assert!(released[64..].iter().all(|sample| *sample == 0.0));
        assert_eq!(4, status.notes_applied());

        playback.shutdown().unwrap();
        assert_eq!(4, status.notes_applied());
    }

    #[test]
    fn test_retune_is_continuous() {
        let device = mock::Device::get("mock", OutputFormat::default());
        let mut playback = Playback::open(&device, settings()).unwrap();

        playback.apply(Note::new(440.0, 1.0));
        let before = device.pull(100);
        playback.apply(Note::new(466.16, 1.0));
        let after = device.pull(100);

        // A sine near 450Hz at 44.1kHz moves at most about 0.065 per sample.
        let jump = (after[0] - before[99]).abs();
        assert!(jump < 0.1, "discontinuity of {} at retune", jump);
    }

    #[test]
    fn test_shutdown_releases_device() {
        let device = mock::Device::get("mock", OutputFormat::default());
        let mut playback = Playback::open(&device, settings()).unwrap();
        playback.apply(Note::new(440.0, 1.0));
        assert!(device.is_open());

        playback.shutdown().unwrap();
        assert!(!device.is_open());
        assert!(!playback.is_gated());
        assert!(!playback.status().is_gated());

        playback.shutdown().unwrap();
        drop(playback);
        assert_eq!(1, device.closes());
    }

    #[test]
    fn test_drop_releases_device() {
        let device = mock::Device::get("mock", OutputFormat::default());
        let playback = Playback::open(&device, settings()).unwrap();
        drop(playback);
        assert!(!device.is_open());
    }

    #[test]
    fn test_open_failure() {
        let device = mock::Device::get("mock-unavailable", OutputFormat::default());
        assert!(matches!(
            Playback::open(&device, settings()),
            Err(AudioError::DeviceNotFound(_))
        ));
    }
}
