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

//! The voice as seen from the audio callback.
//!
//! The renderer is moved into the sink's callback and owns the oscillator from then
//! on. The playback side talks to it through [Voice], which queues commands the
//! renderer picks up at the start of each callback, and reads back [VoiceStatus].

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    config,
    fingering::A4_HZ,
    oscillator::{coefficient, PhaseOscillator},
    smoothing::MovingAverage,
};

const DEFAULT_BLOCK_SIZE: usize = 256;
const DEFAULT_DECLICK: usize = 64;

/// A change to the voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoiceCommand {
    /// Start sounding at the given pitch.
    GateOn { frequency: f64, volume: f32 },
    /// Change pitch while sounding.
    Retune { frequency: f64, volume: f32 },
    /// Stop sounding.
    GateOff,
}

/// How the renderer produces samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Frames rendered from the oscillator at a time.
    pub block_size: usize,
    /// Length of the gain ramp on gate changes, in samples.
    pub declick: usize,
    /// Moving average window over the output. Disabled below 2.
    pub smoothing: usize,
}

impl RenderSettings {
    /// Builds render settings from the audio configuration.
    pub fn from_config(config: &config::Audio) -> RenderSettings {
        RenderSettings {
            sample_rate: config.sample_rate(),
            block_size: config.block_size(),
            declick: config.declick(),
            smoothing: config.smoothing(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            sample_rate: super::format::DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            declick: DEFAULT_DECLICK,
            smoothing: 0,
        }
    }
}

/// State shared between the playback controller and the renderer.
#[derive(Debug, Default)]
pub struct VoiceStatus {
    /// Whether the controller has the gate open.
    gate: AtomicBool,
    /// The frequency the controller last asked for, as f64 bits.
    frequency: AtomicU64,
    /// Whether the renderer is still producing sound, including release ramps.
    sounding: AtomicBool,
    /// Frames handed to the sink so far.
    frames_rendered: AtomicU64,
    /// Notes the playback controller has been given, silent ones included.
    notes_applied: AtomicU64,
}

impl VoiceStatus {
    /// Returns true while the controller has the gate open.
    pub fn is_gated(&self) -> bool {
        self.gate.load(Ordering::Acquire)
    }

    /// Returns the frequency last asked for, or 0 once gated off.
    pub fn frequency(&self) -> f64 {
        f64::from_bits(self.frequency.load(Ordering::Acquire))
    }

    /// Returns true while the renderer is producing sound, release ramp included.
    pub fn is_sounding(&self) -> bool {
        self.sounding.load(Ordering::Acquire)
    }

    /// Returns the number of frames handed to the sink so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }

    /// Returns the number of notes the playback controller has been given.
    pub fn notes_applied(&self) -> u64 {
        self.notes_applied.load(Ordering::Acquire)
    }

    pub(crate) fn record_note(&self) {
        self.notes_applied.fetch_add(1, Ordering::AcqRel);
    }

    fn set_gate(&self, gate: bool, frequency: f64) {
        self.frequency.store(frequency.to_bits(), Ordering::Release);
        self.gate.store(gate, Ordering::Release);
    }
}

/// The playback controller's end of the voice.
pub struct Voice {
    commands: Sender<VoiceCommand>,
    status: Arc<VoiceStatus>,
}

impl Voice {
    /// Queues a command for the renderer. Never blocks. Returns false if the renderer
    /// is gone.
    pub fn send(&self, command: VoiceCommand) -> bool {
        match command {
            VoiceCommand::GateOn { frequency, .. } | VoiceCommand::Retune { frequency, .. } => {
                self.status.set_gate(true, frequency)
            }
            VoiceCommand::GateOff => self.status.set_gate(false, 0.0),
        }
        self.commands.send(command).is_ok()
    }

    /// The shared voice status.
    pub fn status(&self) -> &Arc<VoiceStatus> {
        &self.status
    }
}

/// Creates a voice and the renderer that plays it.
pub fn voice(settings: &RenderSettings) -> (Voice, Renderer) {
    let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
    let status = Arc::new(VoiceStatus::default());
    (
        Voice {
            commands: commands_tx,
            status: status.clone(),
        },
        Renderer::new(settings, commands_rx, status),
    )
}

/// Moves from towards to by at most distance.
#[inline]
fn ramp(from: f32, to: f32, distance: f32) -> f32 {
    if from < to {
        (from + distance).min(to)
    } else {
        (from - distance).max(to)
    }
}

/// Produces the voice's samples inside the audio callback. Nothing here blocks or
/// allocates after construction.
pub struct Renderer {
    sample_rate: u32,
    commands: Receiver<VoiceCommand>,
    status: Arc<VoiceStatus>,
    oscillator: PhaseOscillator,
    /// Samples rendered ahead of the sink.
    block: Vec<f32>,
    /// The next sample in the block to hand out.
    cursor: usize,
    /// Whether the oscillator produced the current block.
    block_voiced: bool,
    /// Gain of the first sample in the current block.
    block_gain: f32,
    /// Gain of the first sample in the next block.
    next_gain: f32,
    /// Gain the ramp is heading towards.
    target_gain: f32,
    /// Gain change per sample.
    ramp_step: f32,
    smoother: Option<MovingAverage>,
}

impl Renderer {
    fn new(
        settings: &RenderSettings,
        commands: Receiver<VoiceCommand>,
        status: Arc<VoiceStatus>,
    ) -> Renderer {
        let block_size = settings.block_size.max(1);
        Renderer {
            sample_rate: settings.sample_rate,
            commands,
            status,
            oscillator: PhaseOscillator::new(coefficient(A4_HZ, settings.sample_rate)),
            block: vec![0.0; block_size],
            // Start with an exhausted block so the first sample renders one.
            cursor: block_size,
            block_voiced: false,
            block_gain: 0.0,
            next_gain: 0.0,
            target_gain: 0.0,
            ramp_step: 1.0 / settings.declick.max(1) as f32,
            smoother: MovingAverage::new(settings.smoothing),
        }
    }

    /// The sample rate the renderer was created for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fills a mono buffer.
    pub fn fill(&mut self, out: &mut [f32]) {
        self.fill_frames(out, 1, |sample| sample);
    }

    /// Fills an interleaved buffer, writing the voice to every channel of each frame.
    pub fn fill_frames<T, F>(&mut self, data: &mut [T], channels: usize, convert: F)
    where
        T: Copy,
        F: Fn(f32) -> T,
    {
        self.apply_commands();

        let channels = channels.max(1);
        let mut frames = 0;
        for frame in data.chunks_mut(channels) {
            let sample = convert(self.next_sample());
            frame.fill(sample);
            frames += 1;
        }

        self.status.sounding.store(
            self.upcoming_gain() > 0.0 || self.target_gain > 0.0,
            Ordering::Release,
        );
        self.status
            .frames_rendered
            .fetch_add(frames, Ordering::AcqRel);
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if self.cursor >= self.block.len() {
            self.render_block();
        }
        let sample = self.block[self.cursor];
        self.cursor += 1;

        match self.smoother.as_mut() {
            Some(smoother) => smoother.process(sample),
            None => sample,
        }
    }

    /// The gain of the given sample in the current block.
    #[inline]
    fn gain_at(&self, index: usize) -> f32 {
        ramp(self.block_gain, self.target_gain, self.ramp_step * index as f32)
    }

    /// The gain of the next sample to be handed out.
    fn upcoming_gain(&self) -> f32 {
        if self.cursor < self.block.len() {
            self.gain_at(self.cursor)
        } else {
            self.next_gain
        }
    }

    fn render_block(&mut self) {
        self.block_gain = self.next_gain;
        self.next_gain = self.gain_at(self.block.len());
        self.cursor = 0;

        // Fully released: leave the oscillator alone until the next gate on.
        if self.block_gain == 0.0 && self.target_gain == 0.0 {
            self.block.fill(0.0);
            self.block_voiced = false;
            return;
        }

        for i in 0..self.block.len() {
            self.block[i] = self.oscillator.apply() * self.gain_at(i);
        }
        self.block_voiced = true;
    }

    /// Drops whatever is left of the current block and takes those samples back from
    /// the oscillator, so the next command takes effect on the very next sample played.
    fn discard_unplayed(&mut self) {
        let unplayed = self.block.len() - self.cursor;
        if unplayed == 0 {
            return;
        }
        if self.block_voiced {
            self.oscillator.rewind(unplayed as u64);
        }
        self.next_gain = self.gain_at(self.cursor);
        self.cursor = self.block.len();
    }

    fn apply_commands(&mut self) {
        let mut discarded = false;
        while let Ok(command) = self.commands.try_recv() {
            if !discarded {
                self.discard_unplayed();
                discarded = true;
            }
            self.apply(command);
        }
    }

    fn apply(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::GateOn { frequency, volume }
            | VoiceCommand::Retune { frequency, volume } => {
                self.oscillator
                    .transition_into(coefficient(frequency, self.sample_rate));
                self.target_gain = volume.clamp(0.0, 1.0);
            }
            VoiceCommand::GateOff => self.target_gain = 0.0,
        }
    }
}
