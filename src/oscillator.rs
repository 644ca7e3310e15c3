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
use std::f64::consts::TAU;

/// Converts a frequency into the number of cycles the oscillator advances per sample.
#[inline]
pub fn coefficient(frequency: f64, sample_rate: u32) -> f64 {
    frequency / f64::from(sample_rate)
}

/// A sine oscillator that can change frequency without a jump in phase.
///
/// The phase of sample n is `slope * n + offset`, in cycles. Changing the frequency
/// only changes the slope; the offset is recomputed so the phase at the current
/// sample stays where it was.
#[derive(Clone, Debug)]
pub struct PhaseOscillator {
    slope: f64,
    offset: f64,
    samples_emitted: u64,
}

impl PhaseOscillator {
    /// Creates a new oscillator with the given coefficient (cycles per sample).
    pub fn new(coefficient: f64) -> PhaseOscillator {
        PhaseOscillator {
            slope: coefficient,
            offset: 0.0,
            samples_emitted: 0,
        }
    }

    /// The phase, in cycles, of the given sample.
    #[inline]
    pub fn phase_at(&self, sample: u64) -> f64 {
        self.slope * sample as f64 + self.offset
    }

    /// Produces the next sample.
    #[inline]
    pub fn apply(&mut self) -> f32 {
        let sample = (TAU * self.phase_at(self.samples_emitted)).sin();
        self.samples_emitted += 1;
        sample as f32
    }

    /// Switches to a new coefficient, keeping the phase of the next sample unchanged.
    pub fn transition_into(&mut self, coefficient: f64) {
        let n = self.samples_emitted as f64;
        self.offset = self.slope * n + self.offset - coefficient * n;
        self.slope = coefficient;
    }

    /// Takes back samples that were produced but never played, so the next sample
    /// continues from the last one that actually was.
    pub fn rewind(&mut self, samples: u64) {
        self.samples_emitted = self.samples_emitted.saturating_sub(samples);
    }

    /// The current coefficient in cycles per sample.
    pub fn coefficient(&self) -> f64 {
        self.slope
    }

    /// The number of samples produced so far.
    pub fn samples_emitted(&self) -> u64 {
        self.samples_emitted
    }
}
