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

//! Translates button states into pitches.
//!
//! Pitches are handled in semitones relative to A4 until the very end, so modifier
//! keys that cancel each other out (flat and sharp, octave down and octave up) give
//! back exactly the same frequency.

use std::collections::HashMap;

use tracing::debug;

use crate::buttons::{Button, ButtonState, NoteButtons, NOTE_BUTTONS};

/// Concert pitch in Hz.
pub const A4_HZ: f64 = 440.0;

pub const C5_SHARP: i32 = 4;
pub const C5: i32 = 3;
pub const B4: i32 = 2;
pub const A4: i32 = 0;
pub const G4: i32 = -2;
pub const F4: i32 = -4;
pub const E4: i32 = -5;
pub const D4: i32 = -7;
pub const C4: i32 = -9;

/// The pitch used when no fingering can be recognized even after clearing every
/// pressed note button. C#5 is the open fingering and the highest note playable
/// without modifier keys.
pub const EXHAUSTED_FALLBACK: i32 = C5_SHARP;

/// The standard fingerings, as the note buttons that have to be pressed.
const STANDARD_FINGERINGS: &[(&[Button], i32)] = &[
    (&[Button::L2], C5),
    (&[Button::L1], B4),
    (&[Button::L1, Button::L2], A4),
    (&[Button::L1, Button::L2, Button::L3], G4),
    (&[Button::L1, Button::L2, Button::L3, Button::R1], F4),
    (
        &[Button::L1, Button::L2, Button::L3, Button::R1, Button::R2],
        E4,
    ),
    (
        &[
            Button::L1,
            Button::L2,
            Button::L3,
            Button::R1,
            Button::R2,
            Button::R3,
        ],
        D4,
    ),
    (
        &[
            Button::L1,
            Button::L2,
            Button::L3,
            Button::R1,
            Button::R2,
            Button::R3,
            Button::R4,
        ],
        C4,
    ),
];

/// Modifier keys and their offsets, in the order they are applied.
const MODIFIERS: [(Button, i32); 4] = [
    (Button::Flat, -1),
    (Button::Sharp, 1),
    (Button::OctaveDown, -12),
    (Button::OctaveUp, 12),
];

/// Converts an equal tempered interval into a frequency ratio.
pub fn semitones_to_ratio(semitones: i32) -> f64 {
    2f64.powf(f64::from(semitones) / 12.0)
}

/// Converts a number of semitones from A4 into Hz.
pub fn semitones_to_hz(semitones: i32) -> f64 {
    A4_HZ * semitones_to_ratio(semitones)
}

/// How a button state was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// No note buttons are pressed.
    Silent,
    /// The note buttons match a fingering exactly.
    Exact { semitones: i32 },
    /// The fingering matched after releasing the given number of pressed buttons,
    /// starting from the bottom of the instrument.
    Degraded { semitones: i32, cleared: usize },
    /// Nothing matched before every pressed button was released.
    Exhausted,
}

impl Resolution {
    /// The base pitch in semitones from A4, before modifiers. None means silence.
    pub fn base(&self) -> Option<i32> {
        match self {
            Resolution::Silent => None,
            Resolution::Exact { semitones } | Resolution::Degraded { semitones, .. } => {
                Some(*semitones)
            }
            Resolution::Exhausted => Some(EXHAUSTED_FALLBACK),
        }
    }
}

/// Maps exact note button combinations to pitches.
pub struct FingeringTable {
    fingerings: HashMap<NoteButtons, i32>,
}

impl FingeringTable {
    /// Creates a table from button lists.
    pub fn new(fingerings: &[(&[Button], i32)]) -> FingeringTable {
        FingeringTable {
            fingerings: fingerings
                .iter()
                .map(|(buttons, semitones)| (ButtonState::pressed(buttons).notes(), *semitones))
                .collect(),
        }
    }

    /// The standard saxophone fingerings.
    pub fn standard() -> FingeringTable {
        FingeringTable::new(STANDARD_FINGERINGS)
    }

    /// Looks up an exact combination of note buttons.
    pub fn get(&self, notes: &NoteButtons) -> Option<i32> {
        self.fingerings.get(notes).copied()
    }

    /// Returns every fingering in the table, lowest pitch first.
    pub fn sorted(&self) -> Vec<(NoteButtons, i32)> {
        let mut fingerings: Vec<(NoteButtons, i32)> = self
            .fingerings
            .iter()
            .map(|(notes, semitones)| (*notes, *semitones))
            .collect();
        fingerings.sort_by_key(|(_, semitones)| *semitones);
        fingerings
    }

    /// Works out which fingering the note buttons in the state represent. When there
    /// is no exact match, pressed buttons are released one at a time from the bottom
    /// of the instrument up until a fingering matches.
    pub fn resolve_detailed(&self, state: &ButtonState) -> Resolution {
        let mut notes = state.notes();
        if notes.iter().all(|pressed| !pressed) {
            return Resolution::Silent;
        }
        if let Some(semitones) = self.get(&notes) {
            return Resolution::Exact { semitones };
        }

        let mut cleared = 0;
        for i in (0..NOTE_BUTTONS).rev() {
            if !notes[i] {
                continue;
            }
            notes[i] = false;
            cleared += 1;

            // Releasing everything doesn't count as a fingering.
            if notes.iter().all(|pressed| !pressed) {
                break;
            }
            if let Some(semitones) = self.get(&notes) {
                return Resolution::Degraded { semitones, cleared };
            }
        }
        Resolution::Exhausted
    }

    /// Returns the frequency in Hz the instrument plays for the given state, or 0 for
    /// silence.
    pub fn resolve(&self, state: &ButtonState) -> f64 {
        let resolution = self.resolve_detailed(state);
        let base = match resolution {
            Resolution::Silent => return 0.0,
            Resolution::Exact { semitones } => semitones,
            Resolution::Degraded { semitones, cleared } => {
                debug!(state = %state, cleared, "Unrecognized fingering, released buttons.");
                semitones
            }
            Resolution::Exhausted => {
                debug!(state = %state, "Unrecognized fingering, using fallback pitch.");
                EXHAUSTED_FALLBACK
            }
        };

        let offset: i32 = MODIFIERS
            .iter()
            .filter(|(button, _)| state.is_pressed(*button))
            .map(|(_, semitones)| semitones)
            .sum();
        semitones_to_hz(base + offset)
    }
}

impl Default for FingeringTable {
    fn default() -> Self {
        FingeringTable::standard()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn hz(semitones: i32) -> f64 {
        semitones_to_hz(semitones)
    }

    #[test]
    fn test_tabulated_fingerings() {
        let table = FingeringTable::standard();
        for (buttons, semitones) in STANDARD_FINGERINGS {
            let state = ButtonState::pressed(buttons);
            assert_eq!(hz(*semitones), table.resolve(&state), "{}", state);
            assert_eq!(
                Resolution::Exact {
                    semitones: *semitones
                },
                table.resolve_detailed(&state)
            );
        }
        assert_eq!(A4_HZ, table.resolve(&ButtonState::pressed(&[Button::L1, Button::L2])));
    }

    #[test]
    fn test_reference_pitches() {
        let table = FingeringTable::standard();
        let g4 = table.resolve(&ButtonState::pressed(&[Button::L1, Button::L2, Button::L3]));
        assert!((g4 - 392.0).abs() < 0.01, "{}", g4);
        let c4 = table.resolve(&ButtonState::pressed(&Button::NOTES));
        assert!((c4 - 261.63).abs() < 0.01, "{}", c4);
    }

    #[test]
    fn test_all_released_is_silent() {
        let table = FingeringTable::standard();
        assert_eq!(0.0, table.resolve(&ButtonState::default()));

        // Modifiers don't make anything audible on their own.
        let all_modifiers = ButtonState::pressed(&[
            Button::Flat,
            Button::Sharp,
            Button::OctaveDown,
            Button::OctaveUp,
        ]);
        assert_eq!(0.0, table.resolve(&all_modifiers));
        assert_eq!(0.0, table.resolve(&ButtonState::pressed(&[Button::OctaveUp])));
        assert_eq!(Resolution::Silent, table.resolve_detailed(&all_modifiers));
    }

    #[test]
    fn test_modifiers() {
        let table = FingeringTable::standard();
        let a4 = [Button::L1, Button::L2];
        let with = |modifiers: &[Button]| {
            let mut buttons = a4.to_vec();
            buttons.extend_from_slice(modifiers);
            table.resolve(&ButtonState::pressed(&buttons))
        };

        assert_eq!(hz(-1), with(&[Button::Flat]));
        assert_eq!(hz(1), with(&[Button::Sharp]));
        assert_eq!(220.0, with(&[Button::OctaveDown]));
        assert_eq!(880.0, with(&[Button::OctaveUp]));
        assert_eq!(hz(13), with(&[Button::Sharp, Button::OctaveUp]));
        assert_eq!(hz(-13), with(&[Button::Flat, Button::OctaveDown]));
    }

    #[test]
    fn test_inverse_modifiers_cancel() {
        let table = FingeringTable::standard();
        for (buttons, _) in STANDARD_FINGERINGS {
            let plain = table.resolve(&ButtonState::pressed(buttons));

            let mut flat_sharp = ButtonState::pressed(buttons);
            flat_sharp.set(Button::Flat, true);
            flat_sharp.set(Button::Sharp, true);
            assert_eq!(plain, table.resolve(&flat_sharp));

            let mut octaves = ButtonState::pressed(buttons);
            octaves.set(Button::OctaveDown, true);
            octaves.set(Button::OctaveUp, true);
            assert_eq!(plain, table.resolve(&octaves));
        }
    }

    #[test]
    fn test_degrades_from_the_bottom() {
        let table = FingeringTable::standard();

        // G4 plus a stray R4: releasing R4 gives G4.
        let state = ButtonState::pressed(&[Button::L1, Button::L2, Button::L3, Button::R4]);
        assert_eq!(
            Resolution::Degraded {
                semitones: G4,
                cleared: 1
            },
            table.resolve_detailed(&state)
        );
        assert_eq!(hz(G4), table.resolve(&state));

        // L1, L3 and R3: releasing R3 then L3 leaves B4.
        let state = ButtonState::pressed(&[Button::L1, Button::L3, Button::R3]);
        assert_eq!(
            Resolution::Degraded {
                semitones: B4,
                cleared: 2
            },
            table.resolve_detailed(&state)
        );

        // Modifiers still apply to degraded fingerings.
        let state = ButtonState::pressed(&[Button::L1, Button::L3, Button::OctaveUp]);
        assert_eq!(hz(B4 + 12), table.resolve(&state));
    }

    #[test]
    fn test_degradation_exhausted() {
        // This is the open behavior for fingerings that never match: the fallback
        // pitch, not silence.
        let table = FingeringTable::standard();
        let state = ButtonState::pressed(&[Button::L3]);
        assert_eq!(Resolution::Exhausted, table.resolve_detailed(&state));
        assert_eq!(Some(EXHAUSTED_FALLBACK), Resolution::Exhausted.base());
        assert_eq!(hz(EXHAUSTED_FALLBACK), table.resolve(&state));

        let state = ButtonState::pressed(&[Button::L2, Button::L3, Button::R2]);
        assert_eq!(
            Resolution::Degraded {
                semitones: C5,
                cleared: 2
            },
            table.resolve_detailed(&state)
        );
    }

    #[test]
    fn test_every_combination_terminates() {
        let table = FingeringTable::standard();
        for bits in 0u32..(1 << NOTE_BUTTONS) {
            let mut state = ButtonState::default();
            for (i, button) in Button::NOTES.iter().enumerate() {
                state.set(*button, bits & (1 << i) != 0);
            }
            let pressed = bits.count_ones() as usize;
            match table.resolve_detailed(&state) {
                Resolution::Silent => assert_eq!(0, pressed),
                Resolution::Exact { semitones } => {
                    assert_eq!(Some(semitones), table.get(&state.notes()))
                }
                Resolution::Degraded { cleared, .. } => {
                    assert!(cleared >= 1 && cleared < pressed, "{}", state)
                }
                Resolution::Exhausted => assert!(pressed >= 1),
            }
            let pitch = table.resolve(&state);
            assert!(pitch.is_finite() && pitch >= 0.0);
        }
    }

    #[test]
    fn test_sorted() {
        let table = FingeringTable::standard();
        let sorted = table.sorted();
        assert_eq!(STANDARD_FINGERINGS.len(), sorted.len());
        assert_eq!(C4, sorted[0].1);
        assert_eq!(C5, sorted[sorted.len() - 1].1);
    }
}
