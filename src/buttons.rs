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

//! Button state for the fingering controller.
//!
//! The layout follows a Roland Aerophone Mini: seven note buttons counted from
//! the top of the instrument and four auxiliary buttons.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use serde::Deserialize;

/// The number of note buttons.
pub const NOTE_BUTTONS: usize = 7;

/// The number of auxiliary buttons.
pub const AUX_BUTTONS: usize = 4;

/// The note buttons, pressed or not, from the top of the instrument down.
pub type NoteButtons = [bool; NOTE_BUTTONS];

/// A logical button on the instrument.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    /// Left hand, first finger. Pressing only this plays a B4.
    L1,
    /// Left hand, second finger.
    L2,
    /// Left hand, third finger.
    L3,
    /// Right hand, first finger.
    R1,
    /// Right hand, second finger.
    R2,
    /// Right hand, third finger.
    R3,
    /// Right hand, fourth finger.
    R4,
    /// Lowers the pitch by a semitone.
    Flat,
    /// Raises the pitch by a semitone.
    Sharp,
    /// Lowers the pitch by an octave.
    OctaveDown,
    /// Raises the pitch by an octave.
    OctaveUp,
}

/// Where a button lives in the button state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Note(usize),
    Aux(usize),
}

impl Button {
    /// Every button, note buttons first in instrument order.
    pub const ALL: [Button; NOTE_BUTTONS + AUX_BUTTONS] = [
        Button::L1,
        Button::L2,
        Button::L3,
        Button::R1,
        Button::R2,
        Button::R3,
        Button::R4,
        Button::Flat,
        Button::Sharp,
        Button::OctaveDown,
        Button::OctaveUp,
    ];

    /// The note buttons in instrument order.
    pub const NOTES: [Button; NOTE_BUTTONS] = [
        Button::L1,
        Button::L2,
        Button::L3,
        Button::R1,
        Button::R2,
        Button::R3,
        Button::R4,
    ];

    fn slot(self) -> Slot {
        match self {
            Button::L1 => Slot::Note(0),
            Button::L2 => Slot::Note(1),
            Button::L3 => Slot::Note(2),
            Button::R1 => Slot::Note(3),
            Button::R2 => Slot::Note(4),
            Button::R3 => Slot::Note(5),
            Button::R4 => Slot::Note(6),
            Button::Flat => Slot::Aux(0),
            Button::Sharp => Slot::Aux(1),
            Button::OctaveDown => Slot::Aux(2),
            Button::OctaveUp => Slot::Aux(3),
        }
    }

    /// Returns true if this is a note button rather than an auxiliary one.
    pub fn is_note(self) -> bool {
        matches!(self.slot(), Slot::Note(_))
    }

    /// Returns the short name of the button.
    pub fn as_str(self) -> &'static str {
        match self {
            Button::L1 => "l1",
            Button::L2 => "l2",
            Button::L3 => "l3",
            Button::R1 => "r1",
            Button::R2 => "r2",
            Button::R3 => "r3",
            Button::R4 => "r4",
            Button::Flat => "flat",
            Button::Sharp => "sharp",
            Button::OctaveDown => "octave_down",
            Button::OctaveUp => "octave_up",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A consistent snapshot of every button on the instrument.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ButtonState {
    notes: NoteButtons,
    aux: [bool; AUX_BUTTONS],
}

impl ButtonState {
    /// Creates a button state with the given buttons pressed.
    pub fn pressed(buttons: &[Button]) -> ButtonState {
        let mut state = ButtonState::default();
        buttons.iter().for_each(|button| {
            state.set(*button, true);
        });
        state
    }

    /// Returns true if the button is pressed.
    pub fn is_pressed(&self, button: Button) -> bool {
        match button.slot() {
            Slot::Note(i) => self.notes[i],
            Slot::Aux(i) => self.aux[i],
        }
    }

    /// Sets the button. Returns true if its state changed.
    pub fn set(&mut self, button: Button, pressed: bool) -> bool {
        let current = match button.slot() {
            Slot::Note(i) => &mut self.notes[i],
            Slot::Aux(i) => &mut self.aux[i],
        };
        if *current == pressed {
            return false;
        }
        *current = pressed;
        true
    }

    /// The note buttons, top to bottom.
    pub fn notes(&self) -> NoteButtons {
        self.notes
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, pressed) in self.notes.iter().enumerate() {
            if i == 3 {
                write!(f, " |")?;
            }
            write!(f, " {}", if *pressed { "x" } else { "." })?;
        }
        write!(f, " ]")?;
        for button in [
            Button::Flat,
            Button::Sharp,
            Button::OctaveDown,
            Button::OctaveUp,
        ] {
            if self.is_pressed(button) {
                write!(f, " {}", button)?;
            }
        }
        Ok(())
    }
}

/// Shared button state. The input layer is the only writer; everything else reads
/// snapshots through a [ButtonsView].
#[derive(Clone, Default)]
pub struct Buttons {
    state: Arc<RwLock<ButtonState>>,
}

impl Buttons {
    /// Creates a new set of buttons with nothing pressed.
    pub fn new() -> Buttons {
        Buttons::default()
    }

    /// Applies a press or release. If the state changed, on_change is called with the
    /// new snapshot while the write lock is still held, so nothing can observe or
    /// publish a later state before it. Returns true if the state changed.
    pub fn apply<F>(&self, button: Button, pressed: bool, on_change: F) -> bool
    where
        F: FnOnce(&ButtonState),
    {
        let mut state = self.state.write();
        if !state.set(button, pressed) {
            return false;
        }
        on_change(&state);
        true
    }

    /// Returns a consistent snapshot of the current state.
    pub fn snapshot(&self) -> ButtonState {
        *self.state.read()
    }

    /// Returns a read-only view of the buttons.
    pub fn view(&self) -> ButtonsView {
        ButtonsView {
            state: self.state.clone(),
        }
    }
}

/// Read-only access to the button state, for redrawing.
#[derive(Clone)]
pub struct ButtonsView {
    state: Arc<RwLock<ButtonState>>,
}

impl ButtonsView {
    /// Returns a consistent snapshot of the current state.
    pub fn snapshot(&self) -> ButtonState {
        *self.state.read()
    }
}
