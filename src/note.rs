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
use std::fmt;

/// A single note for the voice to play. A frequency or volume of 0 means silence, and
/// all silent notes are equal to each other.
#[derive(Clone, Copy, Debug, Default)]
pub struct Note {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Volume from 0.0 to 1.0.
    pub volume: f32,
}

impl Note {
    /// The note that stops the voice.
    pub const SILENCE: Note = Note {
        frequency: 0.0,
        volume: 0.0,
    };

    /// Creates a new note.
    pub fn new(frequency: f64, volume: f32) -> Note {
        Note { frequency, volume }
    }

    /// Returns true if this note means the voice should stop.
    pub fn is_silent(&self) -> bool {
        self.frequency == 0.0 || self.volume == 0.0
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Note) -> bool {
        match (self.is_silent(), other.is_silent()) {
            (true, true) => true,
            (false, false) => self.frequency == other.frequency && self.volume == other.volume,
            _ => false,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_silent() {
            write!(f, "silence")
        } else {
            write!(f, "{:.2}Hz@{:.2}", self.frequency, self.volume)
        }
    }
}

#[cfg(test)]
mod test {
    use super::Note;

    #[test]
    fn test_silence() {
        assert!(Note::SILENCE.is_silent());
        assert!(Note::new(0.0, 1.0).is_silent());
        assert!(Note::new(440.0, 0.0).is_silent());
        assert!(!Note::new(440.0, 1.0).is_silent());
        assert_eq!(Note::SILENCE, Note::default());
    }

    #[test]
    fn test_silent_notes_are_equal() {
        assert_eq!(Note::SILENCE, Note::new(0.0, 1.0));
        assert_eq!(Note::new(0.0, 0.5), Note::new(440.0, 0.0));
        assert_ne!(Note::SILENCE, Note::new(440.0, 1.0));
        assert_ne!(Note::new(440.0, 1.0), Note::new(440.0, 0.5));
        assert_eq!(Note::new(440.0, 1.0), Note::new(440.0, 1.0));
    }

    #[test]
    fn test_display() {
        assert_eq!("silence", Note::new(0.0, 1.0).to_string());
        assert_eq!("440.00Hz@0.50", Note::new(440.0, 0.5).to_string());
    }
}
