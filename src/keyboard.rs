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
use std::{collections::HashMap, io};

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use crate::buttons::Button;

const QUIT: &str = "quit";

/// Something read from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Button { button: Button, pressed: bool },
    Quit,
}

/// Reads key presses from a line-based terminal. "+key" presses, "-key" releases and
/// "quit" stops. Several changes can go on one line, e.g. "+u +e -o".
pub struct Driver {
    keymap: HashMap<String, Button>,
}

impl Driver {
    pub fn new(keymap: HashMap<String, Button>) -> Driver {
        Driver { keymap }
    }

    /// Parses one token into an event.
    fn parse(&self, token: &str) -> Option<Event> {
        if token == QUIT {
            return Some(Event::Quit);
        }

        let (pressed, key) = if let Some(key) = token.strip_prefix('+') {
            (true, key)
        } else if let Some(key) = token.strip_prefix('-') {
            (false, key)
        } else {
            return None;
        };
        self.keymap
            .get(key)
            .map(|button| Event::Button {
                button: *button,
                pressed,
            })
    }

    /// Handles a line of input. Returns false once the input is exhausted or quit was
    /// requested.
    fn monitor_io<R, W>(
        &self,
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Keys (+key, -key, {}): ", QUIT)?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            events_tx
                .blocking_send(Event::Quit)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            return Ok(false);
        }

        for token in input.to_lowercase().split_whitespace() {
            match self.parse(token) {
                Some(event) => {
                    events_tx
                        .blocking_send(event)
                        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                    if event == Event::Quit {
                        return Ok(false);
                    }
                }
                None => warn!(input = token, "Unrecognized input"),
            }
        }
        Ok(true)
    }

    /// Reads stdin on a blocking thread until quit or end of input. Prompts go to stderr
    /// since stdout may be carrying audio.
    pub fn monitor_events(self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!(keys = self.keymap.len(), "Keyboard driver started.");

            while self.monitor_io(&events_tx, io::stdin().lock(), io::stderr())? {}
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader};

    use tokio::sync::mpsc;

    use super::*;

    fn driver() -> Driver {
        Driver::new(HashMap::from([
            ("u".to_string(), Button::L1),
            ("space".to_string(), Button::OctaveUp),
            (";".to_string(), Button::Flat),
        ]))
    }

    fn get_events(input: &str) -> Result<(bool, Vec<Event>), io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(16);

        let reader = BufReader::new(input.as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        let more = driver().monitor_io(&sender, reader, &mut writer)?;
        assert!(String::from_utf8(writer).unwrap().starts_with("Keys"));

        // Force the sender to close.
        drop(sender);
        let mut events = Vec::new();
        while let Some(event) = receiver.blocking_recv() {
            events.push(event);
        }
        Ok((more, events))
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(
            (
                true,
                vec![
                    Event::Button {
                        button: Button::L1,
                        pressed: true
                    },
                    Event::Button {
                        button: Button::OctaveUp,
                        pressed: false
                    },
                    Event::Button {
                        button: Button::Flat,
                        pressed: true
                    },
                ]
            ),
            get_events("+U -space +;\n")?
        );
        assert_eq!((true, vec![]), get_events("unrecognized +x u\n")?);
        Ok(())
    }

    #[test]
    fn test_quit() -> Result<(), io::Error> {
        assert_eq!(
            (
                false,
                vec![
                    Event::Button {
                        button: Button::L1,
                        pressed: false
                    },
                    Event::Quit
                ]
            ),
            get_events("-u quit +u\n")?
        );
        assert_eq!((false, vec![Event::Quit]), get_events("")?);
        Ok(())
    }
}
