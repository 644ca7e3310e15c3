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

//! Joins together bursts of notes so key chatter doesn't reach the voice.
//!
//! The first note of a burst starts a deadline. Notes arriving before the deadline
//! replace the pending note but don't move the deadline. When it fires, the pending
//! note is sent on unless it's the same as the last note sent.

use std::time::Duration;

use tokio::{
    sync::mpsc::{Sender, UnboundedReceiver},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, span, trace, Instrument, Level};

use crate::{note::Note, playsync::CancelHandle};

/// The default coalescing window.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(10);

/// Coalesces notes from an input stream onto an output stream.
pub struct Coalescer {
    window: Duration,
    input: UnboundedReceiver<Note>,
    output: Sender<Note>,
    cancel_handle: CancelHandle,
}

impl Coalescer {
    /// Creates a new coalescer.
    pub fn new(
        window: Duration,
        input: UnboundedReceiver<Note>,
        output: Sender<Note>,
        cancel_handle: CancelHandle,
    ) -> Coalescer {
        Coalescer {
            window,
            input,
            output,
            cancel_handle,
        }
    }

    /// Runs the coalescer on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run().instrument(span!(Level::INFO, "coalescer")))
    }

    /// Runs until cancelled or until either side of the pipeline goes away.
    pub async fn run(mut self) {
        info!(window = format!("{:?}", self.window), "Coalescer started.");

        // Nothing is playing before the first note.
        let mut last_sent = Note::SILENCE;
        let mut input_closed = false;

        while !input_closed {
            let mut pending = tokio::select! {
                biased;
                _ = self.cancel_handle.cancelled() => break,
                note = self.input.recv() => match note {
                    Some(note) => note,
                    None => break,
                },
            };

            let deadline = Instant::now() + self.window;
            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel_handle.cancelled() => {
                        debug!(pending = %pending, "Cancelled, dropping pending note.");
                        info!("Coalescer stopped.");
                        return;
                    }
                    _ = sleep_until(deadline) => break,
                    note = self.input.recv() => match note {
                        Some(note) => {
                            trace!(replaced = %pending, with = %note, "Joined note.");
                            pending = note;
                        }
                        None => {
                            input_closed = true;
                            break;
                        }
                    },
                }
            }

            if pending == last_sent {
                trace!(note = %pending, "Dropping repeated note.");
                continue;
            }

            tokio::select! {
                biased;
                _ = self.cancel_handle.cancelled() => break,
                result = self.output.send(pending) => {
                    if result.is_err() {
                        debug!("Note receiver closed.");
                        break;
                    }
                }
            }
            debug!(note = %pending, "Sent note.");
            last_sent = pending;
        }

        info!("Coalescer stopped.");
    }
}
