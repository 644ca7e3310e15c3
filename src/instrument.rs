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
use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{self, Receiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{info, span, warn, Instrument as _, Level};

use crate::{
    audio::{
        self,
        renderer::{RenderSettings, VoiceStatus},
        AudioError,
    },
    buttons::{Button, Buttons, ButtonsView},
    coalesce::Coalescer,
    config::{self, ConfigError},
    fingering::FingeringTable,
    note::Note,
    player::Playback,
    playsync::CancelHandle,
};

/// Everything needed to start an instrument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    /// How long fingering changes are collected before one is played.
    pub coalesce_window: Duration,
    /// Volume of every note.
    pub volume: f32,
    /// How the voice is rendered. The sample rate is taken from the device.
    pub render: RenderSettings,
}

impl Settings {
    /// Reads the settings from the instrument configuration.
    pub fn from_config(config: &config::Player) -> Result<Settings, ConfigError> {
        Ok(Settings {
            coalesce_window: config.coalesce_window()?,
            volume: config.volume(),
            render: RenderSettings::from_config(config.audio()),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            coalesce_window: crate::coalesce::DEFAULT_WINDOW,
            volume: 1.0,
            render: RenderSettings::default(),
        }
    }
}

/// The whole note pipeline: buttons are resolved to notes, coalesced and played.
pub struct Instrument {
    buttons: Buttons,
    table: FingeringTable,
    volume: f32,
    /// Feeds the coalescer. Never blocks.
    notes_tx: UnboundedSender<Note>,
    cancel_handle: CancelHandle,
    coalescer: JoinHandle<()>,
    playback: JoinHandle<Result<(), AudioError>>,
    status: Arc<VoiceStatus>,
}

impl Instrument {
    /// Opens the device and starts the pipeline. Fails only if the device can't be
    /// acquired. Must be called from within a tokio runtime.
    pub fn start(
        device: Arc<dyn audio::Device>,
        settings: Settings,
    ) -> Result<Instrument, AudioError> {
        let render = RenderSettings {
            sample_rate: device.format().sample_rate,
            ..settings.render
        };
        let playback = Playback::open(device.as_ref(), render)?;
        let status = playback.status();

        let (notes_tx, notes_rx) = mpsc::unbounded_channel();
        let (coalesced_tx, coalesced_rx) = mpsc::channel(1);
        let cancel_handle = CancelHandle::new();

        let coalescer = Coalescer::new(
            settings.coalesce_window,
            notes_rx,
            coalesced_tx,
            cancel_handle.clone(),
        )
        .spawn();
        let playback = tokio::spawn(
            Instrument::play(playback, coalesced_rx).instrument(span!(Level::INFO, "playback")),
        );

        info!(device = %device, volume = settings.volume, "Instrument started.");
        Ok(Instrument {
            buttons: Buttons::new(),
            table: FingeringTable::standard(),
            volume: settings.volume,
            notes_tx,
            cancel_handle,
            coalescer,
            playback,
            status,
        })
    }

    /// Applies notes until the coalescer goes away, then releases the device.
    async fn play(mut playback: Playback, mut notes: Receiver<Note>) -> Result<(), AudioError> {
        while let Some(note) = notes.recv().await {
            playback.apply(note);
        }

        tokio::task::spawn_blocking(move || playback.shutdown())
            .await
            .map_err(|e| AudioError::OutputThread(e.to_string()))?
    }

    /// Presses or releases a button. If the fingering changed, the new note is handed
    /// to the coalescer. Returns true if the fingering changed.
    pub fn on_button_event(&self, button: Button, pressed: bool) -> bool {
        let table = &self.table;
        let volume = self.volume;
        let notes_tx = &self.notes_tx;
        self.buttons.apply(button, pressed, |state| {
            let frequency = table.resolve(state);
            let note = if frequency == 0.0 {
                Note::SILENCE
            } else {
                Note::new(frequency, volume)
            };
            if notes_tx.send(note).is_err() {
                warn!(note = %note, "Coalescer is gone, dropping note.");
            }
        })
    }

    /// Read-only access to the buttons for display.
    pub fn view(&self) -> ButtonsView {
        self.buttons.view()
    }

    /// What the renderer is currently doing.
    pub fn status(&self) -> &Arc<VoiceStatus> {
        &self.status
    }

    /// Stops the coalescer without emitting anything further, plays out notes already
    /// handed to playback, then gates off and releases the device.
    pub async fn shutdown(self) -> Result<(), AudioError> {
        self.cancel_handle.cancel();
        if let Err(e) = self.coalescer.await {
            warn!(err = %e, "Coalescer task failed.");
        }

        let result = self
            .playback
            .await
            .map_err(|e| AudioError::OutputThread(e.to_string()))?;
        info!("Instrument stopped.");
        result
    }
}
