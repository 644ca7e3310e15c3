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
use std::{collections::HashMap, path::Path, time::Duration};

use config::{Config, Environment, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::{audio::Audio, error::ConfigError};
use crate::buttons::Button;

const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(10);
const DEFAULT_VOLUME: f32 = 1.0;
const ENV_PREFIX: &str = "KEYSAX";

/// The default keyboard layout, laid out for a Dvorak home row.
const DEFAULT_KEYMAP: [(&str, Button); 10] = [
    ("u", Button::L1),
    ("e", Button::L2),
    ("o", Button::L3),
    ("a", Button::Sharp),
    (";", Button::Flat),
    ("space", Button::OctaveUp),
    ("h", Button::R1),
    ("t", Button::R2),
    ("n", Button::R3),
    ("s", Button::R4),
];

/// The configuration for the instrument.
#[derive(Deserialize, Default)]
pub struct Player {
    /// The audio output configuration.
    #[serde(default)]
    audio: Audio,
    /// How long to collect fingering changes before playing the result, e.g. "10ms".
    coalesce_window: Option<String>,
    /// Output volume from 0.0 to 1.0.
    volume: Option<f32>,
    /// Key names mapped to buttons. Replaces the default layout entirely.
    keymap: Option<HashMap<String, Button>>,
}

impl Player {
    /// Loads the configuration from a YAML file. Any setting can be overridden with
    /// KEYSAX_ environment variables, e.g. KEYSAX_AUDIO__DEVICE=mock.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Player>()?)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns the coalescing window (default: 10ms).
    pub fn coalesce_window(&self) -> Result<Duration, ConfigError> {
        match &self.coalesce_window {
            Some(window) => Ok(DurationString::from_string(window.clone())
                .map_err(|e| ConfigError::Duration {
                    value: window.clone(),
                    reason: e.to_string(),
                })?
                .into()),
            None => Ok(DEFAULT_COALESCE_WINDOW),
        }
    }

    /// Returns the output volume, clamped to 0.0-1.0 (default: 1.0).
    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME).clamp(0.0, 1.0)
    }

    /// Returns the keymap with lowercase key names.
    pub fn keymap(&self) -> HashMap<String, Button> {
        match &self.keymap {
            Some(keymap) => keymap
                .iter()
                .map(|(key, button)| (key.to_lowercase(), *button))
                .collect(),
            None => DEFAULT_KEYMAP
                .iter()
                .map(|(key, button)| (key.to_string(), *button))
                .collect(),
        }
    }
}
