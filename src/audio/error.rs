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
use std::io;

/// Errors acquiring, running or releasing an audio sink.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device found with name {0}")]
    DeviceNotFound(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("unable to list audio devices: {0}")]
    Devices(#[from] ::cpal::DevicesError),

    #[error("unable to get audio device name: {0}")]
    DeviceName(#[from] ::cpal::DeviceNameError),

    #[error("unable to query output configurations: {0}")]
    SupportedConfigs(#[from] ::cpal::SupportedStreamConfigsError),

    #[error("audio host unavailable: {0}")]
    HostUnavailable(#[from] ::cpal::HostUnavailable),

    #[error("unable to build output stream: {0}")]
    BuildStream(#[from] ::cpal::BuildStreamError),

    #[error("unable to start output stream: {0}")]
    PlayStream(#[from] ::cpal::PlayStreamError),

    #[error("audio output thread failed: {0}")]
    OutputThread(String),

    #[error("invalid audio configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("audio I/O error: {0}")]
    Io(#[from] io::Error),
}
