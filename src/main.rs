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
use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use keysax::{
    audio,
    buttons::{Button, ButtonState},
    config,
    fingering::{semitones_to_hz, FingeringTable},
    instrument::{Instrument, Settings},
    keyboard::{self, Event},
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A saxophone played from the computer keyboard."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Prints the fingering chart.
    Fingerings {},
    /// Start will start the instrument, reading keys from stdin.
    Start {
        /// The path to the instrument config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so that raw PCM can be written to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Fingerings {} => {
            println!("Fingerings:");
            for (notes, semitones) in FingeringTable::standard().sorted() {
                let pressed: Vec<Button> = Button::NOTES
                    .iter()
                    .zip(notes.iter())
                    .filter(|(_, pressed)| **pressed)
                    .map(|(button, _)| *button)
                    .collect();
                println!(
                    "- {} {:+3} semitones {:8.2}Hz",
                    ButtonState::pressed(&pressed),
                    semitones,
                    semitones_to_hz(semitones)
                );
            }
        }
        Commands::Start { config_path } => {
            let config = config::load(&PathBuf::from(config_path))?;
            let device = audio::get_device(config.audio())?;
            let instrument = Instrument::start(device, Settings::from_config(&config)?)?;
            let view = instrument.view();

            let (events_tx, mut events_rx) = mpsc::channel::<Event>(16);
            let driver = keyboard::Driver::new(config.keymap()).monitor_events(events_tx);

            while let Some(event) = events_rx.recv().await {
                match event {
                    Event::Button { button, pressed } => {
                        if instrument.on_button_event(button, pressed) {
                            eprintln!("{}", view.snapshot());
                        }
                    }
                    Event::Quit => break,
                }
            }

            info!("Shutting down.");
            instrument.shutdown().await?;
            driver.await??;
        }
    }

    Ok(())
}
