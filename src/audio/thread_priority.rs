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
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

use crate::config;

/// Scheduling requested for the thread that renders audio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioThreadPriority {
    /// Crossplatform priority, 0-99.
    priority: u8,
    /// Whether to ask for SCHED_FIFO on unix.
    realtime: bool,
}

impl AudioThreadPriority {
    /// Reads the priority settings once, so nothing is parsed on the audio thread.
    pub fn from_config(config: &config::Audio) -> AudioThreadPriority {
        AudioThreadPriority {
            priority: config.thread_priority(),
            realtime: config.realtime(),
        }
    }

    /// Applies the priority to the current thread the first time it's called with a
    /// given flag; later calls are free.
    pub fn configure_current_thread(&self, priority_set: &mut bool) {
        if *priority_set {
            return;
        }
        *priority_set = true;

        let value = match ThreadPriorityValue::try_from(self.priority) {
            Ok(value) => value,
            Err(_) => return,
        };
        let tp = ThreadPriority::Crossplatform(value);
        if let Err(e) = set_current_thread_priority(tp) {
            warn!(error = ?e, priority = self.priority, "Failed to raise audio thread priority");
        }

        #[cfg(unix)]
        if self.realtime {
            use thread_priority::unix::{
                set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
                ThreadSchedulePolicy,
            };
            match set_thread_priority_and_policy(
                thread_native_id(),
                tp,
                ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
            ) {
                Ok(()) => info!("Enabled RT SCHED_FIFO for audio thread"),
                Err(e) => warn!(error = ?e, "Failed to set RT SCHED_FIFO for audio thread"),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_config() {
        let priority = AudioThreadPriority::from_config(&config::Audio::default());
        assert_eq!(70, priority.priority);
        assert!(priority.realtime);
    }

    #[test]
    fn test_configures_once() {
        let priority = AudioThreadPriority {
            priority: 0,
            realtime: false,
        };
        let mut priority_set = false;
        priority.configure_current_thread(&mut priority_set);
        assert!(priority_set);
        priority.configure_current_thread(&mut priority_set);
        assert!(priority_set);
    }
}
