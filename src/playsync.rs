// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
use std::sync::Arc;

use tokio::sync::watch;

/// Represents the current cancel state.
#[derive(Clone, Copy, Debug, PartialEq)]
enum CancelState {
    Untouched,
    Cancelled,
}

/// A cancel handle is shared by every stage of the note pipeline. Cancelling it asks
/// all of them to stop; it's each stage's responsibility to respect the request.
#[derive(Clone)]
pub struct CancelHandle {
    /// Holds the cancel state and wakes up anyone waiting on it.
    state: Arc<watch::Sender<CancelState>>,
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        let (state, _) = watch::channel(CancelState::Untouched);
        CancelHandle {
            state: Arc::new(state),
        }
    }

    /// Returns true if the handle has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow() == CancelState::Cancelled
    }

    /// Waits until the handle is cancelled. Returns immediately if it already has been.
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as self, so this can't fail.
        let _ = receiver
            .wait_for(|state| *state == CancelState::Cancelled)
            .await;
    }

    /// Cancels everything waiting on the handle.
    pub fn cancel(&self) {
        self.state.send_if_modified(|state| {
            if *state == CancelState::Untouched {
                *state = CancelState::Cancelled;
                true
            } else {
                false
            }
        });
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        CancelHandle::new()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_cancel_handle_cancelled() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        let join = {
            let cancel_handle = cancel_handle.clone();
            tokio::spawn(async move { cancel_handle.cancelled().await })
        };

        cancel_handle.cancel();
        assert!(join.await.is_ok());
        assert!(cancel_handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_wait() {
        let cancel_handle = CancelHandle::new();
        cancel_handle.cancel();
        cancel_handle.cancel();
        assert!(
            tokio::time::timeout(Duration::from_secs(1), cancel_handle.cancelled())
                .await
                .is_ok()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_untouched_keeps_waiting() {
        let cancel_handle = CancelHandle::new();
        assert!(
            tokio::time::timeout(Duration::from_millis(100), cancel_handle.cancelled())
                .await
                .is_err()
        );
    }
}
