//! Installer state machine.
//!
//! Front ends drive a [`Session`] with the [`InstallEvent`]s the flow emits
//! and render its status line, progress and trigger state.

use crate::core::progress::InstallEvent;
use crate::error::{InstallerError, Result};

pub const STATUS_READY: &str = "Ready to install...";
pub const STATUS_DOWNLOADING: &str = "Downloading platform tools...";
pub const STATUS_EXTRACTING: &str = "Extracting files...";
pub const STATUS_REGISTERING: &str = "Updating search path...";
pub const STATUS_LAUNCHER: &str = "Creating desktop shortcut...";
pub const STATUS_DONE: &str = "Installation completed successfully!";
pub const STATUS_FAILED: &str = "Installation failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    Downloading,
    Extracting,
    Applying,
    Done,
    Failed,
}

impl InstallState {
    /// Next state for `event`, or `None` when the event is not valid here.
    pub fn next(self, event: &InstallEvent) -> Option<InstallState> {
        use InstallState::*;

        match (self, event) {
            (Idle | Done | Failed | Downloading, InstallEvent::Downloading { .. }) => {
                Some(Downloading)
            }
            (Downloading, InstallEvent::Progress { .. }) => Some(Downloading),
            (Downloading, InstallEvent::Extracting) => Some(Extracting),
            (
                Extracting | Applying,
                InstallEvent::RegisteringPath { .. } | InstallEvent::CreatingLauncher { .. },
            ) => Some(Applying),
            (Extracting | Applying, InstallEvent::Finished) => Some(Done),
            (Downloading | Extracting | Applying, InstallEvent::Failed { .. }) => Some(Failed),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            InstallState::Downloading | InstallState::Extracting | InstallState::Applying
        )
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    state: InstallState,
    status: String,
    percent: f64,
    last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: InstallState::Idle,
            status: STATUS_READY.to_string(),
            percent: 0.0,
            last_error: None,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the install action may be triggered right now.
    pub fn trigger_enabled(&self) -> bool {
        !self.state.is_active()
    }

    /// Claims the trigger for a new run.
    pub fn begin(&self) -> Result<()> {
        if self.trigger_enabled() {
            Ok(())
        } else {
            Err(InstallerError::Busy)
        }
    }

    /// Applies an event. Invalid transitions are logged and ignored.
    pub fn handle(&mut self, event: &InstallEvent) -> InstallState {
        let Some(next) = self.state.next(event) else {
            log::warn!("Ignoring {:?} in state {:?}", event, self.state);
            return self.state;
        };

        match event {
            InstallEvent::Downloading { .. } if self.state == InstallState::Downloading => {}
            InstallEvent::Downloading { .. } => {
                self.percent = 0.0;
                self.last_error = None;
                self.status = STATUS_DOWNLOADING.to_string();
            }
            InstallEvent::Progress { progress, .. } => {
                if let Some(percent) = progress.percent() {
                    self.percent = self.percent.max(percent.clamp(0.0, 100.0));
                }
            }
            InstallEvent::Extracting => self.status = STATUS_EXTRACTING.to_string(),
            InstallEvent::RegisteringPath { .. } => self.status = STATUS_REGISTERING.to_string(),
            InstallEvent::CreatingLauncher { .. } => self.status = STATUS_LAUNCHER.to_string(),
            InstallEvent::Finished => {
                self.percent = 100.0;
                self.status = STATUS_DONE.to_string();
            }
            InstallEvent::Failed { message } => {
                self.last_error = Some(message.clone());
                self.status = STATUS_FAILED.to_string();
            }
        }

        log::debug!("Installer state {:?} -> {:?}", self.state, next);
        self.state = next;
        next
    }
}
