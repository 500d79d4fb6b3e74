//! Progress values and the events the installer flow reports.

use std::path::PathBuf;
use tokio::sync::mpsc;

/// Download progress. Indeterminate when the server sent no content length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Determinate(f64),
    Indeterminate,
}

impl Progress {
    pub fn from_bytes(bytes_read: u64, total_bytes: Option<u64>) -> Self {
        match total_bytes {
            Some(total) if total > 0 => {
                Progress::Determinate((bytes_read as f64 / total as f64).clamp(0.0, 1.0))
            }
            _ => Progress::Indeterminate,
        }
    }

    /// Percentage in `[0, 100]`, `None` when indeterminate.
    pub fn percent(&self) -> Option<f64> {
        match self {
            Progress::Determinate(fraction) => Some(fraction * 100.0),
            Progress::Indeterminate => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstallEvent {
    Downloading {
        total_bytes: Option<u64>,
    },
    Progress {
        bytes_read: u64,
        total_bytes: Option<u64>,
        progress: Progress,
    },
    Extracting,
    RegisteringPath {
        dir: PathBuf,
    },
    CreatingLauncher {
        path: PathBuf,
    },
    Finished,
    Failed {
        message: String,
    },
}

/// Best-effort event channel. A dropped receiver never fails the install.
#[derive(Debug, Clone, Default)]
pub struct EventSender {
    tx: Option<mpsc::UnboundedSender<InstallEvent>>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InstallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: InstallEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                log::trace!("Event receiver dropped");
            }
        }
    }
}
