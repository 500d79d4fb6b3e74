//! The install flow: download, extract, then the optional search-path and
//! launcher steps.
//!
//! A failing step aborts the rest. Nothing already done is undone, and the
//! temporary archive is only removed after every step succeeded.

use crate::core::archive;
use crate::core::config::InstallerConfig;
use crate::core::download::{Downloader, UpdateCheck};
use crate::core::launcher;
use crate::core::progress::{EventSender, InstallEvent};
use crate::core::request::InstallRequest;
use crate::core::search_path::{self, PathStore};
use crate::error::{InstallerError, Result};
use crate::utils::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub bytes_downloaded: u64,
    pub files_extracted: usize,
    /// `Some(true)` when the search path was changed, `Some(false)` when the
    /// directory was already registered, `None` when not requested.
    pub path_changed: Option<bool>,
    pub launcher: Option<PathBuf>,
}

pub struct Installer {
    config: InstallerConfig,
    downloader: Downloader,
    path_store: Option<Box<dyn PathStore>>,
    launcher_path: Option<PathBuf>,
}

impl Installer {
    pub fn new(config: InstallerConfig) -> Result<Self> {
        config.validate()?;
        let downloader = Downloader::new(&config)?;
        Ok(Self {
            config,
            downloader,
            path_store: None,
            launcher_path: None,
        })
    }

    /// Overrides the platform search-path store.
    pub fn with_path_store(mut self, store: Box<dyn PathStore>) -> Self {
        self.path_store = Some(store);
        self
    }

    /// Overrides the launcher location (default: the desktop).
    pub fn with_launcher_path(mut self, path: PathBuf) -> Self {
        self.launcher_path = Some(path);
        self
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn path_store(&self) -> Option<&dyn PathStore> {
        self.path_store.as_deref()
    }

    pub async fn check_for_update(&self, url: &str) -> Result<UpdateCheck> {
        self.downloader.check_for_update(url).await
    }

    /// Runs the whole flow and reports `Finished` or `Failed` at the end.
    pub async fn run(
        &mut self,
        request: &InstallRequest,
        events: &EventSender,
    ) -> Result<InstallReport> {
        log::info!(
            "Installing {} into {}",
            request.source_url,
            request.destination.display()
        );

        let result = self.execute(request, events).await;
        match &result {
            Ok(report) => {
                log::info!("Installation completed: {report:?}");
                events.send(InstallEvent::Finished);
            }
            Err(e) => {
                log::error!("Installation failed ({}): {e}", e.kind());
                events.send(InstallEvent::Failed {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn execute(
        &mut self,
        request: &InstallRequest,
        events: &EventSender,
    ) -> Result<InstallReport> {
        // A store we cannot write (e.g. HKLM without elevation) fails here,
        // before anything is downloaded.
        if request.add_to_search_path {
            self.store()?.ensure_writable(&request.destination)?;
        }

        let archive_path = self.create_temp_archive()?;

        let bytes_downloaded = self
            .downloader
            .download(&request.source_url, &archive_path, events)
            .await?;

        events.send(InstallEvent::Extracting);
        let files_extracted = self.extract(&archive_path, &request.destination).await?;

        let path_changed = if request.add_to_search_path {
            events.send(InstallEvent::RegisteringPath {
                dir: request.destination.clone(),
            });
            Some(self.register_path(&request.destination)?)
        } else {
            None
        };

        let launcher = if request.create_shortcut {
            let output = self.resolve_launcher_path()?;
            events.send(InstallEvent::CreatingLauncher {
                path: output.clone(),
            });
            let target = self.config.launcher_target(&request.destination);
            launcher::create_launcher(&target, &output)?;
            Some(output)
        } else {
            None
        };

        fs::remove_file_if_exists(&archive_path)?;
        log::debug!("Removed {}", archive_path.display());

        Ok(InstallReport {
            bytes_downloaded,
            files_extracted,
            path_changed,
            launcher,
        })
    }

    /// A persistent temp file, so a failed run leaves it behind for inspection.
    fn create_temp_archive(&self) -> Result<PathBuf> {
        let temp_dir = self.config.temp_dir();
        fs::ensure_dir_exists(&temp_dir)?;
        let (_file, path) = tempfile::Builder::new()
            .prefix("platform-tools-")
            .suffix(".zip")
            .tempfile_in(&temp_dir)
            .map_err(|e| InstallerError::from_io(e, &temp_dir))?
            .keep()
            .map_err(|e| InstallerError::Io(e.error))?;
        Ok(path)
    }

    async fn extract(&self, archive_path: &Path, destination: &Path) -> Result<usize> {
        let archive_path = archive_path.to_path_buf();
        let destination = destination.to_path_buf();
        let root = self.config.archive_root.clone();

        tokio::task::spawn_blocking(move || {
            archive::extract_archive(&archive_path, &destination, root.as_deref())
        })
        .await
        .map_err(|e| InstallerError::Io(std::io::Error::other(e)))?
    }

    fn register_path(&mut self, dir: &Path) -> Result<bool> {
        search_path::register_path(self.store()?, dir)
    }

    /// The injected store, or the platform one for the configured scope.
    fn store(&mut self) -> Result<&mut (dyn PathStore + 'static)> {
        let store = match self.path_store.take() {
            Some(store) => store,
            None => search_path::default_store(self.config.path_scope)?,
        };
        Ok(self.path_store.insert(store).as_mut())
    }

    fn resolve_launcher_path(&self) -> Result<PathBuf> {
        match &self.launcher_path {
            Some(path) => Ok(path.clone()),
            None => self.config.launcher_path(),
        }
    }
}

/// Confirms `destination` can be created and written before anything is
/// downloaded.
pub fn preflight(destination: &Path) -> Result<()> {
    log::debug!("Checking that {} is writable", destination.display());
    fs::check_writable(destination)
}
