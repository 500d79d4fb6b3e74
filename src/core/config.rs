use crate::error::{InstallerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "ptinstall";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Which persisted search path gets modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathScope {
    Machine,
    User,
}

impl Default for PathScope {
    fn default() -> Self {
        if cfg!(windows) {
            PathScope::Machine
        } else {
            PathScope::User
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct InstallerConfig {
    pub source_url: String,
    pub default_destination: PathBuf,
    /// Leading directory stripped from archive entries during extraction.
    pub archive_root: Option<String>,
    pub launcher_name: String,
    pub launcher_executable: String,
    pub path_scope: PathScope,
    pub chunk_size: usize,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub temp_dir: Option<PathBuf>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        InstallerConfig {
            source_url: default_source_url().to_string(),
            default_destination: default_destination(),
            archive_root: Some("platform-tools".to_string()),
            launcher_name: "Platform Tools".to_string(),
            launcher_executable: "adb".to_string(),
            path_scope: PathScope::default(),
            chunk_size: 8192,
            connect_timeout_secs: 30,
            user_agent: format!("ptinstall/{}", env!("CARGO_PKG_VERSION")),
            temp_dir: None,
        }
    }
}

impl InstallerConfig {
    /// Loads the user config file if there is one, defaults otherwise.
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: InstallerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_url.trim().is_empty() {
            return Err(InstallerError::Config {
                message: "source_url must not be empty".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(InstallerError::Config {
                message: "chunk_size must be greater than zero".to_string(),
            });
        }
        if self.launcher_executable.trim().is_empty() {
            return Err(InstallerError::Config {
                message: "launcher_executable must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Platform file name of the launcher target, e.g. `adb.exe` on Windows.
    pub fn executable_file_name(&self) -> String {
        if cfg!(windows) && !self.launcher_executable.ends_with(".exe") {
            format!("{}.exe", self.launcher_executable)
        } else {
            self.launcher_executable.clone()
        }
    }

    pub fn launcher_target(&self, destination: &Path) -> PathBuf {
        destination.join(self.executable_file_name())
    }

    /// Default launcher location: the desktop, named after `launcher_name`.
    pub fn launcher_path(&self) -> Result<PathBuf> {
        let desktop = dirs::desktop_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
            .ok_or(InstallerError::HomeDirectoryNotFound)?;
        Ok(desktop.join(self.launcher_file_name()))
    }

    pub fn launcher_file_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.lnk", self.launcher_name)
        } else if cfg!(target_os = "macos") {
            format!("{}.command", self.launcher_name)
        } else {
            format!("{}.desktop", self.launcher_name.to_lowercase().replace(' ', "-"))
        }
    }
}

fn default_source_url() -> &'static str {
    if cfg!(windows) {
        "https://dl.google.com/android/repository/platform-tools-latest-windows.zip"
    } else if cfg!(target_os = "macos") {
        "https://dl.google.com/android/repository/platform-tools-latest-darwin.zip"
    } else {
        "https://dl.google.com/android/repository/platform-tools-latest-linux.zip"
    }
}

fn default_destination() -> PathBuf {
    if cfg!(windows) {
        let program_files = std::env::var_os("ProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
        program_files.join("Android").join("platform-tools")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Android")
            .join("platform-tools")
    }
}

fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
