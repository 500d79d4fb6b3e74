use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InstallerError>;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error in {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Permission denied: {path} (try running with administrator rights)")]
    Permission { path: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Launcher error: {message}")]
    Launcher { message: String },

    #[error("An installation is already in progress")]
    Busy,

    #[error("Home directory not found")]
    HomeDirectoryNotFound,
}

impl From<reqwest::Error> for InstallerError {
    fn from(error: reqwest::Error) -> Self {
        InstallerError::Network {
            message: error.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for InstallerError {
    fn from(error: zip::result::ZipError) -> Self {
        match error {
            zip::result::ZipError::Io(e) => InstallerError::Io(e),
            other => InstallerError::Archive {
                path: PathBuf::new(),
                message: other.to_string(),
            },
        }
    }
}

impl From<toml::de::Error> for InstallerError {
    fn from(error: toml::de::Error) -> Self {
        InstallerError::Config {
            message: error.to_string(),
        }
    }
}

impl InstallerError {
    pub fn network<S: Into<String>>(message: S) -> Self {
        InstallerError::Network {
            message: message.into(),
        }
    }

    pub fn archive<S: Into<String>>(path: &Path, message: S) -> Self {
        InstallerError::Archive {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn launcher<S: Into<String>>(message: S) -> Self {
        InstallerError::Launcher {
            message: message.into(),
        }
    }

    /// Maps `PermissionDenied` onto [`InstallerError::Permission`] for `path`,
    /// every other IO failure stays an IO error.
    pub fn from_io(error: std::io::Error, path: &Path) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => InstallerError::Permission {
                path: path.to_path_buf(),
            },
            _ => InstallerError::Io(error),
        }
    }

    /// Short category name, used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            InstallerError::Network { .. } => "NetworkError",
            InstallerError::Io(_) | InstallerError::Launcher { .. } => "IOError",
            InstallerError::Archive { .. } => "ArchiveError",
            InstallerError::Permission { .. } => "PermissionError",
            InstallerError::Config { .. } | InstallerError::Json(_) => "ConfigError",
            InstallerError::Busy => "Busy",
            InstallerError::HomeDirectoryNotFound => "IOError",
        }
    }
}
