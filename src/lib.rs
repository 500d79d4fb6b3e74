//! Android SDK Platform Tools installer library
//!
//! This library provides the install flow behind the `ptinstall` CLI:
//! download, extraction, search-path registration and launcher creation.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::core::installer::{InstallReport, Installer};
pub use crate::core::request::InstallRequest;
pub use crate::error::{InstallerError, Result};
