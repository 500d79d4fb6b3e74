//! Persisted executable search path.
//!
//! [`register_path`] does the read-modify-write against any [`PathStore`].
//! Membership is decided on whole delimiter-separated segments, so
//! `C:\Tools` is not considered present because `C:\Tools2` is.

use crate::core::config::PathScope;
use crate::error::{InstallerError, Result};
use crate::utils::shell::Shell;
use std::fmt;
use std::path::{Path, PathBuf};

const BLOCK_START: &str = "# >>> ptinstall >>>";
const BLOCK_END: &str = "# <<< ptinstall <<<";

/// A search-path value split into its segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<String>,
    delimiter: char,
}

impl SearchPath {
    pub fn parse(value: &str, delimiter: char) -> Self {
        let entries = value
            .split(delimiter)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries, delimiter }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of segments equivalent to `dir`.
    pub fn count(&self, dir: &str) -> usize {
        let wanted = self.normalize(dir);
        self.entries
            .iter()
            .filter(|entry| self.normalize(entry) == wanted)
            .count()
    }

    pub fn contains(&self, dir: &str) -> bool {
        self.count(dir) > 0
    }

    /// Windows (`;`-delimited) values compare case-insensitively.
    fn normalize(&self, entry: &str) -> String {
        let entry = entry.trim().trim_matches('"');
        let trimmed = entry.trim_end_matches(['/', '\\']);
        let entry = if trimmed.is_empty() || trimmed.ends_with(':') {
            entry
        } else {
            trimmed
        };
        if self.delimiter == ';' {
            entry.to_lowercase()
        } else {
            entry.to_string()
        }
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delimiter = self.delimiter.to_string();
        write!(f, "{}", self.entries.join(&delimiter))
    }
}

/// Appends `dir` to a raw value, leaving the existing text untouched.
pub fn append_entry(value: &str, dir: &str, delimiter: char) -> String {
    let base = value.trim_end().trim_end_matches(delimiter);
    if base.is_empty() {
        dir.to_string()
    } else {
        format!("{base}{delimiter}{dir}")
    }
}

/// Backend that persists the search-path value.
pub trait PathStore {
    fn delimiter(&self) -> char;

    fn read(&self) -> Result<String>;

    fn write(&mut self, value: &str) -> Result<()>;

    /// Fails when `dir` could not be written to this store, without
    /// changing anything.
    fn ensure_writable(&self, dir: &Path) -> Result<()>;

    /// Human-readable location, for logs and `doctor`.
    fn describe(&self) -> String;
}

/// Adds `dir` to the store unless an equivalent segment is already present.
/// Returns whether the stored value changed.
pub fn register_path(store: &mut dyn PathStore, dir: &Path) -> Result<bool> {
    let dir = dir.to_string_lossy();
    let delimiter = store.delimiter();
    let current = store.read()?;

    if SearchPath::parse(&current, delimiter).contains(&dir) {
        log::info!("{dir} is already on the search path ({})", store.describe());
        return Ok(false);
    }

    let updated = append_entry(&current, &dir, delimiter);
    store.write(&updated)?;
    log::info!("Added {dir} to the search path ({})", store.describe());
    Ok(true)
}

pub fn is_registered(store: &dyn PathStore, dir: &Path) -> Result<bool> {
    let value = store.read()?;
    Ok(SearchPath::parse(&value, store.delimiter()).contains(&dir.to_string_lossy()))
}

/// The platform store for `scope`.
pub fn default_store(scope: PathScope) -> Result<Box<dyn PathStore>> {
    #[cfg(windows)]
    {
        Ok(Box::new(RegistryPathStore::new(scope)))
    }

    #[cfg(not(windows))]
    {
        let store = match scope {
            PathScope::Machine => ShellProfileStore::new(
                PathBuf::from("/etc/profile.d/ptinstall.sh"),
                Shell::Posix,
            ),
            PathScope::User => ShellProfileStore::new(
                crate::utils::shell::get_shell_config_path()?,
                crate::utils::shell::detect_shell(),
            ),
        };
        Ok(Box::new(store))
    }
}

/// In-memory store, for dry runs and tests.
#[derive(Debug, Clone)]
pub struct MemoryPathStore {
    value: String,
    delimiter: char,
    writes: usize,
    read_only: bool,
}

impl MemoryPathStore {
    pub fn new(value: impl Into<String>, delimiter: char) -> Self {
        Self {
            value: value.into(),
            delimiter,
            writes: 0,
            read_only: false,
        }
    }

    /// Rejects every write with a permission error.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    fn check_access(&self) -> Result<()> {
        if self.read_only {
            return Err(InstallerError::Permission {
                path: PathBuf::from(self.describe()),
            });
        }
        Ok(())
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PathStore for MemoryPathStore {
    fn delimiter(&self) -> char {
        self.delimiter
    }

    fn read(&self) -> Result<String> {
        Ok(self.value.clone())
    }

    fn write(&mut self, value: &str) -> Result<()> {
        self.check_access()?;
        self.value = value.to_string();
        self.writes += 1;
        Ok(())
    }

    fn ensure_writable(&self, _dir: &Path) -> Result<()> {
        self.check_access()
    }

    fn describe(&self) -> String {
        "in-memory search path".to_string()
    }
}

/// Keeps the directories in a marked block of a shell startup file.
///
/// The value this store exposes is only what the block adds, joined with `:`.
#[derive(Debug, Clone)]
pub struct ShellProfileStore {
    path: PathBuf,
    shell: Shell,
    backup: bool,
}

impl ShellProfileStore {
    pub fn new(path: PathBuf, shell: Shell) -> Self {
        Self {
            path,
            shell,
            backup: true,
        }
    }

    pub fn without_backup(mut self) -> Self {
        self.backup = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(InstallerError::from_io(e, &self.path)),
        }
    }

    fn backup_file(&self) -> Result<()> {
        let backup_name = format!(
            "{}.ptinstall-{}.bak",
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("profile"),
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        let backup_path = self.path.with_file_name(backup_name);
        std::fs::copy(&self.path, &backup_path)
            .map_err(|e| InstallerError::from_io(e, &backup_path))?;
        log::debug!("Backed up {} to {}", self.path.display(), backup_path.display());
        Ok(())
    }
}

impl PathStore for ShellProfileStore {
    fn delimiter(&self) -> char {
        ':'
    }

    fn read(&self) -> Result<String> {
        let content = self.read_file()?;
        let dirs: Vec<String> = managed_block(&content)
            .into_iter()
            .flat_map(parse_export_line)
            .collect();
        Ok(dirs.join(":"))
    }

    fn write(&mut self, value: &str) -> Result<()> {
        let content = self.read_file()?;
        let dirs = SearchPath::parse(value, ':').entries().to_vec();
        for dir in &dirs {
            crate::utils::shell::check_profile_entry(dir)?;
        }
        let updated = replace_block(&content, &dirs, self.shell);

        if updated == content {
            return Ok(());
        }
        if self.backup && self.path.exists() {
            self.backup_file()?;
        }
        if let Some(parent) = self.path.parent() {
            crate::utils::fs::ensure_dir_exists(parent)?;
        }
        std::fs::write(&self.path, updated).map_err(|e| InstallerError::from_io(e, &self.path))?;
        Ok(())
    }

    fn ensure_writable(&self, dir: &Path) -> Result<()> {
        crate::utils::shell::check_profile_entry(&dir.to_string_lossy())?;
        if self.path.exists() {
            std::fs::OpenOptions::new()
                .append(true)
                .open(&self.path)
                .map_err(|e| InstallerError::from_io(e, &self.path))?;
            Ok(())
        } else {
            match self.path.parent() {
                Some(parent) => crate::utils::fs::check_writable(parent),
                None => Ok(()),
            }
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Lines between the markers, exclusive.
fn managed_block(content: &str) -> Vec<&str> {
    let mut inside = false;
    let mut lines = Vec::new();
    for line in content.lines() {
        match line.trim() {
            BLOCK_START => inside = true,
            BLOCK_END => inside = false,
            _ if inside => lines.push(line),
            _ => {}
        }
    }
    lines
}

/// Directories added by one of our export lines, in either syntax.
fn parse_export_line(line: &str) -> Vec<String> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("export PATH=") {
        return rest
            .trim_matches('"')
            .split(':')
            .filter(|part| !part.is_empty() && *part != "$PATH")
            .map(str::to_string)
            .collect();
    }
    if let Some(rest) = line.strip_prefix("set -gx PATH $PATH") {
        return rest
            .split('"')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
    }
    Vec::new()
}

/// Rewrites (or appends, or removes) the managed block.
fn replace_block(content: &str, dirs: &[String], shell: Shell) -> String {
    let block = if dirs.is_empty() {
        None
    } else {
        Some(format!(
            "{BLOCK_START}\n{}\n{BLOCK_END}\n",
            shell.path_export_line(dirs)
        ))
    };

    let mut out = String::with_capacity(content.len() + 128);
    let mut inside = false;
    let mut replaced = false;
    for line in content.lines() {
        match line.trim() {
            BLOCK_START => {
                inside = true;
                if let (Some(block), false) = (&block, replaced) {
                    out.push_str(block);
                    replaced = true;
                }
            }
            BLOCK_END if inside => inside = false,
            _ if inside => {}
            _ => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    if let (Some(block), false) = (&block, replaced) {
        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(block);
    }
    out
}

#[cfg(windows)]
pub use registry::RegistryPathStore;

#[cfg(windows)]
mod registry {
    use super::PathStore;
    use crate::core::config::PathScope;
    use crate::error::{InstallerError, Result};
    use std::path::{Path, PathBuf};
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_SET_VALUE, REG_EXPAND_SZ};
    use winreg::{RegKey, RegValue, HKEY};

    const USER_ENV_KEY: &str = "Environment";
    const SYSTEM_ENV_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
    const PATH_VALUE: &str = "Path";

    /// `Path` value under HKLM or HKCU, written back as `REG_EXPAND_SZ`.
    pub struct RegistryPathStore {
        root: HKEY,
        subkey: &'static str,
    }

    impl RegistryPathStore {
        pub fn new(scope: PathScope) -> Self {
            match scope {
                PathScope::Machine => Self {
                    root: HKEY_LOCAL_MACHINE,
                    subkey: SYSTEM_ENV_KEY,
                },
                PathScope::User => Self {
                    root: HKEY_CURRENT_USER,
                    subkey: USER_ENV_KEY,
                },
            }
        }

        fn key_path(&self) -> PathBuf {
            let root = if self.root == HKEY_LOCAL_MACHINE {
                "HKLM"
            } else {
                "HKCU"
            };
            PathBuf::from(format!(r"{root}\{}", self.subkey))
        }
    }

    impl PathStore for RegistryPathStore {
        fn delimiter(&self) -> char {
            ';'
        }

        fn read(&self) -> Result<String> {
            let key = RegKey::predef(self.root)
                .open_subkey_with_flags(self.subkey, KEY_READ)
                .map_err(|e| InstallerError::from_io(e, &self.key_path()))?;
            match key.get_raw_value(PATH_VALUE) {
                Ok(raw) => Ok(decode_utf16(&raw.bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
                Err(e) => Err(InstallerError::from_io(e, &self.key_path())),
            }
        }

        fn write(&mut self, value: &str) -> Result<()> {
            let key = RegKey::predef(self.root)
                .open_subkey_with_flags(self.subkey, KEY_SET_VALUE)
                .map_err(|e| InstallerError::from_io(e, &self.key_path()))?;
            let raw = RegValue {
                bytes: encode_utf16(value),
                vtype: REG_EXPAND_SZ,
            };
            key.set_raw_value(PATH_VALUE, &raw)
                .map_err(|e| InstallerError::from_io(e, &self.key_path()))
        }

        fn ensure_writable(&self, _dir: &Path) -> Result<()> {
            RegKey::predef(self.root)
                .open_subkey_with_flags(self.subkey, KEY_SET_VALUE)
                .map_err(|e| InstallerError::from_io(e, &self.key_path()))?;
            Ok(())
        }

        fn describe(&self) -> String {
            self.key_path().display().to_string()
        }
    }

    fn decode_utf16(bytes: &[u8]) -> String {
        let mut units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        while units.last() == Some(&0) {
            units.pop();
        }
        String::from_utf16_lossy(&units)
    }

    fn encode_utf16(value: &str) -> Vec<u8> {
        value
            .encode_utf16()
            .chain(Some(0))
            .flat_map(u16::to_le_bytes)
            .collect()
    }
}
