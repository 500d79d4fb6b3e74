use crate::error::{InstallerError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Posix,
}

impl Shell {
    /// Guesses the shell from a `$SHELL`-style value.
    pub fn from_shell_var(value: Option<&str>) -> Self {
        let name = value
            .map(Path::new)
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match name {
            "zsh" => Shell::Zsh,
            "bash" => Shell::Bash,
            "fish" => Shell::Fish,
            _ => Shell::Posix,
        }
    }

    pub fn config_file(self, home: &Path) -> PathBuf {
        match self {
            Shell::Zsh => home.join(".zshrc"),
            Shell::Bash => home.join(".bashrc"),
            Shell::Fish => home.join(".config").join("fish").join("config.fish"),
            Shell::Posix => home.join(".profile"),
        }
    }

    /// Line that appends `dirs` to `PATH` in this shell's syntax.
    pub fn path_export_line(self, dirs: &[String]) -> String {
        match self {
            Shell::Fish => {
                let quoted: Vec<String> = dirs.iter().map(|d| format!("\"{d}\"")).collect();
                format!("set -gx PATH $PATH {}", quoted.join(" "))
            }
            _ => format!("export PATH=\"$PATH:{}\"", dirs.join(":")),
        }
    }
}

/// Rejects directories that a double-quoted profile line cannot carry as-is.
/// `:` is refused too, since it would split the `PATH` entry.
pub fn check_profile_entry(dir: &str) -> Result<()> {
    match dir
        .chars()
        .find(|c| matches!(c, '"' | '$' | '`' | '\\' | ':' | '\n' | '\r'))
    {
        Some(c) => Err(InstallerError::Config {
            message: format!("cannot add {dir:?} to a shell profile: it contains {c:?}"),
        }),
        None => Ok(()),
    }
}

pub fn detect_shell() -> Shell {
    Shell::from_shell_var(std::env::var("SHELL").ok().as_deref())
}

pub fn get_shell_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(InstallerError::HomeDirectoryNotFound)?;
    Ok(detect_shell().config_file(&home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_shell_var() {
        assert_eq!(Shell::from_shell_var(Some("/usr/bin/zsh")), Shell::Zsh);
        assert_eq!(Shell::from_shell_var(Some("/bin/bash")), Shell::Bash);
        assert_eq!(Shell::from_shell_var(Some("/usr/local/bin/fish")), Shell::Fish);
        assert_eq!(Shell::from_shell_var(Some("/bin/dash")), Shell::Posix);
        assert_eq!(Shell::from_shell_var(None), Shell::Posix);
    }

    #[test]
    fn test_profile_entry_rejects_shell_metacharacters() {
        for dir in ["/opt/a\"b", "/opt/$HOME", "/opt/`id`", "/opt/a:b", "/opt/a\nb"] {
            assert!(check_profile_entry(dir).is_err(), "{dir:?}");
        }
        check_profile_entry("/opt/platform tools").unwrap();
        check_profile_entry("/home/dev/Android/platform-tools").unwrap();
    }

    #[test]
    fn test_export_lines() {
        let dirs = vec!["/opt/a".to_string(), "/opt/b".to_string()];
        assert_eq!(
            Shell::Bash.path_export_line(&dirs),
            "export PATH=\"$PATH:/opt/a:/opt/b\""
        );
        assert_eq!(
            Shell::Fish.path_export_line(&dirs),
            "set -gx PATH $PATH \"/opt/a\" \"/opt/b\""
        );
    }
}
