use crate::error::{InstallerError, Result};
use crate::utils::fs;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherKind {
    /// Windows shell link, written through `WScript.Shell`.
    Shortcut,
    /// freedesktop.org desktop entry.
    DesktopEntry,
    /// Executable shell script, e.g. a macOS `.command` file.
    Script,
}

impl LauncherKind {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("lnk") => LauncherKind::Shortcut,
            Some("desktop") => LauncherKind::DesktopEntry,
            _ => LauncherKind::Script,
        }
    }
}

/// Writes a launcher at `output` that starts `target` with the target's
/// directory as working directory. An existing launcher is replaced.
pub fn create_launcher(target: &Path, output: &Path) -> Result<()> {
    let working_dir = target.parent().unwrap_or_else(|| Path::new("."));
    let name = output
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| InstallerError::launcher("launcher name is empty"))?;

    if let Some(parent) = output.parent() {
        fs::ensure_dir_exists(parent)?;
    }

    let kind = LauncherKind::for_path(output);
    log::info!(
        "Creating {kind:?} launcher {} -> {}",
        output.display(),
        target.display()
    );

    match kind {
        LauncherKind::Shortcut => write_shortcut(target, working_dir, output, name),
        LauncherKind::DesktopEntry => {
            write_file(output, &desktop_entry(target, working_dir, name))?;
            fs::make_executable(output)
        }
        LauncherKind::Script => {
            write_file(output, &shell_script(target, working_dir))?;
            fs::make_executable(output)
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| InstallerError::from_io(e, path))
}

fn write_shortcut(target: &Path, working_dir: &Path, output: &Path, name: &str) -> Result<()> {
    let script = format!(
        "$WshShell = New-Object -ComObject WScript.Shell; \
         $Shortcut = $WshShell.CreateShortcut({lnk}); \
         $Shortcut.TargetPath = {target}; \
         $Shortcut.WorkingDirectory = {dir}; \
         $Shortcut.Description = {name}; \
         $Shortcut.Save();",
        lnk = ps_quote(&output.display().to_string()),
        target = ps_quote(&target.display().to_string()),
        dir = ps_quote(&working_dir.display().to_string()),
        name = ps_quote(name),
    );

    let output_status = Command::new("powershell")
        .arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-Command")
        .arg(script)
        .output()?;

    if !output_status.status.success() {
        let stderr = String::from_utf8_lossy(&output_status.stderr);
        return Err(InstallerError::launcher(format!(
            "failed to create shortcut (exit {:?}): {}",
            output_status.status.code(),
            stderr.trim()
        )));
    }
    Ok(())
}

fn desktop_entry(target: &Path, working_dir: &Path, name: &str) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Version=1.0\n\
         Name={name}\n\
         Comment={name}\n\
         Exec={exec}\n\
         Path={dir}\n\
         Terminal=true\n",
        exec = desktop_exec_quote(&target.display().to_string()),
        dir = working_dir.display(),
    )
}

fn shell_script(target: &Path, working_dir: &Path) -> String {
    format!(
        "#!/bin/sh\ncd {} && exec {} \"$@\"\n",
        sh_quote(&working_dir.display().to_string()),
        sh_quote(&target.display().to_string()),
    )
}

fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quoting rules for the `Exec` key of a desktop entry.
fn desktop_exec_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(LauncherKind::for_path(Path::new("Platform Tools.lnk")), LauncherKind::Shortcut);
        assert_eq!(LauncherKind::for_path(Path::new("Platform Tools.LNK")), LauncherKind::Shortcut);
        assert_eq!(
            LauncherKind::for_path(Path::new("platform-tools.desktop")),
            LauncherKind::DesktopEntry
        );
        assert_eq!(LauncherKind::for_path(Path::new("Platform Tools.command")), LauncherKind::Script);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(ps_quote("C:\\Bob's Tools"), "'C:\\Bob''s Tools'");
        assert_eq!(sh_quote("/opt/it's"), "'/opt/it'\\''s'");
        assert_eq!(desktop_exec_quote("/opt/$HOME/adb"), "\"/opt/\\$HOME/adb\"");
    }

    #[cfg(unix)]
    #[test]
    fn test_desktop_entry_written() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("tools").join("adb");
        let output = tmp.path().join("Desktop").join("platform-tools.desktop");

        create_launcher(&target, &output).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("[Desktop Entry]\n"));
        assert!(content.contains("Name=platform-tools\n"));
        assert!(content.contains(&format!("Exec=\"{}\"\n", target.display())));
        assert!(content.contains(&format!("Path={}\n", tmp.path().join("tools").display())));
        assert!(fs::is_executable(&output));
    }

    #[test]
    fn test_script_launcher_replaces_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("adb");
        let output = tmp.path().join("Platform Tools.command");
        std::fs::write(&output, "stale").unwrap();

        create_launcher(&target, &output).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("#!/bin/sh\n"));
        assert!(content.contains(&format!("exec '{}'", target.display())));
    }
}
