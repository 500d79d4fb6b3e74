use crate::core::config::{InstallerConfig, PathScope};
use crate::core::search_path::{self, PathStore};
use crate::error::Result;
use crate::utils::fs;
use std::path::{Path, PathBuf};

/// What `doctor` found for one installation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub destination: PathBuf,
    pub destination_exists: bool,
    pub executable: PathBuf,
    pub executable_ok: bool,
    /// `None` when the search-path store could not be read.
    pub registered: Option<bool>,
    pub store: String,
    pub launcher: Option<PathBuf>,
    pub launcher_exists: bool,
    /// Where the executable resolves from the current `PATH`, if anywhere.
    pub resolved: Option<PathBuf>,
}

impl Diagnosis {
    pub fn issues(&self) -> usize {
        [
            !self.destination_exists,
            !self.executable_ok,
            self.registered != Some(true),
            !self.launcher_exists,
        ]
        .iter()
        .filter(|issue| **issue)
        .count()
    }
}

pub fn check_environment(destination: Option<PathBuf>, user_scope: bool) -> Result<()> {
    println!("🔍 Platform Tools Installer - Environment Check");
    println!();

    let mut config = InstallerConfig::load()?;
    if user_scope {
        config.path_scope = PathScope::User;
    }
    let destination = destination.unwrap_or_else(|| config.default_destination.clone());
    let store = search_path::default_store(config.path_scope)?;
    let launcher = config.launcher_path().ok();

    let diagnosis = diagnose(&config, &destination, store.as_ref(), launcher);
    print_diagnosis(&diagnosis);
    Ok(())
}

pub fn diagnose(
    config: &InstallerConfig,
    destination: &Path,
    store: &dyn PathStore,
    launcher: Option<PathBuf>,
) -> Diagnosis {
    let executable = config.launcher_target(destination);
    let registered = match search_path::is_registered(store, destination) {
        Ok(found) => Some(found),
        Err(e) => {
            log::warn!("Could not read {}: {e}", store.describe());
            None
        }
    };
    let launcher_exists = launcher.as_ref().is_some_and(|path| path.exists());

    Diagnosis {
        destination: destination.to_path_buf(),
        destination_exists: destination.is_dir(),
        executable_ok: fs::is_executable(&executable),
        executable,
        registered,
        store: store.describe(),
        launcher,
        launcher_exists,
        resolved: which::which(&config.launcher_executable).ok(),
    }
}

fn print_diagnosis(diagnosis: &Diagnosis) {
    println!("📁 Installation:");
    println!("  directory: {}", diagnosis.destination.display());
    if diagnosis.destination_exists {
        println!("    ✅ exists");
    } else {
        println!("    ❌ missing");
    }

    println!("  executable: {}", diagnosis.executable.display());
    if diagnosis.executable_ok {
        println!("    ✅ present and executable");
    } else {
        println!("    ❌ missing or not executable");
    }

    println!();
    println!("🛣️  Search Path:");
    println!("  store: {}", diagnosis.store);
    match diagnosis.registered {
        Some(true) => println!("  ✅ directory is registered"),
        Some(false) => {
            println!("  ❌ directory is NOT registered");
            println!("    Run 'ptinstall install --add-to-path' to add it");
        }
        None => println!("  ❌ could not read the search path"),
    }

    match &diagnosis.resolved {
        Some(path) if path.starts_with(&diagnosis.destination) => {
            println!("  ✅ resolves to {}", path.display());
        }
        Some(path) => {
            println!("  ⚠️  resolves to another copy: {}", path.display());
        }
        None => println!("  ⚠️  not found on the current PATH (open a new terminal?)"),
    }

    println!();
    println!("🖥️  Shortcut:");
    match &diagnosis.launcher {
        Some(path) => {
            println!("  location: {}", path.display());
            if diagnosis.launcher_exists {
                println!("    ✅ exists");
            } else {
                println!("    ❌ missing");
            }
        }
        None => println!("  ❌ no desktop directory found"),
    }

    println!();
    let issues = diagnosis.issues();
    if issues == 0 {
        println!("✅ Environment check completed - no issues found!");
    } else {
        println!("⚠️  Environment check completed - {issues} issue(s) found");
        println!();
        println!("💡 Suggested fixes:");
        println!("  • Reinstall with: ptinstall install --add-to-path --create-shortcut");
    }
}
