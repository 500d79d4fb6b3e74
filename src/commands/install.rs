use crate::core::config::{InstallerConfig, PathScope};
use crate::core::installer::{self, InstallReport, Installer};
use crate::core::progress::{EventSender, InstallEvent};
use crate::core::request::InstallRequest;
use crate::core::state::{InstallState, Session, STATUS_FAILED};
use crate::error::{InstallerError, Result};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Flags of the `install` subcommand.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub destination: Option<PathBuf>,
    pub url: Option<String>,
    pub add_to_path: bool,
    pub create_shortcut: bool,
    pub user_scope: bool,
    pub interactive: bool,
}

pub async fn install(options: InstallOptions) -> Result<()> {
    let mut config = InstallerConfig::load()?;
    if options.user_scope {
        config.path_scope = PathScope::User;
    }

    let request = if options.interactive {
        prompt_request(&config, &options)?
    } else {
        request_from_options(&config, &options)
    }
    .with_absolute_destination()?;

    println!("📦 Installing Android SDK Platform Tools");
    println!("   Source: {}", request.source_url);
    println!("   Destination: {}", request.destination.display());
    println!();

    installer::preflight(&request.destination)?;

    let session = Session::new();
    session.begin()?;

    let mut installer = Installer::new(config)?;
    let (events, receiver) = EventSender::channel();
    let reporter = tokio::spawn(report_progress(receiver, session));

    let result = installer.run(&request, &events).await;
    drop(events);

    let session = reporter
        .await
        .map_err(|e| InstallerError::Io(std::io::Error::other(e)))?;

    match result {
        Ok(report) => {
            print_summary(&session, &report);
            Ok(())
        }
        Err(e) => {
            println!("❌ {STATUS_FAILED}");
            if matches!(e, InstallerError::Network { .. }) {
                println!("   The partially downloaded archive was left in the temp directory.");
            }
            Err(e)
        }
    }
}

fn request_from_options(config: &InstallerConfig, options: &InstallOptions) -> InstallRequest {
    let url = options
        .url
        .clone()
        .unwrap_or_else(|| config.source_url.clone());
    let destination = options
        .destination
        .clone()
        .unwrap_or_else(|| config.default_destination.clone());

    InstallRequest::new(url, destination)
        .add_to_search_path(options.add_to_path)
        .create_shortcut(options.create_shortcut)
}

/// Asks for the destination and both toggles, seeded from the flags.
fn prompt_request(config: &InstallerConfig, options: &InstallOptions) -> Result<InstallRequest> {
    let defaults = request_from_options(config, options);

    let destination: String = Input::new()
        .with_prompt("Installation directory")
        .default(defaults.destination.display().to_string())
        .interact_text()
        .map_err(prompt_error)?;

    let add_to_path = Confirm::new()
        .with_prompt("Add the directory to the system search path?")
        .default(defaults.add_to_search_path)
        .interact()
        .map_err(prompt_error)?;

    let create_shortcut = Confirm::new()
        .with_prompt("Create a desktop shortcut?")
        .default(defaults.create_shortcut)
        .interact()
        .map_err(prompt_error)?;

    Ok(InstallRequest::new(defaults.source_url, PathBuf::from(destination.trim()))
        .add_to_search_path(add_to_path)
        .create_shortcut(create_shortcut))
}

fn prompt_error(error: dialoguer::Error) -> InstallerError {
    match error {
        dialoguer::Error::IO(e) => InstallerError::Io(e),
    }
}

/// Drains install events into `session` and mirrors them on a progress bar.
/// Returns the session once the sender side is dropped.
async fn report_progress(
    mut receiver: UnboundedReceiver<InstallEvent>,
    mut session: Session,
) -> Session {
    let bar = ProgressBar::new_spinner();
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message(session.status().to_string());

    while let Some(event) = receiver.recv().await {
        let previous = session.state();
        let state = session.handle(&event);

        match &event {
            InstallEvent::Downloading {
                total_bytes: Some(total),
            } => {
                bar.set_length(*total);
                bar.set_style(bar_style());
            }
            InstallEvent::Progress { bytes_read, .. } => bar.set_position(*bytes_read),
            _ => {}
        }

        if state != previous {
            log::debug!("{previous:?} -> {state:?}");
        }
        match state {
            InstallState::Done => bar.finish_with_message(session.status().to_string()),
            InstallState::Failed => bar.abandon_with_message(
                session.last_error().unwrap_or(session.status()).to_string(),
            ),
            _ => bar.set_message(session.status().to_string()),
        }
    }

    session
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ")
}

fn print_summary(session: &Session, report: &InstallReport) {
    println!();
    println!("✅ {}", session.status());
    println!(
        "   {} bytes downloaded, {} files extracted ({:.0}%)",
        report.bytes_downloaded,
        report.files_extracted,
        session.percent()
    );

    match report.path_changed {
        Some(true) => {
            println!("   Added to the search path. Open a new terminal to pick it up.");
        }
        Some(false) => println!("   Already on the search path, nothing changed."),
        None => {}
    }

    if let Some(launcher) = &report.launcher {
        println!("   Shortcut: {}", launcher.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let config = InstallerConfig::default();
        let options = InstallOptions {
            destination: Some(PathBuf::from("/opt/platform-tools")),
            url: Some("https://mirror.example.com/tools.zip".to_string()),
            add_to_path: true,
            ..Default::default()
        };

        let request = request_from_options(&config, &options);
        assert_eq!(request.source_url, "https://mirror.example.com/tools.zip");
        assert_eq!(request.destination, PathBuf::from("/opt/platform-tools"));
        assert!(request.add_to_search_path);
        assert!(!request.create_shortcut);
    }

    #[test]
    fn test_config_defaults_used_without_flags() {
        let config = InstallerConfig::default();
        let request = request_from_options(&config, &InstallOptions::default());
        assert_eq!(request.source_url, config.source_url);
        assert_eq!(request.destination, config.default_destination);
    }

    #[tokio::test]
    async fn test_reporter_tracks_session() {
        let (events, receiver) = EventSender::channel();
        let reporter = tokio::spawn(report_progress(receiver, Session::new()));

        events.send(InstallEvent::Downloading { total_bytes: Some(4) });
        events.send(InstallEvent::Progress {
            bytes_read: 4,
            total_bytes: Some(4),
            progress: crate::core::progress::Progress::from_bytes(4, Some(4)),
        });
        events.send(InstallEvent::Extracting);
        events.send(InstallEvent::Finished);
        drop(events);

        let session = reporter.await.unwrap();
        assert_eq!(session.state(), InstallState::Done);
        assert_eq!(session.percent(), 100.0);
        assert!(session.trigger_enabled());
    }
}
