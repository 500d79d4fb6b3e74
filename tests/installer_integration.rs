mod common;

use common::{leftover_archives, platform_tools_zip, serve, Reply};
use pretty_assertions::assert_eq;
use ptinstall::core::config::InstallerConfig;
use ptinstall::core::progress::{EventSender, InstallEvent};
use ptinstall::core::search_path::{MemoryPathStore, PathStore, SearchPath};
use ptinstall::core::state::{InstallState, Session, STATUS_DONE, STATUS_FAILED};
use ptinstall::{InstallRequest, Installer, InstallerError};
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;

fn test_config(temp_dir: &Path) -> InstallerConfig {
    InstallerConfig {
        temp_dir: Some(temp_dir.to_path_buf()),
        connect_timeout_secs: 5,
        ..InstallerConfig::default()
    }
}

fn collect(mut receiver: UnboundedReceiver<InstallEvent>) -> Vec<InstallEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

fn replay(events: &[InstallEvent]) -> Session {
    let mut session = Session::new();
    for event in events {
        session.handle(event);
    }
    session
}

#[tokio::test]
async fn test_full_install_with_path_and_shortcut() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = tmp.path().join("cache");
    let destination = tmp.path().join("platform-tools");
    let launcher = tmp.path().join("Desktop").join("Platform Tools.command");

    let archive = platform_tools_zip(10 * 1024 * 1024);
    let url = serve(Reply::Body(archive.clone())).await;

    let mut installer = Installer::new(test_config(&cache))
        .unwrap()
        .with_path_store(Box::new(MemoryPathStore::new(";", ';')))
        .with_launcher_path(launcher.clone());

    let request = InstallRequest::new(url, &destination)
        .add_to_search_path(true)
        .create_shortcut(true);

    let (events, receiver) = EventSender::channel();
    let report = installer.run(&request, &events).await.unwrap();
    drop(events);

    assert_eq!(report.bytes_downloaded, archive.len() as u64);
    assert_eq!(report.path_changed, Some(true));
    assert_eq!(report.launcher.as_deref(), Some(launcher.as_path()));

    assert!(destination.join("adb").is_file());
    assert!(destination.join("lib64").join("payload.bin").is_file());
    assert!(!destination.join("platform-tools").exists());

    let stored = installer.path_store().unwrap().read().unwrap();
    let dir = destination.to_string_lossy();
    assert_eq!(SearchPath::parse(&stored, ';').count(&dir), 1);

    let launchers: Vec<_> = std::fs::read_dir(launcher.parent().unwrap())
        .unwrap()
        .collect();
    assert_eq!(launchers.len(), 1);

    assert!(leftover_archives(&cache).is_empty());

    let session = replay(&collect(receiver));
    assert_eq!(session.state(), InstallState::Done);
    assert_eq!(session.status(), STATUS_DONE);
    assert_eq!(session.percent(), 100.0);
    assert!(session.trigger_enabled());
}

#[tokio::test]
async fn test_progress_is_monotonic_and_bounded() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = tmp.path().join("cache");
    let archive = platform_tools_zip(256 * 1024);
    let url = serve(Reply::Body(archive)).await;

    let mut installer = Installer::new(test_config(&cache)).unwrap();
    let request = InstallRequest::new(url, tmp.path().join("out"));

    let (events, receiver) = EventSender::channel();
    installer.run(&request, &events).await.unwrap();
    drop(events);

    let percents: Vec<f64> = collect(receiver)
        .into_iter()
        .filter_map(|event| match event {
            InstallEvent::Progress { progress, .. } => progress.percent(),
            _ => None,
        })
        .collect();

    assert!(!percents.is_empty());
    assert!(percents.iter().all(|p| (0.0..=100.0).contains(p)));
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last().copied(), Some(100.0));
}

#[tokio::test]
async fn test_registering_twice_keeps_one_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = tmp.path().join("cache");
    let destination = tmp.path().join("platform-tools");
    let url = serve(Reply::Body(platform_tools_zip(1024))).await;

    let mut installer = Installer::new(test_config(&cache))
        .unwrap()
        .with_path_store(Box::new(MemoryPathStore::new("C:\\Windows", ';')));
    let request = InstallRequest::new(url, &destination).add_to_search_path(true);

    let first = installer
        .run(&request, &EventSender::disabled())
        .await
        .unwrap();
    let second = installer
        .run(&request, &EventSender::disabled())
        .await
        .unwrap();

    assert_eq!(first.path_changed, Some(true));
    assert_eq!(second.path_changed, Some(false));
    assert_eq!(first.files_extracted, second.files_extracted);

    let stored = installer.path_store().unwrap().read().unwrap();
    assert!(stored.starts_with("C:\\Windows;"));
    assert_eq!(
        SearchPath::parse(&stored, ';').count(&destination.to_string_lossy()),
        1
    );
}

#[tokio::test]
async fn test_truncated_download_fails_and_keeps_partial_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = tmp.path().join("cache");
    let destination = tmp.path().join("platform-tools");
    let url = serve(Reply::Truncated {
        body: vec![0x50; 4096],
        declared: 64 * 1024,
    })
    .await;

    let mut installer = Installer::new(test_config(&cache)).unwrap();
    let request = InstallRequest::new(url, &destination).create_shortcut(true);

    let (events, receiver) = EventSender::channel();
    let err = installer.run(&request, &events).await.unwrap_err();
    drop(events);

    assert!(matches!(err, InstallerError::Network { .. }), "{err:?}");
    assert_eq!(err.kind(), "NetworkError");
    assert!(!destination.exists());

    let leftovers = leftover_archives(&cache);
    assert_eq!(leftovers.len(), 1);
    assert!(std::fs::metadata(&leftovers[0]).unwrap().len() < 64 * 1024);

    let session = replay(&collect(receiver));
    assert_eq!(session.state(), InstallState::Failed);
    assert_eq!(session.status(), STATUS_FAILED);
    assert!(session.last_error().is_some());
    assert!(session.trigger_enabled());
}

#[tokio::test]
async fn test_http_error_status_is_network_error() {
    let tmp = tempfile::tempdir().unwrap();
    let url = serve(Reply::Status(404)).await;

    let mut installer = Installer::new(test_config(&tmp.path().join("cache"))).unwrap();
    let request = InstallRequest::new(url, tmp.path().join("out"));

    let err = installer
        .run(&request, &EventSender::disabled())
        .await
        .unwrap_err();
    assert!(matches!(err, InstallerError::Network { .. }), "{err:?}");
}

#[tokio::test]
async fn test_corrupt_archive_is_archive_error() {
    let tmp = tempfile::tempdir().unwrap();
    let url = serve(Reply::Body(b"<html>not a zip</html>".to_vec())).await;

    let mut installer = Installer::new(test_config(&tmp.path().join("cache"))).unwrap();
    let request = InstallRequest::new(url, tmp.path().join("out"));

    let err = installer
        .run(&request, &EventSender::disabled())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ArchiveError");
}

#[tokio::test]
async fn test_update_check_reports_availability() {
    let tmp = tempfile::tempdir().unwrap();
    let installer = Installer::new(test_config(tmp.path())).unwrap();

    let url = serve(Reply::Body(platform_tools_zip(2048))).await;
    let check = installer.check_for_update(&url).await.unwrap();
    assert!(check.available);
    assert_eq!(check.status, 200);
    assert_eq!(check.etag.as_deref(), Some("\"platform-tools-test\""));
    assert!(check.content_length.is_some());

    let url = serve(Reply::Status(404)).await;
    let check = installer.check_for_update(&url).await.unwrap();
    assert!(!check.available);
    assert_eq!(check.status, 404);
}

#[tokio::test]
async fn test_unwritable_destination_fails_preflight() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let result = ptinstall::core::installer::preflight(&blocker.join("platform-tools"));
    assert!(result.is_err());
}
