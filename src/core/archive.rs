use crate::error::{InstallerError, Result};
use crate::utils::fs;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    TarGz,
}

/// Extracts `archive_path` into `destination`, overwriting existing files.
///
/// `destination` is created first. When `archive_root` is given, a leading
/// directory with that name is stripped from every entry. Returns the number
/// of files written.
pub fn extract_archive(
    archive_path: &Path,
    destination: &Path,
    archive_root: Option<&str>,
) -> Result<usize> {
    log::info!(
        "Extracting {} to {}",
        archive_path.display(),
        destination.display()
    );

    fs::ensure_dir_exists(destination)?;

    let root = archive_root.filter(|r| !r.is_empty());
    let count = match detect_format(archive_path)? {
        ArchiveFormat::Zip => extract_zip(archive_path, destination, root)?,
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, destination, root)?,
    };

    log::info!("Extraction completed ({count} files)");
    Ok(count)
}

fn detect_format(archive_path: &Path) -> Result<ArchiveFormat> {
    let mut magic = [0u8; 4];
    let read = File::open(archive_path)?.read(&mut magic)?;
    let magic = &magic[..read];

    if magic.starts_with(b"PK\x03\x04") || magic.starts_with(b"PK\x05\x06") {
        return Ok(ArchiveFormat::Zip);
    }
    if magic.starts_with(&[0x1f, 0x8b]) {
        return Ok(ArchiveFormat::TarGz);
    }

    // Fall back on the name for empty or truncated files so the error
    // below comes from the right decoder.
    let file_name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if file_name.ends_with(".zip") {
        Ok(ArchiveFormat::Zip)
    } else if file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz") {
        Ok(ArchiveFormat::TarGz)
    } else {
        Err(InstallerError::archive(
            archive_path,
            "unsupported archive format",
        ))
    }
}

fn extract_zip(archive_path: &Path, destination: &Path, root: Option<&str>) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| zip_error(archive_path, e))?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| zip_error(archive_path, e))?;
        let Some(relative) = file.enclosed_name().and_then(|p| strip_root(&p, root)) else {
            log::debug!("Skipping entry {}", file.name());
            continue;
        };
        let outpath = destination.join(relative);

        if file.is_dir() {
            fs::ensure_dir_exists(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::ensure_dir_exists(parent)?;
        }
        let mut outfile =
            File::create(&outpath).map_err(|e| InstallerError::from_io(e, &outpath))?;
        std::io::copy(&mut file, &mut outfile).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => InstallerError::archive(archive_path, e.to_string()),
            _ => InstallerError::from_io(e, &outpath),
        })?;
        count += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                    .map_err(|e| InstallerError::from_io(e, &outpath))?;
            }
        }
        // Zips built on Windows carry no exec bits, and the tools must run.
        if !fs::is_executable(&outpath) {
            fs::make_executable(&outpath)?;
        }
    }

    Ok(count)
}

fn extract_tar_gz(archive_path: &Path, destination: &Path, root: Option<&str>) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let root_dir = destination
        .canonicalize()
        .map_err(|e| InstallerError::from_io(e, destination))?;
    let mut count = 0;

    let entries = archive
        .entries()
        .map_err(|e| InstallerError::archive(archive_path, e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| InstallerError::archive(archive_path, e.to_string()))?;
        let path = entry
            .path()
            .map_err(|e| InstallerError::archive(archive_path, e.to_string()))?
            .into_owned();

        let Some(relative) = enclosed(&path).and_then(|p| strip_root(&p, root)) else {
            log::debug!("Skipping entry {}", path.display());
            continue;
        };
        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            log::warn!("Skipping link entry {}", path.display());
            continue;
        }
        let outpath = destination.join(relative);

        if let Some(parent) = outpath.parent() {
            fs::ensure_dir_exists(parent)?;
            if !is_within(&root_dir, parent)? {
                log::warn!("Skipping entry {} outside the destination", path.display());
                continue;
            }
        }
        let is_file = entry.header().entry_type().is_file();
        entry.unpack(&outpath).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => InstallerError::Permission {
                path: outpath.clone(),
            },
            _ => InstallerError::archive(archive_path, e.to_string()),
        })?;
        if is_file {
            count += 1;
        }
    }

    Ok(count)
}

/// Whether `dir` resolves inside `root_dir`, following links already on disk.
fn is_within(root_dir: &Path, dir: &Path) -> Result<bool> {
    let resolved = dir
        .canonicalize()
        .map_err(|e| InstallerError::from_io(e, dir))?;
    Ok(resolved.starts_with(root_dir))
}

/// Rejects absolute paths and `..` components.
fn enclosed(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Drops a leading `root` directory. `None` for the root itself or an empty path.
fn strip_root(path: &Path, root: Option<&str>) -> Option<PathBuf> {
    let stripped = match root {
        Some(root) => path.strip_prefix(root).unwrap_or(path),
        None => path,
    };
    if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(stripped.to_path_buf())
    }
}

fn zip_error(archive_path: &Path, error: zip::result::ZipError) -> InstallerError {
    match error {
        zip::result::ZipError::Io(e) if e.kind() != std::io::ErrorKind::UnexpectedEof => {
            InstallerError::Io(e)
        }
        other => InstallerError::archive(archive_path, other.to_string()),
    }
}
