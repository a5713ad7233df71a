// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive installation.
//!
//! Plenty of software ships as a disk image, zip file, or gzipped tarball
//! instead of through a package manager. Archive installation downloads the
//! archive into a scratch directory, unpacks it, and copies either one named
//! member into the applications directory, or the entire unpacked tree next
//! to the artifact.
//!
//! Disk images are attached at a scratch mount point, copied out, and then
//! detached again no matter how the copy went.

use crate::installer::{
    download::{self, Downloader},
    syscall_interactive,
};

use std::{
    ffi::OsStr,
    fs::{create_dir_all, remove_dir},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Apple disk image.
    DiskImage,

    /// Zip file.
    Zip,

    /// Gzipped tarball.
    TarGz,
}

impl ArchiveFormat {
    /// Detect archive format.
    ///
    /// Source URL is inspected first, local file name second.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnsupportedFormat`] if neither gives a clue.
    pub fn detect(url: &str, local: &Path) -> Result<Self> {
        let url_lower = url.to_ascii_lowercase();
        let path_lower = local.to_string_lossy().to_ascii_lowercase();

        Self::from_url(&url_lower)
            .or_else(|| Self::from_path(&path_lower))
            .ok_or_else(|| Error::UnsupportedFormat {
                url: url.to_string(),
                path: local.to_path_buf(),
            })
    }

    fn from_url(url: &str) -> Option<Self> {
        if url.contains(".dmg") {
            Some(Self::DiskImage)
        } else if url.contains(".zip") {
            Some(Self::Zip)
        } else if url.contains(".tar.gz") || url.contains(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        if path.ends_with(".dmg") {
            Some(Self::DiskImage)
        } else if path.ends_with(".zip") {
            Some(Self::Zip)
        } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Install from archive at URL.
///
/// With `file`, the first entry of that name found in the archive is copied
/// into `applications_dir`. Without it, the whole archive is unpacked into
/// the parent directory of `artifact`.
///
/// # Errors
///
/// - Return [`Error::TempDir`] if scratch directory cannot be created.
/// - Return [`Error::Download`] if archive cannot be downloaded.
/// - Return [`Error::UnsupportedFormat`] if format cannot be determined.
/// - Return [`Error::MemberNotFound`] if `file` is not in archive.
/// - Return [`Error::Syscall`] if extraction or copy commands fail.
#[instrument(skip(applications_dir), level = "debug")]
pub fn install_from_archive(
    url: &str,
    file: Option<&str>,
    artifact: &Path,
    applications_dir: &Path,
) -> Result<()> {
    let scratch = tempfile::Builder::new()
        .prefix("mac-install-archive-")
        .tempdir()
        .map_err(Error::TempDir)?;
    let scratch_path = scratch.path().to_path_buf();

    let result = unpack_and_copy(&scratch_path, url, file, artifact, applications_dir);

    // INVARIANT: Scratch directory goes away on success and failure alike.
    if let Err(err) = scratch.close() {
        warn!(
            "failed to remove temporary directory {:?}: {err}",
            scratch_path.display()
        );
    }

    result
}

fn unpack_and_copy(
    scratch: &Path,
    url: &str,
    file: Option<&str>,
    artifact: &Path,
    applications_dir: &Path,
) -> Result<()> {
    let archive = Downloader::new()?.fetch(url, &scratch.join("archive"))?;
    let format = ArchiveFormat::detect(url, &archive)?;

    let extract_dir = scratch.join("extracted");
    make_dir(&extract_dir)?;
    extract(format, &archive, &extract_dir)?;

    match file {
        Some(file) => {
            let source =
                find_member(&extract_dir, file)?.ok_or_else(|| Error::MemberNotFound {
                    file: file.to_string(),
                })?;
            make_dir(applications_dir)?;
            let destination = applications_dir.join(file);
            info!("copy {file} to {:?}", destination.display());
            copy_path(&source, &destination)?;
        }
        None => {
            let destination = artifact.parent().unwrap_or(Path::new("/"));
            make_dir(destination)?;
            info!("copy archive contents to {:?}", destination.display());
            copy_contents(&extract_dir, destination)?;
        }
    }

    Ok(())
}

/// Unpack archive into extraction directory.
///
/// # Errors
///
/// - Return [`Error::Syscall`] if extraction commands fail.
/// - Return [`Error::CreateDir`] if disk image mount point cannot be created.
pub fn extract(format: ArchiveFormat, archive: &Path, extract_dir: &Path) -> Result<()> {
    debug!("extract {:?} as {format:?}", archive.display());
    match format {
        ArchiveFormat::DiskImage => extract_disk_image(archive, extract_dir)?,
        ArchiveFormat::Zip => syscall_interactive(
            "unzip",
            [
                OsStr::new("-q"),
                archive.as_os_str(),
                OsStr::new("-d"),
                extract_dir.as_os_str(),
            ],
            None,
        )?,
        ArchiveFormat::TarGz => syscall_interactive(
            "tar",
            [
                OsStr::new("-xzf"),
                archive.as_os_str(),
                OsStr::new("-C"),
                extract_dir.as_os_str(),
            ],
            None,
        )?,
    }

    Ok(())
}

fn extract_disk_image(image: &Path, extract_dir: &Path) -> Result<()> {
    let mount_point = extract_dir
        .parent()
        .unwrap_or(extract_dir)
        .join("dmg-mount");
    make_dir(&mount_point)?;

    let attached = syscall_interactive(
        "hdiutil",
        [
            OsStr::new("attach"),
            OsStr::new("-mountpoint"),
            mount_point.as_os_str(),
            OsStr::new("-nobrowse"),
            OsStr::new("-quiet"),
            image.as_os_str(),
        ],
        None,
    );
    let copied = match &attached {
        Ok(()) => copy_contents(&mount_point, extract_dir),
        Err(_) => Ok(()),
    };

    // INVARIANT: Always detach and remove mount point, even if copy failed.
    if let Err(err) = syscall_interactive(
        "hdiutil",
        [OsStr::new("detach"), mount_point.as_os_str()],
        None,
    ) {
        if attached.is_ok() {
            warn!("failed to detach {:?}: {err}", mount_point.display());
        }
    }
    if let Err(err) = remove_dir(&mount_point) {
        warn!(
            "failed to remove mount point {:?}: {err}",
            mount_point.display()
        );
    }

    attached?;
    copied?;

    Ok(())
}

/// Find first entry with given file name under directory.
///
/// # Errors
///
/// - Return [`Error::Walk`] if directory cannot be traversed.
pub fn find_member(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry?;
        if entry.file_name() == OsStr::new(name) {
            return Ok(Some(entry.into_path()));
        }
    }

    Ok(None)
}

/// Copy file or directory to destination.
///
/// # Errors
///
/// - Return [`Error::Syscall`] if copy fails.
pub fn copy_path(source: &Path, destination: &Path) -> Result<()> {
    if source.is_dir() {
        syscall_interactive(
            "cp",
            [OsStr::new("-R"), source.as_os_str(), destination.as_os_str()],
            None,
        )?;
    } else {
        syscall_interactive("cp", [source.as_os_str(), destination.as_os_str()], None)?;
    }

    Ok(())
}

/// Copy contents of directory, not directory itself, into destination.
fn copy_contents(source: &Path, destination: &Path) -> std::io::Result<()> {
    let contents = source.join(".");
    syscall_interactive(
        "cp",
        [OsStr::new("-R"), contents.as_os_str(), destination.as_os_str()],
        None,
    )
}

fn make_dir(path: &Path) -> Result<()> {
    create_dir_all(path).map_err(|err| Error::CreateDir {
        source: err,
        path: path.to_path_buf(),
    })
}

/// Archive installation error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// External program failed to run, or exited unsuccessfully.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),

    /// Scratch directory cannot be created.
    #[error("failed to create temporary directory")]
    TempDir(#[source] std::io::Error),

    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive cannot be downloaded.
    #[error("failed to download archive")]
    Download(#[from] download::Error),

    /// Archive format cannot be determined.
    #[error(
        "unsupported archive format: unable to determine type from URL {url:?} or file {:?}",
        path.display()
    )]
    UnsupportedFormat { url: String, path: PathBuf },

    /// Requested member is missing from archive.
    #[error("failed to find file {file:?} in archive")]
    MemberNotFound { file: String },

    /// Extracted archive cannot be traversed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
