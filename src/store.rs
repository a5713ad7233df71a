// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Exclusion store management.
//!
//! When the user declines to install optional software that asks to have
//! that choice remembered, the choice is recorded in the __exclusion store__.
//! Later runs consult the store before doing anything else, and skip the
//! software without prompting again.
//!
//! # Exclusion Store Layout
//!
//! The exclusion store is a flat directory, by default
//! `$HOME/.config/dotfiles/software`. Each exclusion is an empty marker file
//! named `no-<slug>`, where the slug is derived from the display name of the
//! software. So, `no-visual-studio-code` means that the user declined to
//! install "Visual Studio Code".
//!
//! Nothing in here ever removes a marker. The user removes the marker file
//! by hand to be asked again.

use std::{
    fs::{create_dir_all, File},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Persistent record of declined software.
#[derive(Debug, Clone)]
pub struct ExclusionStore {
    store_path: PathBuf,
}

impl ExclusionStore {
    /// Open exclusion store at target directory.
    ///
    /// Creates the directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - Return [`Error::CreateStore`] if directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store_path = path.into();
        create_dir_all(&store_path).map_err(|err| Error::CreateStore {
            source: err,
            store_path: store_path.clone(),
        })?;

        Ok(Self { store_path })
    }

    /// Path to exclusion store directory.
    pub fn path(&self) -> &Path {
        self.store_path.as_path()
    }

    /// Check if software was previously excluded.
    pub fn is_excluded(&self, name: impl AsRef<str>) -> bool {
        self.exclusion_file_path(name).exists()
    }

    /// Remember that software should not be offered again.
    ///
    /// # Errors
    ///
    /// - Return [`Error::WriteMarker`] if marker file cannot be created.
    pub fn set_excluded(&self, name: impl AsRef<str>) -> Result<()> {
        let marker = self.exclusion_file_path(name);
        debug!("write exclusion marker {:?}", marker.display());
        File::create(&marker).map_err(|err| Error::WriteMarker {
            source: err,
            marker,
        })?;

        Ok(())
    }

    /// Path to marker file of software.
    pub fn exclusion_file_path(&self, name: impl AsRef<str>) -> PathBuf {
        self.store_path
            .join(format!("no-{}", normalize_name(name.as_ref())))
    }
}

/// Derive marker slug from display name.
///
/// Lower-cases the name, turns spaces and slashes into hyphens, and strips a
/// trailing `.app` suffix. Distinct names can share a slug.
pub fn normalize_name(name: &str) -> String {
    let slug = name.to_lowercase().replace([' ', '/'], "-");
    match slug.strip_suffix(".app") {
        Some(stripped) => stripped.to_string(),
        None => slug,
    }
}

/// All possible error types for exclusion store interaction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store directory cannot be created.
    #[error("failed to create exclusion store at {:?}", store_path.display())]
    CreateStore {
        #[source]
        source: std::io::Error,
        store_path: PathBuf,
    },

    /// Marker file cannot be written.
    #[error("failed to write exclusion marker at {:?}", marker.display())]
    WriteMarker {
        #[source]
        source: std::io::Error,
        marker: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
