// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Homebrew prefix on Apple Silicon machines.
pub const APPLE_SILICON_BREW_PREFIX: &str = "/opt/homebrew";

/// Homebrew prefix on Intel machines.
pub const INTEL_BREW_PREFIX: &str = "/usr/local";

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to exclusion store directory.
///
/// Uses `$HOME/.config/dotfiles/software` so that exclusion markers survive
/// across reinstalls of the tool itself. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_exclusion_store_dir() -> Result<PathBuf> {
    home_dir().map(|path| path.join(".config").join("dotfiles").join("software"))
}

/// Determine Homebrew prefix of current machine.
///
/// Intel installs keep their `brew` binary at `/usr/local/bin/brew`. If that
/// binary is absent, then the Apple Silicon prefix is assumed, even if
/// Homebrew is not installed yet.
pub fn detect_brew_prefix() -> PathBuf {
    brew_prefix_under(Path::new("/"))
}

fn brew_prefix_under(root: &Path) -> PathBuf {
    let intel = root.join(INTEL_BREW_PREFIX.trim_start_matches('/'));
    if intel.join("bin").join("brew").exists() {
        return PathBuf::from(INTEL_BREW_PREFIX);
    }

    PathBuf::from(APPLE_SILICON_BREW_PREFIX)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
