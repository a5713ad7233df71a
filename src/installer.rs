// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Installation method execution.
//!
//! Every installation or configuration step maps to one concrete action
//! against the local system. Most actions shell out to an external program
//! whose standard output and error are inherited, so the user sees exactly
//! what the package manager or script prints. The exit status of that
//! program is the only success signal of the step.
//!
//! # Installation Methods
//!
//! | method    | action                                              |
//! |-----------|-----------------------------------------------------|
//! | `brew`    | `brew install <formula>`                            |
//! | `cask`    | `brew install --cask <cask>`                        |
//! | `mas`     | `mas install <id>`, ID taken from raw ID or URL     |
//! | `npm`     | `npm install -g <package>`                          |
//! | `gem`     | `brew gem install <gem>`                            |
//! | `gomod`   | `brew gomod <module>`                               |
//! | `pipx`    | `pipx install <package>`                            |
//! | `run`     | `sh -c <command>` in manifest directory             |
//! | `script`  | `sh <script>` in manifest directory                 |
//! | `dl`      | HTTP download to artifact path                      |
//! | `archive` | download, unpack, and copy out of archive           |
//!
//! Homebrew and the tools it installs are invoked through absolute paths
//! under the Homebrew prefix, so that a Homebrew installed earlier in the
//! same run is usable right away.
//!
//! # See Also
//!
//! 1. [`download`]
//! 2. [`archive`]

pub mod archive;
pub mod download;

use crate::{
    config::{ConfigureStep, InstallStep},
    installer::download::Downloader,
};

use regex::Regex;
use std::{
    ffi::OsStr,
    fs::create_dir_all,
    path::{Path, PathBuf},
    process::Command,
    sync::LazyLock,
};
use tracing::{debug, instrument, warn};

/// Standard macOS applications directory.
pub const APPLICATIONS_DIR: &str = "/Applications";

static NUMERIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
static STORE_URL_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/id(\d+)").unwrap());

/// Layer of indirection for installation actions.
pub trait Installation {
    /// Check if artifact path or glob pattern exists.
    fn artifact_exists(&self, artifact: &str) -> bool;

    /// Execute installation steps in order.
    fn install(&self, steps: &[InstallStep], artifact: &str) -> Result<()>;

    /// Execute configuration steps in order.
    fn configure(&self, steps: &[ConfigureStep]) -> Result<()>;

    /// Fetch post-install caveats of Homebrew package.
    fn caveats(&self, package: &str) -> Option<String>;

    /// Launch application bundle.
    fn open_application(&self, application: &str) -> Result<()>;
}

/// Installation through the programs of the local system.
#[derive(Debug, Clone)]
pub struct SystemInstaller {
    work_dir: PathBuf,
    brew_prefix: PathBuf,
    applications_dir: PathBuf,
}

impl SystemInstaller {
    /// Construct new system installer.
    ///
    /// Shell commands and scripts run inside `work_dir`, which should be the
    /// directory of the manifest.
    pub fn new(work_dir: impl Into<PathBuf>, brew_prefix: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            brew_prefix: brew_prefix.into(),
            applications_dir: PathBuf::from(APPLICATIONS_DIR),
        }
    }

    /// Use different directory for application bundles pulled out of archives.
    pub fn with_applications_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.applications_dir = path.into();
        self
    }

    fn brew_bin(&self, name: &str) -> PathBuf {
        self.brew_prefix.join("bin").join(name)
    }

    fn execute_install_step(&self, step: &InstallStep, artifact: &str) -> Result<()> {
        match step {
            InstallStep::Brew(formula) => {
                syscall_interactive(self.brew_bin("brew"), ["install", formula.as_str()], None)?
            }
            InstallStep::Cask(cask) => syscall_interactive(
                self.brew_bin("brew"),
                ["install", "--cask", cask.as_str()],
                None,
            )?,
            InstallStep::Mas(app) => {
                syscall_interactive(self.brew_bin("mas"), ["install", app_store_id(app)], None)?
            }
            InstallStep::Npm(package) => syscall_interactive(
                self.brew_bin("npm"),
                ["install", "-g", package.as_str()],
                None,
            )?,
            InstallStep::Gem(gem) => syscall_interactive(
                self.brew_bin("brew"),
                ["gem", "install", gem.as_str()],
                None,
            )?,
            InstallStep::GoMod(module) => {
                syscall_interactive(self.brew_bin("brew"), ["gomod", module.as_str()], None)?
            }
            InstallStep::Pipx(package) => {
                syscall_interactive(self.brew_bin("pipx"), ["install", package.as_str()], None)?
            }
            InstallStep::Run(command) => self.run_shell(command)?,
            InstallStep::Script(script) => self.run_script(script)?,
            InstallStep::Download(url) => {
                let target = Path::new(artifact);
                if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                    create_dir_all(parent).map_err(|err| Error::CreateDir {
                        source: err,
                        path: parent.to_path_buf(),
                    })?;
                }
                Downloader::new()?.fetch(url, target)?;
            }
            InstallStep::Archive { url, file } => archive::install_from_archive(
                url,
                file.as_deref(),
                Path::new(artifact),
                &self.applications_dir,
            )?,
        }

        Ok(())
    }

    fn execute_configure_step(&self, step: &ConfigureStep) -> Result<()> {
        match step {
            ConfigureStep::Run(command) => self.run_shell(command),
            ConfigureStep::Script(script) => self.run_script(script),
            ConfigureStep::IgnoreErrors(_) => Ok(()),
        }
    }

    fn run_shell(&self, command: &str) -> Result<()> {
        Ok(syscall_interactive("sh", ["-c", command], Some(&self.work_dir))?)
    }

    fn run_script(&self, script: &str) -> Result<()> {
        Ok(syscall_interactive("sh", [script], Some(&self.work_dir))?)
    }
}

impl Installation for SystemInstaller {
    fn artifact_exists(&self, artifact: &str) -> bool {
        artifact_exists(artifact)
    }

    #[instrument(skip(self, steps), level = "debug")]
    fn install(&self, steps: &[InstallStep], artifact: &str) -> Result<()> {
        for step in steps {
            debug!("install step: {step}");
            self.execute_install_step(step, artifact)
                .map_err(|err| Error::InstallStep {
                    step: step.to_string(),
                    source: Box::new(err),
                })?;
        }

        Ok(())
    }

    #[instrument(skip(self, steps), level = "debug")]
    fn configure(&self, steps: &[ConfigureStep]) -> Result<()> {
        let mut ignore_errors = false;

        for step in steps {
            // INVARIANT: Toggle applies to every following step until changed.
            if let ConfigureStep::IgnoreErrors(value) = step {
                ignore_errors = *value;
                continue;
            }

            debug!("configure step: {step}");
            if let Err(err) = self.execute_configure_step(step) {
                if ignore_errors {
                    warn!("configuration step {step} failed (ignored): {err}");
                    continue;
                }

                return Err(Error::ConfigureStep {
                    step: step.to_string(),
                    source: Box::new(err),
                });
            }
        }

        Ok(())
    }

    fn caveats(&self, package: &str) -> Option<String> {
        let output = syscall_non_interactive(self.brew_bin("brew"), ["caveats", package])
            .inspect_err(|err| debug!("no caveats for {package}: {err}"))
            .ok()?;

        let caveats = output.trim();
        if caveats.is_empty() || caveats.contains("has no caveats") {
            return None;
        }

        Some(caveats.to_string())
    }

    fn open_application(&self, application: &str) -> Result<()> {
        Ok(syscall_interactive("open", ["-a", application], None)?)
    }
}

/// Check if artifact exists.
///
/// Paths with an asterisk are treated as glob patterns, where any match
/// counts. A pattern that is malformed or matches nothing falls back to a
/// literal existence check, so names like `Foo [Beta].app` still resolve.
pub fn artifact_exists(artifact: &str) -> bool {
    if artifact.contains('*') {
        match glob::glob(artifact) {
            Ok(mut paths) => {
                if paths.any(|entry| entry.is_ok()) {
                    return true;
                }
            }
            Err(err) => debug!("invalid artifact pattern {artifact:?}: {err}"),
        }
    }

    Path::new(artifact).exists()
}

/// Extract Mac App Store ID from raw ID or store URL.
///
/// Returns input unchanged if no ID can be found, and lets `mas` complain.
pub fn app_store_id(value: &str) -> &str {
    if NUMERIC_ID.is_match(value) {
        return value;
    }

    STORE_URL_ID
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map_or(value, |id| id.as_str())
}

pub(crate) fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    work_dir: Option<&Path>,
) -> std::io::Result<()> {
    let mut command = Command::new(cmd.as_ref());
    command.args(args);
    if let Some(dir) = work_dir {
        command.current_dir(dir);
    }

    debug!("execute {command:?}");
    let status = command.spawn()?.wait()?;
    if !status.success() {
        return Err(std::io::Error::other(format!(
            "command {:?} failed with {status}",
            cmd.as_ref()
        )));
    }

    Ok(())
}

pub(crate) fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> std::io::Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(output.stderr.as_slice());
        return Err(std::io::Error::other(format!(
            "command {:?} failed:\n{}",
            cmd.as_ref(),
            stderr.trim_end()
        )));
    }

    Ok(String::from_utf8_lossy(output.stdout.as_slice()).into_owned())
}

/// Installation error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// External program failed to run, or exited unsuccessfully.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),

    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Download method fails.
    #[error("download installation failed")]
    Download(#[from] download::Error),

    /// Archive method fails.
    #[error("archive installation failed")]
    Archive(#[from] archive::Error),

    /// Installation step fails.
    #[error("installation step {step} failed")]
    InstallStep {
        #[source]
        source: Box<Error>,
        step: String,
    },

    /// Configuration step fails.
    #[error("configuration step {step} failed")]
    ConfigureStep {
        #[source]
        source: Box<Error>,
        step: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
