// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the installation manifest, and resolve the handful
//! of variables that artifact and checklist paths may embed.
//!
//! # General Layout
//!
//! A manifest names a checklist document, and lists install groups. Each
//! install group holds a listing of software entries. Each software entry
//! names an __artifact__, i.e., a path or glob pattern whose existence proves
//! that the software is installed, along with the steps needed to install
//! and configure it.
//!
//! ```toml
//! checklist = "$HOME/SystemSetup.md"
//!
//! [[install_group]]
//! group = "Development"
//! optional = false
//!
//! [[install_group.software]]
//! name = "Visual Studio Code"
//! artifact = "/Applications/Visual Studio Code.app"
//! install = [{ cask = "visual-studio-code" }]
//! checklist = ["Sign in to settings sync"]
//! ```
//!
//! # Variable Substitution
//!
//! Artifact and checklist paths go through substitution at load time:
//!
//! - `~` and `$HOME` become the user's home directory.
//! - `$BREW` becomes the Homebrew prefix.
//! - `$ENV_<NAME>` becomes the value of environment variable `<NAME>`, which
//!   must be set and non-empty.
//!
//! Any other variable is left untouched.

use crate::path::{detect_brew_prefix, home_dir, NoWayHome};

use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
};

const INTERNAL_MANIFEST: &str = include_str!("../assets/internal.toml");

/// Values needed to resolve variables in a manifest.
///
/// Computed once at startup, and handed down as plain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    /// User's home directory.
    pub home: PathBuf,

    /// Homebrew installation prefix.
    pub brew_prefix: PathBuf,
}

impl ResolveContext {
    /// Construct new resolution context.
    pub fn new(home: impl Into<PathBuf>, brew_prefix: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            brew_prefix: brew_prefix.into(),
        }
    }

    /// Detect resolution context of current machine.
    ///
    /// # Errors
    ///
    /// - Return [`Error::NoWayHome`] if home directory cannot be determined.
    pub fn detect() -> Result<Self> {
        Ok(Self::new(home_dir()?, detect_brew_prefix()))
    }

    /// Substitute supported variables in given input.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ShellExpansion`] if an `$ENV_` variable is unset.
    pub fn expand(&self, input: &str) -> Result<String> {
        let home = self.home.to_string_lossy().into_owned();
        let brew = self.brew_prefix.to_string_lossy().into_owned();

        let expanded = shellexpand::full_with_context(
            input,
            || Some(home.as_str()),
            |var: &str| -> std::result::Result<Option<String>, std::env::VarError> {
                match var {
                    "HOME" => Ok(Some(home.clone())),
                    "BREW" => Ok(Some(brew.clone())),
                    _ => match var.strip_prefix("ENV_") {
                        Some(name) => match std::env::var(name) {
                            Ok(value) if !value.is_empty() => Ok(Some(value)),
                            Ok(_) => Err(std::env::VarError::NotPresent),
                            Err(err) => Err(err),
                        },
                        None => Ok(None),
                    },
                }
            },
        )?;

        Ok(expanded.into_owned())
    }

    /// Label an artifact path for display.
    ///
    /// Home directory becomes `~`. Paths that live inside an applications
    /// folder or a bin directory are reduced to their file name.
    pub fn artifact_label(&self, artifact: &str) -> String {
        let home = self.home.to_string_lossy();
        let artifact = match artifact.strip_prefix(home.as_ref()) {
            Some(rest) if !home.is_empty() => format!("~{rest}"),
            _ => artifact.to_string(),
        };

        if artifact.contains("/Applications/") || artifact.contains("/bin/") {
            if let Some(name) = Path::new(&artifact).file_name() {
                return name.to_string_lossy().into_owned();
            }
        }

        artifact
    }
}

/// Installation manifest.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Path to checklist document for manual follow-up steps.
    #[serde(default)]
    pub checklist: PathBuf,

    /// Listing of install groups in processing order.
    #[serde(default, rename = "install_group")]
    pub install_groups: Vec<InstallGroup>,
}

impl Config {
    /// Load manifest from file.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadManifest`] if file cannot be read.
    /// - Return [`Error::Deserialize`] if manifest is malformed.
    /// - Return [`Error::ShellExpansion`] if variable substitution fails.
    pub fn load(path: impl AsRef<Path>, context: &ResolveContext) -> Result<Self> {
        let data = read_to_string(path.as_ref()).map_err(|err| Error::ReadManifest {
            source: err,
            path: path.as_ref().to_path_buf(),
        })?;

        Self::parse(&data, context)
    }

    /// Load embedded internal requirements manifest.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Deserialize`] if manifest is malformed.
    /// - Return [`Error::ShellExpansion`] if variable substitution fails.
    pub fn internal(context: &ResolveContext) -> Result<Self> {
        Self::parse(INTERNAL_MANIFEST, context)
    }

    /// Parse manifest from string data.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Deserialize`] if manifest is malformed.
    /// - Return [`Error::ShellExpansion`] if variable substitution fails.
    pub fn parse(data: &str, context: &ResolveContext) -> Result<Self> {
        let mut config: Config = toml::de::from_str(data)?;

        // INVARIANT: Only artifact and checklist paths go through substitution.
        for group in &mut config.install_groups {
            for software in &mut group.software {
                software.artifact =
                    context
                        .expand(&software.artifact)
                        .map_err(|err| Error::ExpandArtifact {
                            name: software.name.clone().unwrap_or_default(),
                            source: Box::new(err),
                        })?;
                software.display_name = match &software.name {
                    Some(name) if !name.trim().is_empty() => name.clone(),
                    _ => context.artifact_label(&software.artifact),
                };
            }
        }
        let checklist = context.expand(config.checklist.to_string_lossy().as_ref())?;
        config.checklist = PathBuf::from(checklist);

        Ok(config)
    }

    /// Check if any install step uses Homebrew directly.
    pub fn requires_homebrew(&self) -> bool {
        self.install_groups
            .iter()
            .flat_map(|group| group.software.iter())
            .flat_map(|software| software.install.iter())
            .any(InstallStep::is_homebrew)
    }
}

/// Named collection of software entries.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstallGroup {
    /// Name of install group.
    pub group: String,

    /// Whether software in this group needs user consent before installing.
    #[serde(default)]
    pub optional: Flag,

    /// Software entries of install group.
    #[serde(default)]
    pub software: Vec<Software>,
}

impl InstallGroup {
    /// Check if install group is optional.
    ///
    /// Unset means optional.
    pub fn is_optional(&self) -> bool {
        self.optional.or(true)
    }
}

/// One installable unit.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Software {
    /// Display name chosen by user.
    #[serde(default)]
    pub name: Option<String>,

    /// Path or glob pattern whose existence means software is installed.
    pub artifact: String,

    /// Free text shown in prompts and checklist.
    #[serde(default)]
    pub note: Option<String>,

    /// Ordered installation steps.
    #[serde(default)]
    pub install: Vec<InstallStep>,

    /// Ordered configuration steps.
    #[serde(default)]
    pub configure: Vec<ConfigureStep>,

    /// Manual follow-up steps for checklist.
    #[serde(default)]
    pub checklist: Vec<String>,

    /// Remember when user declines installation.
    #[serde(default)]
    pub persist: Flag,

    #[serde(skip)]
    display_name: String,
}

impl Software {
    /// Name to show user.
    ///
    /// Declared name if one is set, otherwise a label derived from the
    /// artifact path.
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            return self.artifact.as_str();
        }

        self.display_name.as_str()
    }

    /// Check if user's choice to decline should be remembered.
    ///
    /// Unset means do not persist.
    pub fn should_persist(&self) -> bool {
        self.persist.or(false)
    }

    /// Package name of first Homebrew install step, if any.
    pub fn homebrew_package(&self) -> Option<&str> {
        self.install.iter().find_map(|step| match step {
            InstallStep::Brew(package) | InstallStep::Cask(package) => Some(package.as_str()),
            _ => None,
        })
    }
}

/// Three-valued boolean setting.
///
/// Fields that use this type carry their own default, so absence is kept
/// distinct from an explicit `false`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<bool>")]
pub enum Flag {
    /// Not specified by user.
    #[default]
    Unset,

    /// Explicitly enabled.
    On,

    /// Explicitly disabled.
    Off,
}

impl Flag {
    /// Resolve flag using default for unset state.
    pub fn or(self, default: bool) -> bool {
        match self {
            Self::Unset => default,
            Self::On => true,
            Self::Off => false,
        }
    }
}

impl From<Option<bool>> for Flag {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Unset,
            Some(true) => Self::On,
            Some(false) => Self::Off,
        }
    }
}

/// Single installation step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, StepValue>")]
pub enum InstallStep {
    /// Homebrew formula.
    Brew(String),

    /// Homebrew cask.
    Cask(String),

    /// Mac App Store application by numeric ID or store URL.
    Mas(String),

    /// Global npm package.
    Npm(String),

    /// Ruby gem through brew-gem.
    Gem(String),

    /// Go module through brew-gomod.
    GoMod(String),

    /// Python application through pipx.
    Pipx(String),

    /// Inline shell command.
    Run(String),

    /// Shell script file.
    Script(String),

    /// Direct download to artifact path.
    Download(String),

    /// Archive to download and unpack.
    Archive {
        /// Location of archive.
        url: String,

        /// Member of archive to copy into applications directory.
        file: Option<String>,
    },
}

impl InstallStep {
    /// Method name as written in manifest.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Brew(_) => "brew",
            Self::Cask(_) => "cask",
            Self::Mas(_) => "mas",
            Self::Npm(_) => "npm",
            Self::Gem(_) => "gem",
            Self::GoMod(_) => "gomod",
            Self::Pipx(_) => "pipx",
            Self::Run(_) => "run",
            Self::Script(_) => "script",
            Self::Download(_) => "dl",
            Self::Archive { .. } => "archive",
        }
    }

    /// Argument given to method.
    pub fn argument(&self) -> &str {
        match self {
            Self::Brew(value)
            | Self::Cask(value)
            | Self::Mas(value)
            | Self::Npm(value)
            | Self::Gem(value)
            | Self::GoMod(value)
            | Self::Pipx(value)
            | Self::Run(value)
            | Self::Script(value)
            | Self::Download(value) => value.as_str(),
            Self::Archive { url, .. } => url.as_str(),
        }
    }

    /// Check if step invokes Homebrew install directly.
    pub fn is_homebrew(&self) -> bool {
        matches!(self, Self::Brew(_) | Self::Cask(_))
    }
}

impl Display for InstallStep {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} {}", self.method(), self.argument())
    }
}

impl TryFrom<BTreeMap<String, StepValue>> for InstallStep {
    type Error = StepError;

    fn try_from(mut table: BTreeMap<String, StepValue>) -> std::result::Result<Self, Self::Error> {
        if let Some(url) = table.remove("archive") {
            let file = table.remove("file").map(|file| file.into_text("file")).transpose()?;
            if let Some(key) = table.keys().next() {
                return Err(StepError::UnexpectedKey(key.clone()));
            }

            return Ok(Self::Archive {
                url: url.into_text("archive")?,
                file,
            });
        }

        let (method, value) = single_entry(table)?;
        let value = value.into_text(&method)?;
        let step = match method.as_str() {
            "brew" => Self::Brew(value),
            "cask" => Self::Cask(value),
            "mas" => Self::Mas(value),
            "npm" => Self::Npm(value),
            "gem" => Self::Gem(value),
            "gomod" => Self::GoMod(value),
            "pipx" => Self::Pipx(value),
            "run" => Self::Run(value),
            "script" => Self::Script(value),
            "dl" => Self::Download(value),
            _ => return Err(StepError::UnknownInstallMethod(method)),
        };

        Ok(step)
    }
}

/// Single configuration step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, StepValue>")]
pub enum ConfigureStep {
    /// Inline shell command.
    Run(String),

    /// Shell script file.
    Script(String),

    /// Treat failures of following steps as warnings.
    IgnoreErrors(bool),
}

impl ConfigureStep {
    /// Check if step executes something through the shell.
    pub fn is_shell(&self) -> bool {
        matches!(self, Self::Run(_) | Self::Script(_))
    }
}

impl Display for ConfigureStep {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Run(command) => write!(fmt, "run {command}"),
            Self::Script(script) => write!(fmt, "script {script}"),
            Self::IgnoreErrors(value) => write!(fmt, "ignore_errors {value}"),
        }
    }
}

impl TryFrom<BTreeMap<String, StepValue>> for ConfigureStep {
    type Error = StepError;

    fn try_from(table: BTreeMap<String, StepValue>) -> std::result::Result<Self, Self::Error> {
        let (method, value) = single_entry(table)?;
        let step = match method.as_str() {
            "run" => Self::Run(value.into_text(&method)?),
            "script" => Self::Script(value.into_text(&method)?),
            "ignore_errors" => Self::IgnoreErrors(value.is_true()),
            _ => return Err(StepError::UnknownConfigureMethod(method)),
        };

        Ok(step)
    }
}

fn single_entry(
    table: BTreeMap<String, StepValue>,
) -> std::result::Result<(String, StepValue), StepError> {
    let mut entries = table.into_iter();
    let entry = entries.next().ok_or(StepError::Empty)?;
    if let Some((key, _)) = entries.next() {
        return Err(StepError::UnexpectedKey(key));
    }

    Ok(entry)
}

/// Raw value of a step table entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepValue {
    Text(String),
    Switch(bool),
}

impl StepValue {
    fn into_text(self, method: &str) -> std::result::Result<String, StepError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Switch(_) => Err(StepError::ExpectedText(method.to_string())),
        }
    }

    fn is_true(&self) -> bool {
        match self {
            Self::Text(text) => text.eq_ignore_ascii_case("true"),
            Self::Switch(value) => *value,
        }
    }
}

/// Step table validation errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// Step table has no method.
    #[error("step has no method")]
    Empty,

    /// Step table has more than one method.
    #[error("unexpected key {0:?} in step")]
    UnexpectedKey(String),

    /// Method takes text, but was given something else.
    #[error("method {0:?} expects a string value")]
    ExpectedText(String),

    /// Installation method does not exist.
    #[error("unknown installation method: {0}")]
    UnknownInstallMethod(String),

    /// Configuration method does not exist.
    #[error("unknown configuration method: {0}")]
    UnknownConfigureMethod(String),
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Manifest file cannot be read.
    #[error("failed to read manifest at {:?}", path.display())]
    ReadManifest {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to perform variable substitution on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to perform variable substitution on artifact path.
    #[error("failed to expand environment variables in artifact path for {name:?}")]
    ExpandArtifact {
        #[source]
        source: Box<Error>,
        name: String,
    },

    /// Home directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
