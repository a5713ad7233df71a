// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Declarative macOS software installation.
//!
//! A manifest lists install groups of software entries. Each entry names an
//! __artifact__, i.e., a path or glob pattern whose existence proves that the
//! software is installed, along with the steps needed to install it through
//! Homebrew, the Mac App Store, npm, pipx, a plain download, an archive, or a
//! shell command. The [`Orchestrator`] walks the manifest, installs what is
//! missing, configures it, and collects manual follow-up steps into a
//! markdown checklist.
//!
//! Optional software is only installed with the user's consent. When the
//! user declines, that choice can be remembered in the [`ExclusionStore`] so
//! that later runs stop asking.

pub mod checklist;
pub mod config;
pub mod installer;
pub mod orchestrator;
pub mod path;
pub mod prompt;
pub mod select;
pub mod store;

pub use checklist::ChecklistWriter;
pub use config::{Config, ResolveContext};
pub use installer::{Installation, SystemInstaller};
pub use orchestrator::{Orchestrator, Outcome, RunMode};
pub use prompt::{InquirePrompter, Prompter};
pub use store::ExclusionStore;
