// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manual follow-up checklist.
//!
//! Not everything can be automated. Signing into an account, granting a
//! permission, or entering a license key are all left to the user. These
//! steps are collected into a markdown __checklist__ document, one section
//! per software entry.
//!
//! # Checklist Layout
//!
//! Each section starts with a `## <title>` header. An optional note follows
//! as a block quote, then each step as an unchecked task item. Caveats
//! reported by Homebrew are appended in a fenced block:
//!
//! ~~~markdown
//! ## Visual Studio Code
//!
//! > Editor
//!
//! - [ ] Sign in to settings sync
//!
//! ### Caveats
//!
//! ```
//! some caveat text
//! ```
//! ~~~
//!
//! A header is written at most once. The user is free to tick off items and
//! edit the document between runs.

use std::{
    fs::{create_dir_all, File, OpenOptions},
    io::{BufRead, BufReader, ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Checklist section to append.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    /// Header text.
    pub title: &'a str,

    /// Note shown as block quote below header.
    pub note: Option<&'a str>,

    /// Unchecked task items.
    pub steps: &'a [String],

    /// Homebrew caveats.
    pub caveats: Option<&'a str>,
}

impl Section<'_> {
    fn render(&self) -> String {
        let mut out = format!("\n## {}\n\n", self.title);

        if let Some(note) = self.note.filter(|note| !note.is_empty()) {
            let note = note.trim_end_matches('\n').replace('\n', "\n> ");
            out.push_str(&format!("> {note}\n\n"));
        }

        for step in self.steps {
            out.push_str(&format!("- [ ] {step}\n"));
        }

        if let Some(caveats) = self.caveats.filter(|caveats| !caveats.is_empty()) {
            out.push_str(&format!("\n### Caveats\n\n```\n{caveats}\n```\n"));
        }

        out
    }
}

/// Append-only writer for checklist document.
#[derive(Debug, Clone)]
pub struct ChecklistWriter {
    checklist_path: PathBuf,
}

impl ChecklistWriter {
    /// Construct new checklist writer.
    ///
    /// Does not touch the file system until something is appended.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            checklist_path: path.into(),
        }
    }

    /// Path to checklist document.
    pub fn path(&self) -> &Path {
        self.checklist_path.as_path()
    }

    /// Append section unless its header already exists.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadChecklist`] if checklist cannot be read.
    /// - Return [`Error::WriteChecklist`] if checklist cannot be written to.
    pub fn append(&self, section: &Section<'_>) -> Result<()> {
        self.write_section(section, false)
    }

    /// Append section for software that was installed by other means.
    ///
    /// Same header rule as [`ChecklistWriter::append`]. Only the debug log
    /// differs.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadChecklist`] if checklist cannot be read.
    /// - Return [`Error::WriteChecklist`] if checklist cannot be written to.
    pub fn append_for_existing(&self, section: &Section<'_>) -> Result<()> {
        self.write_section(section, true)
    }

    /// Check if checklist contains header for given title.
    ///
    /// Missing checklist means no header.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadChecklist`] if checklist cannot be read.
    pub fn header_exists(&self, title: impl AsRef<str>) -> Result<bool> {
        let file = match File::open(&self.checklist_path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(self.read_error(err)),
        };

        let header = format!("## {}", title.as_ref());
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|err| self.read_error(err))?;
            if line.trim() == header {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn write_section(&self, section: &Section<'_>, existing: bool) -> Result<()> {
        if self.header_exists(section.title)? {
            debug!(
                "checklist already has section {:?} (existing software: {existing})",
                section.title
            );
            return Ok(());
        }

        if let Some(parent) = self.checklist_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(|err| self.write_error(err))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.checklist_path)
            .map_err(|err| self.write_error(err))?;
        file.write_all(section.render().as_bytes())
            .map_err(|err| self.write_error(err))?;

        Ok(())
    }

    fn read_error(&self, source: std::io::Error) -> Error {
        Error::ReadChecklist {
            source,
            checklist_path: self.checklist_path.clone(),
        }
    }

    fn write_error(&self, source: std::io::Error) -> Error {
        Error::WriteChecklist {
            source,
            checklist_path: self.checklist_path.clone(),
        }
    }
}

/// Checklist error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Checklist cannot be read from.
    #[error("failed to read checklist at {:?}", checklist_path.display())]
    ReadChecklist {
        #[source]
        source: std::io::Error,
        checklist_path: PathBuf,
    },

    /// Checklist cannot be written to.
    #[error("failed to write checklist at {:?}", checklist_path.display())]
    WriteChecklist {
        #[source]
        source: std::io::Error,
        checklist_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
