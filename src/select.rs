// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Single target selection.

use crate::config::{InstallGroup, Software};

use std::path::Path;

/// Software entry matched by name fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    /// Matched software entry.
    pub software: &'a Software,

    /// Install group that owns software entry.
    pub group: &'a InstallGroup,
}

/// Find software entries matching name fragment.
///
/// Matching is a case-insensitive substring search against the declared
/// name, or the last segment of the artifact path. Each entry matches at
/// most once. Empty fragment matches everything.
pub fn find_matches<'a>(groups: &'a [InstallGroup], fragment: &str) -> Vec<Match<'a>> {
    let fragment = fragment.to_lowercase();

    groups
        .iter()
        .flat_map(|group| {
            group
                .software
                .iter()
                .map(move |software| Match { software, group })
        })
        .filter(|candidate| matches_fragment(candidate.software, &fragment))
        .collect()
}

fn matches_fragment(software: &Software, fragment: &str) -> bool {
    let name_hit = software
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .is_some_and(|name| name.to_lowercase().contains(fragment));

    name_hit
        || Path::new(&software.artifact)
            .file_name()
            .is_some_and(|name| name.to_string_lossy().to_lowercase().contains(fragment))
}
