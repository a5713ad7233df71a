// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Installation orchestration.
//!
//! The orchestrator walks the manifest and decides, for every software entry,
//! whether to skip, prompt, install, configure, and record checklist items.
//! Every decision is driven by two facts only: whether the artifact exists,
//! and whether the user excluded the software before.
//!
//! # Per-Entry Procedure
//!
//! 1. Skip software that the user excluded in an earlier run.
//! 2. Check if artifact exists. Existing software only gets a checklist
//!    backfill. Software without install steps is queued to the checklist.
//!    Optional software needs the user's consent.
//! 3. Install, then verify that the artifact showed up.
//! 4. Configure whenever the artifact exists. A freshly installed application
//!    bundle is launched once beforehand.
//! 5. Record checklist items of freshly installed software.
//!
//! Any failure aborts the entire run. There is no retry.

use crate::{
    checklist::{self, ChecklistWriter, Section},
    config::{Config, Software},
    installer::{self, Installation, SystemInstaller},
    prompt::{self, InquirePrompter, Prompter},
    select::find_matches,
    store::{self, ExclusionStore},
};

use colored::Colorize;
use std::{thread::sleep, time::Duration};
use tracing::{debug, info, instrument, warn};

/// Time given to a freshly launched application before configuring it.
pub const LAUNCH_DELAY: Duration = Duration::from_secs(2);

/// Which part of manifest to process.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Process everything.
    #[default]
    Full,

    /// Process non-optional install groups only.
    SkipOptional,

    /// Process the one software entry that matches name fragment.
    Only(String),
}

/// Result of processing one software entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Artifact already existed.
    AlreadyPresent,

    /// Software was installed by this run.
    Installed,

    /// User declined installation.
    Declined,

    /// User declined installation in an earlier run.
    PreviouslyExcluded,

    /// No install steps, so installation was added to checklist.
    QueuedToChecklist,
}

/// Installation orchestrator.
#[derive(Debug)]
pub struct Orchestrator<I = SystemInstaller, P = InquirePrompter>
where
    I: Installation,
    P: Prompter,
{
    config: Config,
    internal: Option<Config>,
    installer: I,
    prompter: P,
    checklist: ChecklistWriter,
    store: ExclusionStore,
    launch_delay: Duration,
}

impl<I, P> Orchestrator<I, P>
where
    I: Installation,
    P: Prompter,
{
    /// Construct new orchestrator.
    ///
    /// Checklist items go to the checklist document named by the manifest.
    pub fn new(config: Config, installer: I, prompter: P, store: ExclusionStore) -> Self {
        let checklist = ChecklistWriter::new(&config.checklist);
        Self {
            config,
            internal: None,
            installer,
            prompter,
            checklist,
            store,
            launch_delay: LAUNCH_DELAY,
        }
    }

    /// Set internal requirements to bootstrap before Homebrew gets used.
    pub fn with_internal(mut self, internal: Config) -> Self {
        self.internal = Some(internal);
        self
    }

    /// Set delay between launching an application and configuring it.
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// Installer used by orchestrator.
    pub fn installer(&self) -> &I {
        &self.installer
    }

    /// Prompter used by orchestrator.
    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Process manifest.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Internal`] if an internal requirement fails.
    /// - Return [`Error::Software`] if a software entry fails.
    /// - Return [`Error::NoMatch`] or [`Error::AmbiguousTarget`] if single
    ///   target cannot be resolved.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&self, mode: RunMode) -> Result<()> {
        if let RunMode::Only(fragment) = &mode {
            return self.run_only(fragment);
        }

        self.run_internal()?;

        for group in &self.config.install_groups {
            if mode == RunMode::SkipOptional && group.is_optional() {
                debug!("skip optional group {:?}", group.group);
                continue;
            }

            info!("=== {} ===", group.group.magenta().bold());
            for software in &group.software {
                self.process_software(software, group.is_optional())
                    .map_err(|err| Error::Software {
                        name: software.display_name().to_string(),
                        source: Box::new(err),
                    })?;
            }
        }

        info!("{}", "Installation completed successfully!".green().bold());
        Ok(())
    }

    fn run_internal(&self) -> Result<()> {
        if !self.config.requires_homebrew() {
            return Ok(());
        }

        let Some(internal) = &self.internal else {
            debug!("no internal requirements to bootstrap");
            return Ok(());
        };

        // INVARIANT: Internal requirements are never optional.
        for group in &internal.install_groups {
            info!("=== {} ===", group.group.magenta().bold());
            for software in &group.software {
                self.process_software(software, false)
                    .map_err(|err| Error::Internal {
                        name: software.display_name().to_string(),
                        source: Box::new(err),
                    })?;
            }
        }

        Ok(())
    }

    fn run_only(&self, fragment: &str) -> Result<()> {
        let matches = find_matches(&self.config.install_groups, fragment);
        let target = match matches.as_slice() {
            [] => {
                return Err(Error::NoMatch {
                    fragment: fragment.to_string(),
                })
            }
            [target] => target,
            candidates => {
                return Err(Error::AmbiguousTarget {
                    fragment: fragment.to_string(),
                    candidates: candidates
                        .iter()
                        .map(|candidate| {
                            format!(
                                "{} (artifact: {})",
                                candidate.software.display_name(),
                                candidate.software.artifact
                            )
                        })
                        .collect(),
                })
            }
        };

        info!("=== {} ===", "Installing Single Target".magenta().bold());
        self.process_software(target.software, target.group.is_optional())
            .map_err(|err| Error::Software {
                name: target.software.display_name().to_string(),
                source: Box::new(err),
            })?;

        info!("{}", "Installation completed successfully!".green().bold());
        Ok(())
    }

    /// Process one software entry.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Installer`] if an install or configure step fails.
    /// - Return [`Error::ArtifactMissing`] if artifact is absent after
    ///   installation.
    /// - Return [`Error::Prompt`] if user cannot be asked for consent.
    /// - Return [`Error::Checklist`] if checklist cannot be updated.
    /// - Return [`Error::Store`] if exclusion cannot be recorded.
    #[instrument(skip(self, software), fields(name = software.display_name()), level = "debug")]
    pub fn process_software(&self, software: &Software, is_optional: bool) -> Result<Outcome> {
        let name = software.display_name();
        info!("{} {}", name.bold(), "...".dimmed());

        if is_optional && software.should_persist() && self.store.is_excluded(name) {
            let marker = self.store.exclusion_file_path(name);
            info!(
                "  {}",
                format!(
                    "Skipped (previously excluded) - to unset: rm {:?}",
                    marker.display()
                )
                .dimmed()
            );
            return Ok(Outcome::PreviouslyExcluded);
        }

        let outcome = if self.installer.artifact_exists(&software.artifact) {
            info!("  {}", "Already installed".green());
            self.backfill_checklist(software)?;
            Outcome::AlreadyPresent
        } else if software.install.is_empty() {
            info!(
                "  {}",
                "No installation steps defined, adding to checklist".yellow()
            );
            let mut steps = vec![format!("Install {name}")];
            steps.extend(software.checklist.iter().cloned());
            self.checklist.append(&Section {
                title: name,
                note: software.note.as_deref(),
                steps: &steps,
                caveats: None,
            })?;
            return Ok(Outcome::QueuedToChecklist);
        } else {
            if is_optional && !self.prompter.confirm(&prompt_text(software))? {
                if software.should_persist() {
                    self.store.set_excluded(name)?;
                    info!("  {}", "Skipped (excluded by user, choice saved)".dimmed());
                } else {
                    info!("  {}", "Skipped (excluded by user)".dimmed());
                }
                return Ok(Outcome::Declined);
            }

            info!("  {}", "Installing...".cyan());
            self.installer.install(&software.install, &software.artifact)?;
            if !self.installer.artifact_exists(&software.artifact) {
                return Err(Error::ArtifactMissing {
                    artifact: software.artifact.clone(),
                });
            }
            info!("  {}", "Installed successfully".green());
            Outcome::Installed
        };

        if !software.configure.is_empty() && self.installer.artifact_exists(&software.artifact) {
            self.configure(software, outcome == Outcome::Installed)?;
        }

        if outcome == Outcome::Installed && !software.checklist.is_empty() {
            info!("  {}", "Adding checklist items...".cyan());
            let caveats = self.caveats(software);
            self.checklist.append(&Section {
                title: name,
                note: software.note.as_deref(),
                steps: &software.checklist,
                caveats: caveats.as_deref(),
            })?;
        }

        Ok(outcome)
    }

    fn configure(&self, software: &Software, just_installed: bool) -> Result<()> {
        let needs_launch = just_installed
            && software.artifact.ends_with(".app")
            && software.configure.iter().any(|step| step.is_shell());

        if needs_launch {
            info!("  {}", "Opening application...".cyan());
            match self.installer.open_application(&software.artifact) {
                Ok(()) => sleep(self.launch_delay),
                Err(err) => warn!("could not open application {:?}: {err}", software.artifact),
            }
        }

        info!("  {}", "Configuring...".cyan());
        self.installer.configure(&software.configure)?;
        info!("  {}", "Configured successfully".green());

        Ok(())
    }

    fn backfill_checklist(&self, software: &Software) -> Result<()> {
        let name = software.display_name();
        if software.checklist.is_empty() || self.checklist.header_exists(name)? {
            return Ok(());
        }

        info!("  {}", "Adding missing checklist items...".cyan());
        let caveats = self.caveats(software);
        self.checklist.append_for_existing(&Section {
            title: name,
            note: software.note.as_deref(),
            steps: &software.checklist,
            caveats: caveats.as_deref(),
        })?;

        Ok(())
    }

    fn caveats(&self, software: &Software) -> Option<String> {
        software
            .homebrew_package()
            .and_then(|package| self.installer.caveats(package))
    }
}

fn prompt_text(software: &Software) -> String {
    match software.note.as_deref().filter(|note| !note.is_empty()) {
        Some(note) => format!("Install {} ({note})?", software.display_name()),
        None => format!("Install {}?", software.display_name()),
    }
}

/// Orchestration error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Install or configure step failed.
    #[error(transparent)]
    Installer(#[from] installer::Error),

    /// Install steps succeeded, but artifact never showed up.
    #[error("installation completed but artifact {artifact} not found")]
    ArtifactMissing { artifact: String },

    /// Checklist cannot be updated.
    #[error(transparent)]
    Checklist(#[from] checklist::Error),

    /// Exclusion cannot be recorded.
    #[error(transparent)]
    Store(#[from] store::Error),

    /// User cannot be asked for consent.
    #[error(transparent)]
    Prompt(#[from] prompt::Error),

    /// Single target matches nothing.
    #[error("no software found matching {fragment:?}")]
    NoMatch { fragment: String },

    /// Single target matches more than one software entry.
    #[error(
        "multiple software items match {fragment:?}, be more specific:\n{}",
        candidates.join("\n")
    )]
    AmbiguousTarget {
        fragment: String,
        candidates: Vec<String>,
    },

    /// Software entry cannot be processed.
    #[error("failed to process {name}")]
    Software {
        #[source]
        source: Box<Error>,
        name: String,
    },

    /// Internal requirement cannot be processed.
    #[error("failed to process internal requirement {name}")]
    Internal {
        #[source]
        source: Box<Error>,
        name: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigureStep, InstallStep, ResolveContext};
    use pretty_assertions::assert_eq;
    use std::{
        cell::RefCell,
        collections::{HashSet, VecDeque},
        path::PathBuf,
    };
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct FakeInstaller {
        present: RefCell<HashSet<String>>,
        calls: RefCell<Vec<String>>,
        install_creates_artifact: bool,
        open_fails: bool,
        caveats: Option<String>,
    }

    impl FakeInstaller {
        fn creating() -> Self {
            Self {
                install_creates_artifact: true,
                ..Default::default()
            }
        }

        fn with_present(self, artifact: &str) -> Self {
            self.present.borrow_mut().insert(artifact.to_string());
            self
        }

        fn failing_open(mut self) -> Self {
            self.open_fails = true;
            self
        }

        fn with_caveats(mut self, caveats: &str) -> Self {
            self.caveats = Some(caveats.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }
    }

    impl Installation for FakeInstaller {
        fn artifact_exists(&self, artifact: &str) -> bool {
            self.present.borrow().contains(artifact)
        }

        fn install(&self, steps: &[InstallStep], artifact: &str) -> installer::Result<()> {
            for step in steps {
                self.calls.borrow_mut().push(format!("install {step}"));
            }
            if self.install_creates_artifact {
                self.present.borrow_mut().insert(artifact.to_string());
            }
            Ok(())
        }

        fn configure(&self, steps: &[ConfigureStep]) -> installer::Result<()> {
            for step in steps {
                self.calls.borrow_mut().push(format!("configure {step}"));
            }
            Ok(())
        }

        fn caveats(&self, package: &str) -> Option<String> {
            self.calls.borrow_mut().push(format!("caveats {package}"));
            self.caveats.clone()
        }

        fn open_application(&self, application: &str) -> installer::Result<()> {
            self.calls.borrow_mut().push(format!("open {application}"));
            if self.open_fails {
                return Err(installer::Error::Syscall(std::io::Error::other("open failed")));
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct FakePrompter {
        answers: RefCell<VecDeque<bool>>,
        questions: RefCell<Vec<String>>,
    }

    impl FakePrompter {
        fn answering(answers: &[bool]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().copied().collect()),
                ..Default::default()
            }
        }

        fn questions(&self) -> Vec<String> {
            self.questions.borrow().clone()
        }
    }

    impl Prompter for FakePrompter {
        fn confirm(&self, question: &str) -> prompt::Result<bool> {
            self.questions.borrow_mut().push(question.to_string());
            Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
        }
    }

    struct Fixture {
        root: TempDir,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            Ok(Self {
                root: tempfile::tempdir()?,
            })
        }

        fn checklist_path(&self) -> PathBuf {
            self.root.path().join("SystemSetup.md")
        }

        fn store(&self) -> anyhow::Result<ExclusionStore> {
            Ok(ExclusionStore::open(self.root.path().join("state"))?)
        }

        fn config(&self, body: &str) -> anyhow::Result<Config> {
            let manifest = format!("checklist = {:?}\n{body}", self.checklist_path());
            Ok(Config::parse(
                &manifest,
                &ResolveContext::new("/Users/blah", "/opt/homebrew"),
            )?)
        }

        fn orchestrator(
            &self,
            body: &str,
            installer: FakeInstaller,
            prompter: FakePrompter,
        ) -> anyhow::Result<Orchestrator<FakeInstaller, FakePrompter>> {
            Ok(
                Orchestrator::new(self.config(body)?, installer, prompter, self.store()?)
                    .with_launch_delay(Duration::ZERO),
            )
        }

        fn checklist(&self) -> String {
            std::fs::read_to_string(self.checklist_path()).unwrap_or_default()
        }
    }

    fn first_software(orchestrator: &Orchestrator<FakeInstaller, FakePrompter>) -> Software {
        orchestrator.config.install_groups[0].software[0].clone()
    }

    const OPTIONAL_PERSISTED: &str = r#"
        [[install_group]]
        group = "Optional"

        [[install_group.software]]
        name = "Test App"
        artifact = "/Applications/Test App.app"
        note = "for testing"
        persist = true
        install = [{ cask = "test-app" }]
    "#;

    #[test]
    fn present_artifact_never_installs() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Tools"
            optional = false

            [[install_group.software]]
            artifact = "/opt/homebrew/bin/blah"
            install = [{ brew = "blah" }]
            configure = [{ run = "blah --init" }]
        "#,
            FakeInstaller::creating().with_present("/opt/homebrew/bin/blah"),
            FakePrompter::default(),
        )?;

        let outcome = orchestrator.process_software(&first_software(&orchestrator), false)?;
        assert_eq!(outcome, Outcome::AlreadyPresent);
        assert_eq!(orchestrator.installer().count("install"), 0);
        assert_eq!(
            orchestrator.installer().calls(),
            vec!["configure run blah --init".to_string()]
        );
        Ok(())
    }

    #[test]
    fn present_artifact_backfills_checklist_once() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Tools"

            [[install_group.software]]
            name = "Blah"
            artifact = "/opt/homebrew/bin/blah"
            install = [{ brew = "blah" }]
            checklist = ["Log in"]
        "#,
            FakeInstaller::default()
                .with_present("/opt/homebrew/bin/blah")
                .with_caveats("restart shell"),
            FakePrompter::default(),
        )?;
        let software = first_software(&orchestrator);

        orchestrator.process_software(&software, true)?;
        orchestrator.process_software(&software, true)?;

        let checklist = fixture.checklist();
        assert_eq!(checklist.matches("## Blah").count(), 1);
        assert!(checklist.contains("- [ ] Log in"));
        assert!(checklist.contains("restart shell"));
        assert_eq!(orchestrator.installer().count("caveats blah"), 1);
        Ok(())
    }

    #[test]
    fn missing_install_steps_queue_checklist() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Manual"

            [[install_group.software]]
            name = "Manual App"
            artifact = "/Applications/Manual App.app"
            checklist = ["Enter license key"]
        "#,
            FakeInstaller::default(),
            FakePrompter::default(),
        )?;

        let outcome = orchestrator.process_software(&first_software(&orchestrator), true)?;
        assert_eq!(outcome, Outcome::QueuedToChecklist);

        let checklist = fixture.checklist();
        assert!(checklist.contains("- [ ] Install Manual App\n- [ ] Enter license key\n"));
        assert!(orchestrator.prompter.questions().is_empty());
        Ok(())
    }

    #[test]
    fn declined_with_persist_is_remembered() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            OPTIONAL_PERSISTED,
            FakeInstaller::creating(),
            FakePrompter::answering(&[false]),
        )?;
        let software = first_software(&orchestrator);

        assert_eq!(orchestrator.process_software(&software, true)?, Outcome::Declined);
        assert_eq!(
            orchestrator.prompter.questions(),
            vec!["Install Test App (for testing)?".to_string()]
        );
        assert!(fixture.root.path().join("state").join("no-test-app").is_file());

        assert_eq!(
            orchestrator.process_software(&software, true)?,
            Outcome::PreviouslyExcluded
        );
        assert_eq!(orchestrator.prompter.questions().len(), 1);
        assert!(orchestrator.installer().calls().is_empty());
        Ok(())
    }

    #[test]
    fn declined_without_persist_asks_again() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Optional"

            [[install_group.software]]
            name = "Test App"
            artifact = "/Applications/Test App.app"
            install = [{ cask = "test-app" }]
        "#,
            FakeInstaller::creating(),
            FakePrompter::answering(&[false, false]),
        )?;
        let software = first_software(&orchestrator);

        assert_eq!(orchestrator.process_software(&software, true)?, Outcome::Declined);
        assert_eq!(orchestrator.process_software(&software, true)?, Outcome::Declined);
        assert_eq!(
            orchestrator.prompter.questions(),
            vec!["Install Test App?".to_string(), "Install Test App?".to_string()]
        );
        assert!(!fixture.root.path().join("state").join("no-test-app").exists());
        Ok(())
    }

    #[test]
    fn exclusion_ignored_for_required_software() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.store()?.set_excluded("Test App")?;
        let orchestrator = fixture.orchestrator(
            OPTIONAL_PERSISTED,
            FakeInstaller::creating(),
            FakePrompter::default(),
        )?;

        let outcome = orchestrator.process_software(&first_software(&orchestrator), false)?;
        assert_eq!(outcome, Outcome::Installed);
        assert!(orchestrator.prompter.questions().is_empty());
        Ok(())
    }

    #[test]
    fn accepted_install_launches_app_then_configures() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Optional"

            [[install_group.software]]
            name = "Test App"
            artifact = "/Applications/Test App.app"
            install = [{ cask = "test-app" }]
            configure = [{ ignore_errors = true }, { run = "defaults write blah" }]
            checklist = ["Sign in"]
        "#,
            FakeInstaller::creating().with_caveats("blah caveat"),
            FakePrompter::answering(&[true]),
        )?;

        let outcome = orchestrator.process_software(&first_software(&orchestrator), true)?;
        assert_eq!(outcome, Outcome::Installed);
        assert_eq!(
            orchestrator.installer().calls(),
            vec![
                "install cask test-app".to_string(),
                "open /Applications/Test App.app".to_string(),
                "configure ignore_errors true".to_string(),
                "configure run defaults write blah".to_string(),
                "caveats test-app".to_string(),
            ]
        );

        let checklist = fixture.checklist();
        assert!(checklist.contains("## Test App"));
        assert!(checklist.contains("- [ ] Sign in"));
        assert!(checklist.contains("blah caveat"));
        Ok(())
    }

    #[test]
    fn failed_launch_still_configures() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Apps"
            optional = false

            [[install_group.software]]
            name = "Test App"
            artifact = "/Applications/Test App.app"
            install = [{ cask = "test-app" }]
            configure = [{ run = "defaults write blah" }]
        "#,
            FakeInstaller::creating().failing_open(),
            FakePrompter::default(),
        )?;

        let outcome = orchestrator.process_software(&first_software(&orchestrator), false)?;
        assert_eq!(outcome, Outcome::Installed);
        assert_eq!(
            orchestrator.installer().calls(),
            vec![
                "install cask test-app".to_string(),
                "open /Applications/Test App.app".to_string(),
                "configure run defaults write blah".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn install_without_artifact_is_an_error() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Tools"
            optional = false

            [[install_group.software]]
            artifact = "/opt/homebrew/bin/blah"
            install = [{ brew = "blah" }]
            configure = [{ run = "blah --init" }]
            checklist = ["Log in"]
        "#,
            FakeInstaller::default(),
            FakePrompter::default(),
        )?;

        let result = orchestrator.process_software(&first_software(&orchestrator), false);
        let err = result.unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing { .. }));
        assert_eq!(
            err.to_string(),
            "installation completed but artifact /opt/homebrew/bin/blah not found"
        );
        assert_eq!(orchestrator.installer().count("configure"), 0);
        assert!(fixture.checklist().is_empty());
        Ok(())
    }

    #[test]
    fn skip_optional_and_bootstrap() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let internal = fixture.config(
            r#"
            [[install_group]]
            group = "Internal Requirements"

            [[install_group.software]]
            name = "Homebrew"
            artifact = "/opt/homebrew/bin/brew"
            install = [{ run = "install homebrew" }]
        "#,
        )?;
        let orchestrator = fixture
            .orchestrator(
                r#"
                [[install_group]]
                group = "Required"
                optional = false

                [[install_group.software]]
                artifact = "/opt/homebrew/bin/required"
                install = [{ brew = "required" }]

                [[install_group]]
                group = "Optional"

                [[install_group.software]]
                artifact = "/opt/homebrew/bin/optional"
                install = [{ brew = "optional" }]
            "#,
                FakeInstaller::creating(),
                FakePrompter::default(),
            )?
            .with_internal(internal);

        orchestrator.run(RunMode::SkipOptional)?;
        assert_eq!(
            orchestrator.installer().calls(),
            vec![
                "install run install homebrew".to_string(),
                "install brew required".to_string(),
            ]
        );
        assert!(orchestrator.prompter.questions().is_empty());
        Ok(())
    }

    #[test]
    fn bootstrap_skipped_without_homebrew_steps() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let internal = fixture.config(
            r#"
            [[install_group]]
            group = "Internal Requirements"

            [[install_group.software]]
            artifact = "/opt/homebrew/bin/brew"
            install = [{ run = "install homebrew" }]
        "#,
        )?;
        let orchestrator = fixture
            .orchestrator(
                r#"
                [[install_group]]
                group = "Required"
                optional = false

                [[install_group.software]]
                artifact = "/Users/blah/.local/bin/tool"
                install = [{ run = "make install" }]
            "#,
                FakeInstaller::creating(),
                FakePrompter::default(),
            )?
            .with_internal(internal);

        orchestrator.run(RunMode::Full)?;
        assert_eq!(
            orchestrator.installer().calls(),
            vec!["install run make install".to_string()]
        );
        Ok(())
    }

    #[test]
    fn only_mode_resolves_single_target() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let body = r#"
            [[install_group]]
            group = "Editors"

            [[install_group.software]]
            name = "Visual Studio Code"
            artifact = "/Applications/Visual Studio Code.app"
            install = [{ cask = "visual-studio-code" }]

            [[install_group.software]]
            name = "Autodesk Fusion"
            artifact = "/Applications/Autodesk Fusion.app"
            install = [{ cask = "autodesk-fusion" }]
        "#;
        let orchestrator = fixture.orchestrator(
            body,
            FakeInstaller::creating(),
            FakePrompter::answering(&[true]),
        )?;

        orchestrator.run(RunMode::Only("code".into()))?;
        assert_eq!(
            orchestrator.installer().calls(),
            vec!["install cask visual-studio-code".to_string()]
        );
        assert_eq!(
            orchestrator.prompter.questions(),
            vec!["Install Visual Studio Code?".to_string()]
        );

        let result = orchestrator.run(RunMode::Only("blah".into()));
        assert!(matches!(result, Err(Error::NoMatch { .. })));

        let result = orchestrator.run(RunMode::Only("a".into()));
        match result {
            Err(Error::AmbiguousTarget { candidates, .. }) => assert_eq!(
                candidates,
                vec![
                    "Visual Studio Code (artifact: /Applications/Visual Studio Code.app)"
                        .to_string(),
                    "Autodesk Fusion (artifact: /Applications/Autodesk Fusion.app)".to_string(),
                ]
            ),
            other => panic!("expected ambiguous target, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn run_wraps_entry_errors_with_name() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let orchestrator = fixture.orchestrator(
            r#"
            [[install_group]]
            group = "Tools"
            optional = false

            [[install_group.software]]
            name = "Broken"
            artifact = "/opt/blah/broken"
            install = [{ run = "true" }]

            [[install_group.software]]
            name = "Never Reached"
            artifact = "/opt/blah/never"
            install = [{ run = "true" }]
        "#,
            FakeInstaller::default(),
            FakePrompter::default(),
        )?;

        let err = orchestrator.run(RunMode::Full).unwrap_err();
        assert_eq!(err.to_string(), "failed to process Broken");
        assert_eq!(orchestrator.installer().count("install"), 1);
        Ok(())
    }
}
