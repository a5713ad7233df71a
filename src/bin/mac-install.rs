// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use mac_install::{
    config::{Config, ResolveContext},
    path::default_exclusion_store_dir,
    ExclusionStore, InquirePrompter, Orchestrator, RunMode, SystemInstaller,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, process::exit};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install and configure macOS software from a declarative manifest.
#[derive(Debug, Clone, Parser)]
#[command(about, long_about = None, version)]
struct Cli {
    /// Path to installation manifest.
    #[arg(short, long, value_name = "path", default_value = "install.toml")]
    pub config: PathBuf,

    /// Skip every optional install group.
    #[arg(long, conflicts_with = "only")]
    pub skip_optional: bool,

    /// Only install the one software entry whose name matches.
    #[arg(long, value_name = "name")]
    pub only: Option<String>,
}

impl Cli {
    fn run_mode(&self) -> RunMode {
        match (&self.only, self.skip_optional) {
            (Some(fragment), _) => RunMode::Only(fragment.clone()),
            (None, true) => RunMode::SkipOptional,
            (None, false) => RunMode::Full,
        }
    }

    fn run(self) -> Result<()> {
        if !cfg!(target_os = "macos") {
            bail!("mac-install only runs on macOS");
        }

        let manifest = std::path::absolute(&self.config)
            .with_context(|| format!("cannot resolve manifest path {:?}", self.config.display()))?;
        let work_dir = manifest
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        debug!("manifest {:?}, work directory {:?}", manifest.display(), work_dir.display());

        let context = ResolveContext::detect()?;
        let config = Config::load(&manifest, &context)?;
        let internal = Config::internal(&context)?;
        let store = ExclusionStore::open(default_exclusion_store_dir()?)?;
        let installer = SystemInstaller::new(work_dir, &context.brew_prefix);

        Orchestrator::new(config, installer, InquirePrompter::new(), store)
            .with_internal(internal)
            .run(self.run_mode())?;

        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if env::var("TERM").map_or(true, |term| term.is_empty() || term == "dumb") {
        colored::control::set_override(false);
    }

    if let Err(error) = Cli::parse().run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}
