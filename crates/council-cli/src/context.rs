use anyhow::Result;
use council_agent::CouncilEngine;
use council_core::AppConfig;
use std::path::{Path, PathBuf};

/// Resolved global flags shared by every subcommand.
pub(crate) struct CliContext {
    pub workspace: PathBuf,
    pub verbose: bool,
    pub json: bool,
}

impl CliContext {
    pub(crate) fn new(workspace: Option<PathBuf>, verbose: bool, json: bool) -> Result<Self> {
        let workspace = match workspace {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        Ok(Self {
            workspace,
            verbose,
            json,
        })
    }

    pub(crate) fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Merged config with `--verbose` applied on top.
    pub(crate) fn config(&self) -> Result<AppConfig> {
        let mut cfg = AppConfig::load(&self.workspace)?;
        if self.verbose {
            cfg.verbose = true;
        }
        Ok(cfg)
    }

    pub(crate) fn engine(&self) -> Result<CouncilEngine> {
        CouncilEngine::with_config(&self.workspace, self.config()?)
    }
}
