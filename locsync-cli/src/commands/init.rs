//! `locsync init [--path <dir>] [--force]`

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use locsync_core::{starter_config, CONFIG_FILE_NAMES};

/// Write a starter config.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create locsync.yaml in.
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        fs::create_dir_all(&self.path)
            .with_context(|| format!("cannot create '{}'", self.path.display()))?;
        let target = self.path.join(CONFIG_FILE_NAMES[0]);

        if target.exists() && !self.force {
            bail!(
                "{} already exists; pass --force to overwrite",
                target.display()
            );
        }

        fs::write(&target, starter_config())
            .with_context(|| format!("failed to write {}", target.display()))?;

        println!("✓ Wrote {}", target.display());
        println!("  Edit the source and target files, then run `locsync sync`.");
        Ok(())
    }
}
