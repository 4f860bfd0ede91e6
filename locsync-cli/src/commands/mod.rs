pub mod init;
pub mod status;
pub mod sync;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use locsync_core::{find_config_in, Config};
use locsync_translate::{ChatFactory, TranslatorFactory};
use tokio::runtime::Runtime;

use crate::GlobalOpts;

/// Resolve `--config`, or look for a config file in the working directory.
pub fn config_path(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(path) = &global.config {
        return Ok(path.clone());
    }
    let cwd = std::env::current_dir().context("could not determine working directory")?;
    find_config_in(&cwd).with_context(|| {
        format!(
            "no locsync.yaml in {}; run `locsync init` or pass --config",
            cwd.display()
        )
    })
}

/// Load the config and install logging at the configured verbosity.
pub fn load(global: &GlobalOpts) -> Result<(PathBuf, Config)> {
    let path = config_path(global)?;
    let config =
        Config::load(&path).with_context(|| format!("failed to load {}", path.display()))?;
    locsync_watch::init_tracing(global.verbose || config.verbose);
    Ok((path, config))
}

pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

pub fn chat_factory(config: &Config) -> Arc<dyn TranslatorFactory> {
    Arc::new(ChatFactory::new(config.backend.clone()))
}
