//! `locsync watch`: sync, then re-sync on every input change until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use locsync_sync::{FailurePolicy, RunOptions};
use locsync_watch::{watch, SyncRunner};

use super::{chat_factory, load, runtime};
use crate::GlobalOpts;

/// Arguments for `locsync watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Write every language that succeeded even if others failed.
    #[arg(long)]
    pub keep_going: bool,
}

impl WatchArgs {
    pub fn run(self, global: &GlobalOpts) -> Result<()> {
        // Loaded here to install logging; the watcher reloads it before every run.
        let (path, _) = load(global)?;

        let options = RunOptions {
            failure_policy: if self.keep_going {
                FailurePolicy::Isolate
            } else {
                FailurePolicy::AbortAll
            },
            ..RunOptions::default()
        };
        let runner = Arc::new(SyncRunner::new(options, chat_factory));

        println!("Watching {} (Ctrl-C to stop)", path.display());
        runtime()?
            .block_on(watch(path.clone(), runner, async {
                let _ = tokio::signal::ctrl_c().await;
            }))
            .with_context(|| format!("watch failed for {}", path.display()))?;
        println!("Stopped.");
        Ok(())
    }
}
