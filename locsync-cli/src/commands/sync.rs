//! `locsync sync`: translate what changed and rewrite target files.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use locsync_sync::{
    run_until, FailurePolicy, FallbackScope, LanguageReport, RunOptions, RunReport, SyncError,
    WriteResult,
};

use super::{chat_factory, load, runtime};
use crate::GlobalOpts;

/// Arguments for `locsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show what would be written, with diffs, without touching any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Write every language that succeeded even if others failed.
    #[arg(long)]
    pub keep_going: bool,

    /// How far a failed batch call falls back to one-by-one translation.
    #[arg(long, value_enum, default_value_t = FallbackArg::Chunk)]
    pub fallback: FallbackArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackArg {
    /// Retry only the failing chunk one string at a time.
    Chunk,
    /// After the first failed chunk, stop batching for the rest of the language.
    Run,
}

impl From<FallbackArg> for FallbackScope {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Chunk => FallbackScope::Chunk,
            FallbackArg::Run => FallbackScope::Run,
        }
    }
}

impl SyncArgs {
    pub fn run(self, global: &GlobalOpts) -> Result<()> {
        let (path, config) = load(global)?;
        let options = RunOptions {
            dry_run: self.dry_run,
            failure_policy: if self.keep_going {
                FailurePolicy::Isolate
            } else {
                FailurePolicy::AbortAll
            },
            fallback_scope: self.fallback.into(),
        };

        tracing::debug!(?options, targets = config.targets.len(), "starting sync");
        let factory = chat_factory(&config);
        let config = Arc::new(config);
        let base_dir = config.base_dir.clone();

        let result = runtime()?.block_on(run_until(
            config,
            factory,
            options,
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
        ));
        let report = match result {
            Ok(report) => report,
            Err(SyncError::Aborted) => bail!("sync cancelled; no files were written"),
            Err(err) => {
                return Err(err).with_context(|| format!("sync failed for {}", path.display()))
            }
        };

        print_report(&report, &base_dir, self.dry_run);

        if !report.failures.is_empty() {
            bail!("{} language(s) failed", report.failures.len());
        }
        Ok(())
    }
}

fn print_report(report: &RunReport, base_dir: &Path, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    for language in &report.languages {
        println!("{prefix}{}", language_line(language));
        for write in &language.writes {
            print_write(write, base_dir);
        }
    }
    if report.source_outputs.iter().any(WriteResult::is_change) {
        println!("{prefix}✓ source outputs");
        for write in &report.source_outputs {
            print_write(write, base_dir);
        }
    }
    for failure in &report.failures {
        println!(
            "{prefix}{} {} — {}",
            "✗".red().bold(),
            failure.language,
            failure.error
        );
    }
}

fn language_line(report: &LanguageReport) -> String {
    if !report.has_changes {
        return format!("{} {} — up to date", "·".bright_black(), report.language);
    }
    format!(
        "{} {} — {} translated, {} kept, {} removed",
        "✓".green().bold(),
        report.language,
        report.translated,
        report.preserved,
        report.removed
    )
}

fn print_write(write: &WriteResult, base_dir: &Path) {
    let shown = write
        .path()
        .strip_prefix(base_dir)
        .unwrap_or_else(|_| write.path())
        .display();
    match write {
        WriteResult::Written { .. } => println!("  ✎  {shown}"),
        WriteResult::Unchanged { .. } => println!("  ·  {shown}"),
        WriteResult::WouldWrite { diff, .. } => {
            println!("  ~  {shown}");
            for line in diff.lines() {
                println!("{}", colorize_diff_line(line));
            }
        }
        WriteResult::Skipped { reason, .. } => {
            println!("  {}  {shown} ({reason})", "!".yellow().bold())
        }
    }
}

fn colorize_diff_line(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold().to_string()
    } else if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else if line.starts_with("@@") {
        line.cyan().to_string()
    } else {
        line.to_string()
    }
}
