//! `locsync status`: per-language freshness, without calling the backend.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use locsync_sync::{preview_keys, status, LanguageStatus, StatusReport, StatusSignal};

use super::{load, runtime};
use crate::GlobalOpts;

/// Arguments for `locsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalOpts) -> Result<()> {
        let (path, config) = load(global)?;
        let report = runtime()?
            .block_on(status(&config))
            .with_context(|| format!("status check failed for {}", path.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&report, &config.base_dir);
        Ok(())
    }
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "")]
    indicator: String,
    #[tabled(rename = "language")]
    language: String,
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "current")]
    current: usize,
    #[tabled(rename = "detail")]
    detail: String,
}

fn print_table(report: &StatusReport, base_dir: &Path) {
    let needs_sync = report
        .languages
        .iter()
        .filter(|l| l.signal != StatusSignal::Current)
        .count();
    println!(
        "locsync v{} | {} | {} keys | {} targets | {} need sync",
        env!("CARGO_PKG_VERSION"),
        relative(&report.source, base_dir),
        report.source_keys,
        report.languages.len(),
        needs_sync,
    );

    let rows: Vec<StatusTableRow> = report
        .languages
        .iter()
        .map(|l| StatusTableRow {
            indicator: signal_indicator(&l.signal),
            language: l.language.clone(),
            file: relative(&l.file, base_dir),
            status: signal_label(&l.signal).to_string(),
            current: l.current,
            detail: signal_detail(l),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if needs_sync > 0 {
        println!("Run 'locsync sync' to update out-of-date targets.");
    }
}

fn relative(path: &Path, base_dir: &Path) -> String {
    path.strip_prefix(base_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn signal_label(signal: &StatusSignal) -> &'static str {
    match signal {
        StatusSignal::NeverSynced => "NEVER SYNCED",
        StatusSignal::Current => "CURRENT",
        StatusSignal::Stale { .. } => "STALE",
        StatusSignal::Orphan { .. } => "ORPHAN",
    }
}

fn signal_indicator(signal: &StatusSignal) -> String {
    match signal {
        StatusSignal::NeverSynced => "■".bright_black().bold().to_string(),
        StatusSignal::Current => "■".green().bold().to_string(),
        StatusSignal::Stale { .. } => "■".yellow().bold().to_string(),
        StatusSignal::Orphan { .. } => "■".magenta().bold().to_string(),
    }
}

fn signal_detail(language: &LanguageStatus) -> String {
    match &language.signal {
        StatusSignal::NeverSynced => "target file missing".to_string(),
        StatusSignal::Current => "up to date".to_string(),
        StatusSignal::Stale { reason } => reason.clone(),
        StatusSignal::Orphan { keys } => format!("{} to remove", preview_keys(keys)),
    }
}
