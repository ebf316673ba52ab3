//! `tags` command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use sync_engine::{Alignment, TagOccurrence, TagUsage};
use tracing::info;

use crate::cli::TagsArgs;
use crate::config;

/// Tag usage row for JSON output
#[derive(Serialize)]
struct TagRow {
    tag: u32,
    files: Vec<u16>,
    class: &'static str,
    occurrences: Vec<OccurrenceRow>,
}

/// One raw use of a tag
#[derive(Serialize)]
struct OccurrenceRow {
    file: u16,
    /// Local (unaligned) timestamp
    timestamp: String,
    position: u64,
    sign: char,
}

impl From<&TagOccurrence> for OccurrenceRow {
    fn from(occurrence: &TagOccurrence) -> Self {
        Self {
            file: occurrence.file.get(),
            timestamp: occurrence.timestamp.to_string(),
            position: occurrence.position,
            sign: occurrence.sign(),
        }
    }
}

impl From<&TagUsage> for TagRow {
    fn from(usage: &TagUsage) -> Self {
        Self {
            tag: usage.tag,
            files: usage.files.iter().map(|f| f.get()).collect(),
            class: usage.class.as_str(),
            occurrences: usage.occurrences.iter().map(OccurrenceRow::from).collect(),
        }
    }
}

/// Execute the `tags` command
pub fn run_tags(args: &TagsArgs) -> Result<()> {
    let config = config::resolve(&args.align)?;
    let mut alignment =
        Alignment::open(&args.align.paths, config).context("Failed to open trace logs")?;
    let usage = alignment
        .tag_usage()
        .context("Failed to collect sync evidence")?;
    info!(tags = usage.len(), "Tag usage collected");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let rows: Vec<TagRow> = usage.iter().map(TagRow::from).collect();
        let json = serde_json::to_string_pretty(&rows).context("Failed to serialize tag usage")?;
        writeln!(out, "{json}")?;
    } else {
        print_tag_usage(&usage, &mut out)?;
    }
    Ok(())
}

/// Print the usage map: one summary line per tag, one indented line per use
pub fn print_tag_usage<W: Write>(usage: &[TagUsage], out: &mut W) -> std::io::Result<()> {
    writeln!(out, "=== Sync Tags ({}) ===", usage.len())?;
    for row in usage {
        let files: Vec<String> = row.files.iter().map(|f| f.get().to_string()).collect();
        writeln!(
            out,
            "{:>10} {:<9} occurrences={} files=[{}]",
            row.tag,
            row.class.as_str(),
            row.occurrences.len(),
            files.join(",")
        )?;
        for occurrence in &row.occurrences {
            writeln!(
                out,
                "{:>12}{} @{} byte={} {}",
                "",
                occurrence.file,
                occurrence.timestamp,
                occurrence.position,
                occurrence.sign()
            )?;
        }
    }
    Ok(())
}
