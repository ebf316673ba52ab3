//! `merge` command implementation.

use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use contracts::TimelineSink;
use observability::MergeMetricsAggregator;
use sync_engine::Alignment;
use timeline::{DumpSink, JsonSink, TimestampStyle};
use tracing::{info, warn};

use crate::browser::Browser;
use crate::cli::MergeArgs;
use crate::commands::print_tag_usage;
use crate::config;

/// Execute the `merge` command
pub fn run_merge(args: &MergeArgs) -> Result<()> {
    let config = config::resolve(&args.align)?;
    let mut alignment =
        Alignment::open(&args.align.paths, config).context("Failed to open trace logs")?;

    let style = if args.utc {
        TimestampStyle::Utc
    } else {
        TimestampStyle::Raw
    };

    if args.show_tags {
        let usage = alignment
            .tag_usage()
            .context("Failed to collect sync evidence")?;
        print_tag_usage(&usage, &mut io::stdout().lock())?;
    }

    alignment.align().context("Alignment failed")?;
    for file in alignment.excluded() {
        warn!(file = %file, "Log left out of the merge");
    }

    if args.interactive {
        let index = alignment
            .build_index()
            .context("Failed to index merged timeline")?;
        info!(records = index.len(), "Merged timeline indexed");

        let stdin = io::stdin();
        let mut out = io::stdout().lock();
        Browser::new(&index, style)
            .run(alignment.files_mut(), stdin.lock(), &mut out)
            .context("Interactive browsing failed")?;
    } else {
        let out = BufWriter::new(io::stdout().lock());
        let mut sink: Box<dyn TimelineSink> = if args.json {
            Box::new(JsonSink::new("stdout-json", out))
        } else {
            Box::new(DumpSink::new("stdout-dump", out, style))
        };

        let mut aggregator = MergeMetricsAggregator::new();
        for entry in alignment.merger().context("Failed to start merge")? {
            let entry = entry.context("Merge failed")?;
            aggregator.update(&entry);
            sink.write(&entry)
                .with_context(|| format!("Sink '{}' rejected a record", sink.name()))?;
        }
        sink.flush().context("Failed to flush output")?;

        info!(
            records = aggregator.total_records,
            files = aggregator.records_per_file.len(),
            "Merge completed"
        );

        if args.summary {
            eprint!("{}", aggregator.summary());
        }
    }

    if args.report {
        if let Some(report) = alignment.report() {
            eprint!("{report}");
        }
    }

    Ok(())
}
