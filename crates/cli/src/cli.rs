//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use contracts::{
    DecodeErrorPolicy, DeltaSource, ManualTweak, OffsetStrategy, TraceFormat, TraversalOrder,
};
use std::path::PathBuf;

/// Weaver Align - clock alignment and merge of tile trace logs
#[derive(Parser, Debug)]
#[command(
    name = "weaver-align",
    author,
    version,
    about = "Align and merge tile trace logs into one timeline",
    long_about = "Estimates the clock offset of every trace log from shared sync tags,\n\
                  picks the log whose history reaches back farthest as time origin, \n\
                  and merges all records into one globally ordered timeline."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "WEAVER_ALIGN_VERBOSE")]
    pub verbose: u8,

    /// Suppress all logging except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (logs go to stderr)
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "WEAVER_ALIGN_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align the logs and print the merged timeline
    Merge(MergeArgs),

    /// Print the sync tag usage map of the logs
    Tags(TagsArgs),

    /// Validate an alignment configuration file
    Validate(ValidateArgs),
}

/// Inputs and alignment settings shared by `merge` and `tags`
#[derive(Args, Debug, Clone)]
pub struct AlignArgs {
    /// Trace logs, numbered 0.. in the order given
    #[arg(required = true, num_args = 1.., value_name = "TRACE")]
    pub paths: Vec<PathBuf>,

    /// Alignment configuration file (TOML or JSON)
    #[arg(short, long, env = "WEAVER_ALIGN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Manual correction FILE/MICROS added to a file's offset (repeatable)
    #[arg(short, long = "tweak", value_name = "FILE/MICROS")]
    pub tweaks: Vec<ManualTweak>,

    /// Outlier tolerance in milliseconds
    #[arg(long, env = "WEAVER_ALIGN_TOLERANCE_MS")]
    pub tolerance_ms: Option<f64>,

    /// Timestamps feeding the pairwise deltas
    #[arg(long, value_enum)]
    pub delta_source: Option<DeltaSourceArg>,

    /// Offset propagation order
    #[arg(long, value_enum)]
    pub traversal: Option<TraversalArg>,

    /// Offset derivation strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// What an undecodable record means for its log
    #[arg(long, value_enum)]
    pub decode_errors: Option<DecodeErrorsArg>,

    /// Force the trace format instead of detecting it from the extension
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Merge the reachable logs instead of aborting on unreachable ones
    #[arg(long)]
    pub exclude_unreachable: bool,
}

/// Arguments for the `merge` command
#[derive(Parser, Debug, Clone)]
pub struct MergeArgs {
    #[command(flatten)]
    pub align: AlignArgs,

    /// Browse the merged timeline from stdin (<n>, n, p, q)
    #[arg(short, long, conflicts_with = "json")]
    pub interactive: bool,

    /// Print the sync tag usage map before merging
    #[arg(long)]
    pub show_tags: bool,

    /// Emit merged records as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Print timestamps as UTC instead of raw seconds.nanos
    #[arg(long)]
    pub utc: bool,

    /// Print the alignment report to stderr
    #[arg(long)]
    pub report: bool,

    /// Print merge statistics to stderr
    #[arg(long)]
    pub summary: bool,
}

/// Arguments for the `tags` command
#[derive(Parser, Debug, Clone)]
pub struct TagsArgs {
    #[command(flatten)]
    pub align: AlignArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "weaver.toml", env = "WEAVER_ALIGN_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DeltaSourceArg {
    /// Difference of first-record timestamps
    FirstRecord,
    /// Difference of the matched tagged records
    MatchedRecord,
}

impl From<DeltaSourceArg> for DeltaSource {
    fn from(arg: DeltaSourceArg) -> Self {
        match arg {
            DeltaSourceArg::FirstRecord => Self::FirstRecord,
            DeltaSourceArg::MatchedRecord => Self::MatchedRecord,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TraversalArg {
    DepthFirst,
    BreadthFirst,
}

impl From<TraversalArg> for TraversalOrder {
    fn from(arg: TraversalArg) -> Self {
        match arg {
            TraversalArg::DepthFirst => Self::DepthFirst,
            TraversalArg::BreadthFirst => Self::BreadthFirst,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StrategyArg {
    /// First path from the time origin wins
    SinglePath,
    /// Weighted fit over every pair average
    LeastSquares,
}

impl From<StrategyArg> for OffsetStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::SinglePath => Self::SinglePath,
            StrategyArg::LeastSquares => Self::LeastSquares,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DecodeErrorsArg {
    /// Stop reading the log, keep what was decoded
    TreatAsEof,
    /// Abort the run
    Fail,
}

impl From<DecodeErrorsArg> for DecodeErrorPolicy {
    fn from(arg: DecodeErrorsArg) -> Self {
        match arg {
            DecodeErrorsArg::TreatAsEof => Self::TreatAsEof,
            DecodeErrorsArg::Fail => Self::Fail,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    Jsonl,
    Bincode,
}

impl From<FormatArg> for TraceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jsonl => Self::JsonLines,
            FormatArg::Bincode => Self::Bincode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use contracts::FileNumber;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_merge_args() {
        let cli = Cli::try_parse_from([
            "weaver-align",
            "-vv",
            "merge",
            "a.jsonl",
            "b.jsonl",
            "--tweak",
            "1/250",
            "-t",
            "0/-5",
            "--strategy",
            "least-squares",
            "--utc",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.align.paths.len(), 2);
        assert_eq!(args.align.tweaks.len(), 2);
        assert_eq!(args.align.tweaks[0].file, FileNumber::new(1));
        assert!(matches!(args.align.strategy, Some(StrategyArg::LeastSquares)));
        assert!(args.utc);
        assert!(!args.interactive);
    }

    #[test]
    fn test_merge_requires_paths() {
        assert!(Cli::try_parse_from(["weaver-align", "merge"]).is_err());
    }

    #[test]
    fn test_bad_tweak_rejected() {
        let result = Cli::try_parse_from(["weaver-align", "merge", "a.jsonl", "--tweak", "250"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_interactive_conflicts_with_json() {
        let result =
            Cli::try_parse_from(["weaver-align", "merge", "a.jsonl", "--interactive", "--json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["weaver-align", "-q", "-v", "tags", "a.jsonl"]);
        assert!(result.is_err());
    }
}
