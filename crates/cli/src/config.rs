//! Builds the effective `AlignmentConfig`: file values, then command-line overrides.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::AlignmentConfig;
use tracing::{debug, info};

use crate::cli::AlignArgs;
use crate::error::CliError;

/// Load the configuration named by `--config` (if any) and apply the flags
pub fn resolve(args: &AlignArgs) -> Result<AlignmentConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path).into());
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => AlignmentConfig::default(),
    };

    if let Some(tolerance) = args.tolerance_ms {
        config.outlier_tolerance_ms = tolerance;
    }
    if let Some(source) = args.delta_source {
        config.delta_source = source.into();
    }
    if let Some(traversal) = args.traversal {
        config.traversal = traversal.into();
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(policy) = args.decode_errors {
        config.decode_errors = policy.into();
    }
    if let Some(format) = args.format {
        config.format = Some(format.into());
    }
    if args.exclude_unreachable {
        config.exclude_unreachable = true;
    }

    let config = ConfigLoader::with_tweaks(config, &args.tweaks)
        .context("Invalid alignment settings")?;

    debug!(
        tolerance_ms = config.outlier_tolerance_ms,
        delta_source = ?config.delta_source,
        traversal = ?config.traversal,
        strategy = ?config.strategy,
        tweaks = config.tweaks.len(),
        "Alignment configuration resolved"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use contracts::{ClockOffset, FileNumber, OffsetStrategy, TraversalOrder};
    use std::io::Write;

    fn align_args(argv: &[&str]) -> AlignArgs {
        let mut full = vec!["weaver-align", "tags", "a.jsonl"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Tags(args) => args.align,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(&align_args(&[])).unwrap();
        assert_eq!(config.outlier_tolerance_ms, 10.0);
        assert!(config.tweaks.is_empty());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "outlier_tolerance_ms = 3.0\ntraversal = \"breadth_first\"\n\n[[tweaks]]\nfile = 1\nmicros = 10"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = resolve(&align_args(&[
            "--config",
            &path,
            "--tolerance-ms",
            "7.5",
            "--strategy",
            "least-squares",
            "--tweak",
            "1/-20",
        ]))
        .unwrap();

        assert_eq!(config.outlier_tolerance_ms, 7.5);
        assert_eq!(config.traversal, TraversalOrder::BreadthFirst);
        assert_eq!(config.strategy, OffsetStrategy::LeastSquares);
        assert_eq!(
            config.tweak_for(FileNumber::new(1)),
            ClockOffset::from_micros(-20)
        );
    }

    #[test]
    fn test_missing_config_file() {
        let err = resolve(&align_args(&["--config", "/nonexistent/weaver.toml"])).unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some());
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(resolve(&align_args(&["--tolerance-ms=-1"])).is_err());
    }

    #[test]
    fn test_most_negative_tweak_rejected() {
        let err = resolve(&align_args(&["--tweak", "0/-9223372036854775808"])).unwrap_err();
        assert!(format!("{err:#}").contains("tweaks[0].micros"));
    }
}
