//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AlignmentConfig, DeltaSource, OffsetStrategy};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<AlignmentConfig>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            config: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                config: Some(config),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            config: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &AlignmentConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.outlier_tolerance_ms == 0.0 {
        warnings.push(
            "outlier_tolerance_ms is 0 - any disagreeing sample aborts the alignment".to_string(),
        );
    }

    if config.delta_source == DeltaSource::FirstRecord && config.outlier_tolerance_ms > 0.0 {
        warnings.push(
            "delta_source = first_record gives identical samples per pair - outlier detection only \
             triggers with matched_record"
                .to_string(),
        );
    }

    if config.strategy == OffsetStrategy::LeastSquares && config.exclude_unreachable {
        warnings.push(
            "least_squares with exclude_unreachable fits only the files linked to the time origin"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref config) = result.config {
            println!("\n  Outlier tolerance: {} ms", config.outlier_tolerance_ms);
            println!("  Delta source: {:?}", config.delta_source);
            println!("  Traversal: {:?}", config.traversal);
            println!("  Strategy: {:?}", config.strategy);
            println!("  Decode errors: {:?}", config.decode_errors);
            println!("  Exclude unreachable: {}", config.exclude_unreachable);
            if let Some(format) = config.format {
                println!("  Forced format: {:?}", format);
            }
            if !config.tweaks.is_empty() {
                let tweaks: Vec<String> = config.tweaks.iter().map(|t| t.to_string()).collect();
                println!("  Tweaks: {}", tweaks.join(" "));
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn args(path: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: true,
        }
    }

    #[test]
    fn test_valid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "delta_source = \"matched_record\"").unwrap();
        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(result.valid);
        assert!(result.warnings.is_none());
        assert!(result.config.is_some());
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{\"outlier_tolerance_ms\": -4}}").unwrap();
        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("outlier_tolerance_ms"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&args(PathBuf::from("/nonexistent/weaver.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }

    #[test]
    fn test_default_config_warns_about_first_record() {
        let warnings = collect_warnings(&AlignmentConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("first_record"));
    }
}
