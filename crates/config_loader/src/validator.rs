//! 配置校验模块
//!
//! 校验规则：
//! - 派生规则 (`validator`)：outlier_tolerance_ms 范围
//! - outlier_tolerance_ms 为有限值
//! - 每个文件至多一条 tweak
//! - tweak 幅度不超过一小时

use std::collections::HashSet;

use contracts::{AlignmentConfig, WeaverError};
use validator::Validate;

/// 单条 tweak 的幅度上限（微秒）
pub const MAX_TWEAK_MICROS: i64 = 3_600_000_000;

/// 校验 AlignmentConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &AlignmentConfig) -> Result<(), WeaverError> {
    validate_tolerance(config)?;
    validate_derived(config)?;
    validate_tweaks(config)?;
    Ok(())
}

/// 校验容差为有限值
fn validate_tolerance(config: &AlignmentConfig) -> Result<(), WeaverError> {
    if !config.outlier_tolerance_ms.is_finite() {
        return Err(WeaverError::config_validation(
            "outlier_tolerance_ms",
            format!("must be finite, got {}", config.outlier_tolerance_ms),
        ));
    }
    Ok(())
}

/// 派生规则
fn validate_derived(config: &AlignmentConfig) -> Result<(), WeaverError> {
    config.validate().map_err(|errors| {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        WeaverError::config_validation(fields.join(", "), errors.to_string())
    })
}

/// 校验 tweak 唯一性与幅度
fn validate_tweaks(config: &AlignmentConfig) -> Result<(), WeaverError> {
    let mut seen = HashSet::new();
    for (idx, tweak) in config.tweaks.iter().enumerate() {
        if !seen.insert(tweak.file) {
            return Err(WeaverError::config_validation(
                format!("tweaks[{idx}].file"),
                format!("duplicate tweak for {}", tweak.file),
            ));
        }
        if tweak.micros.unsigned_abs() > MAX_TWEAK_MICROS.unsigned_abs() {
            return Err(WeaverError::config_validation(
                format!("tweaks[{idx}].micros"),
                format!(
                    "tweak {}us exceeds the {}us limit",
                    tweak.micros, MAX_TWEAK_MICROS
                ),
            ));
        }
    }
    Ok(())
}
