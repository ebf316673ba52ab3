//! Codec 错误类型

use thiserror::Error;

/// 单条记录解码失败
#[derive(Debug, Error)]
pub enum CodecError {
    /// 读取底层文件失败
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// 记录格式错误（截断或无法解析）
    #[error("malformed record: {message}")]
    Malformed {
        /// 错误消息
        message: String,
    },
}

impl CodecError {
    pub fn malformed(message: impl ToString) -> Self {
        Self::Malformed {
            message: message.to_string(),
        }
    }
}

/// Codec Result 类型别名
pub type CodecResult<T> = std::result::Result<T, CodecError>;
