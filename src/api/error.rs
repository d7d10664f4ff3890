// ==========================================
// 羽绒拼配优化系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把引擎/配置错误转换为调用方可读的消息
// 说明: 无解不是错误（返回空列表），只有输入问题会出现在这里
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::EngineError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidRequirements { field, message } => {
                ApiError::ValidationError(format!("{}: {}", field, message))
            }
            EngineError::InvalidConfig { field, message } => {
                ApiError::ConfigError(format!("{}: {}", field, message))
            }
            EngineError::LotNotFound(key) => {
                ApiError::NotFound(format!("批次({})不存在", key))
            }
            EngineError::EmptyComposition => {
                ApiError::InvalidInput(EngineError::EmptyComposition.to_string())
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_mapping() {
        let err: ApiError = EngineError::InvalidRequirements {
            field: "max_lots".to_string(),
            message: "超出范围".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::ValidationError(ref msg) if msg.starts_with("max_lots")));

        let err: ApiError = EngineError::LotNotFound("3|POB/L404".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("L404")));

        let err: ApiError = EngineError::EmptyComposition.into();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_anyhow_passthrough() {
        let err: ApiError = anyhow::anyhow!("磁盘已满").into();
        assert_eq!(err.to_string(), "磁盘已满");
    }
}
