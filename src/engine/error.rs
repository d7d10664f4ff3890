// ==========================================
// 羽绒拼配优化系统 - 引擎层错误类型
// ==========================================
// 职责: 引擎唯一对外抛出的错误是输入校验失败
// 说明: 组合不可行/无解/部分合规均不属于错误
// ==========================================

use crate::config::ConfigError;
use crate::domain::requirements::RequirementsViolation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("需求校验失败 (field: {field}): {message}")]
    InvalidRequirements { field: String, message: String },

    #[error("配置无效 (field: {field}): {message}")]
    InvalidConfig { field: String, message: String },

    #[error("批次不存在: {0}")]
    LotNotFound(String),

    #[error("配比为空: 没有正数量的批次")]
    EmptyComposition,
}

impl From<RequirementsViolation> for EngineError {
    fn from(v: RequirementsViolation) -> Self {
        EngineError::InvalidRequirements {
            field: v.field,
            message: v.message,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ValueError { key, message, .. } => EngineError::InvalidConfig {
                field: key,
                message,
            },
            other => EngineError::InvalidConfig {
                field: "config".to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
