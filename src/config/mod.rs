// ==========================================
// 羽绒拼配优化系统 - 配置层
// ==========================================
// 职责: 容差/评分权重/搜索预算，支持 JSON 覆写
// ==========================================

pub mod optimizer_config;

// 重导出核心配置
pub use optimizer_config::{ConfigError, OptimizerConfig, ScoringWeights, SearchLimits, Tolerances};
