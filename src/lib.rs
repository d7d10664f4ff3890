// ==========================================
// 羽绒拼配优化系统 - 核心库
// ==========================================
// 系统定位: 配比决策支持 (人工最终确认)
// 输入: 库存批次快照 + 拼配需求
// 输出: 排名后的候选配比方案
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值对象与类型
pub mod domain;

// 配置层 - 容差/权重/搜索预算
pub mod config;

// 引擎层 - 兼容性/生成/分配/评分/筛选
pub mod engine;

// API 层 - 对外入口
pub mod api;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ColorTier, MaterialState, QualityMetric, Species};

// 领域实体
pub use domain::{
    AllocatedLot, Allocation, Candidate, ComplianceFlags, LotBuilder, LotKey, LotRecord,
    MetricSummary, ProductCode, QualityValues, Requirements, ScoreBreakdown, Solution,
};

// 配置
pub use config::{OptimizerConfig, ScoringWeights, SearchLimits, Tolerances};

// 引擎
pub use engine::{
    AllocationSolver, BlendOrchestrator, CombinationGenerator, CompatibilityRules,
    EligibilityFilter, GenerationStrategy, OptimizationReport, ScoringEngine, SolutionSelector,
};

// API
pub use api::{optimize, ApiError, ApiResult, BlendApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "羽绒拼配优化系统";
