// ==========================================
// 羽绒拼配优化系统 - 引擎层
// ==========================================
// 职责: 兼容性规则 / 候选准入 / 组合生成 / 分配求解 / 评分 / 筛选
// 红线: 引擎不做 I/O，唯一对外错误为输入校验失败
// ==========================================

pub mod allocation;
pub mod compatibility;
pub mod eligibility;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod scoring;
pub mod selector;
pub mod strategy;

// 重导出核心引擎
pub use allocation::{AllocationFailure, AllocationSolver};
pub use compatibility::CompatibilityRules;
pub use eligibility::{EligibilityFilter, EligibilityOutcome};
pub use error::{EngineError, EngineResult};
pub use generator::{CombinationGenerator, GenerationOutcome};
pub use orchestrator::{BlendOrchestrator, OptimizationReport};
pub use scoring::{weighted_average, ScoringEngine};
pub use selector::SolutionSelector;
pub use strategy::GenerationStrategy;
