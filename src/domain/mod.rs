// ==========================================
// 羽绒拼配优化系统 - 领域模型层
// ==========================================
// 职责: 定义批次、需求、候选组合与方案等值对象
// 红线: 不含引擎逻辑，不含 I/O
// ==========================================

pub mod lot;
pub mod product_code;
pub mod requirements;
pub mod solution;
pub mod types;

// 重导出核心类型
pub use lot::{LotBuilder, LotKey, LotRecord, QualityValues};
pub use product_code::ProductCode;
pub use requirements::{Requirements, RequirementsViolation, MAX_LOTS_RANGE, NUM_SOLUTIONS_RANGE};
pub use solution::{
    AllocatedLot, Allocation, Candidate, ComplianceFlags, MetricSummary, ScoreBreakdown, Solution,
};
pub use types::{ColorFamily, ColorTier, MaterialState, QualityMetric, Species};
