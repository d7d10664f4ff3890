// ==========================================
// 羽绒拼配优化系统 - 拼配 API
// ==========================================
// 职责: 对外唯一入口 optimize + 配比模拟 simulate_blend
// 契约:
// - 需求不合法 → ValidationError，搜索不开始
// - 无可行方案 → Ok(空列表)
// - 不做任何网络/文件/持久化 I/O
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::config::OptimizerConfig;
use crate::domain::lot::{LotKey, LotRecord};
use crate::domain::requirements::Requirements;
use crate::domain::solution::{Allocation, Solution};
use crate::engine::error::EngineError;
use crate::engine::orchestrator::{BlendOrchestrator, OptimizationReport};
use crate::engine::strategy::GenerationStrategy;

// ==========================================
// BlendApi - 拼配 API
// ==========================================
pub struct BlendApi {
    orchestrator: Arc<BlendOrchestrator>,
}

impl BlendApi {
    /// 创建新的BlendApi实例
    ///
    /// # 参数
    /// - config: 优化器配置（不合法时返回 ConfigError）
    pub fn new(config: OptimizerConfig) -> ApiResult<Self> {
        Ok(Self {
            orchestrator: Arc::new(BlendOrchestrator::new(config)?),
        })
    }

    /// 指定策略顺序创建
    pub fn with_strategies(
        config: OptimizerConfig,
        strategies: Vec<GenerationStrategy>,
    ) -> ApiResult<Self> {
        let orchestrator = BlendOrchestrator::new(config)?.with_strategies(strategies);
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// 拼配优化: 返回按评分排序的方案
    pub fn optimize(
        &self,
        inventory: &[LotRecord],
        requirements: &Requirements,
    ) -> ApiResult<Vec<Solution>> {
        Ok(self.optimize_with_report(inventory, requirements)?.solutions)
    }

    /// 拼配优化: 返回带统计信息的完整结果
    pub fn optimize_with_report(
        &self,
        inventory: &[LotRecord],
        requirements: &Requirements,
    ) -> ApiResult<OptimizationReport> {
        let report = self.orchestrator.run(inventory, requirements)?;
        info!(
            request_id = %report.request_id,
            solutions = report.solutions.len(),
            "拼配优化完成"
        );
        Ok(report)
    }

    /// 配比模拟: 对调用方给定的 {批次标识: 用量} 直接评分
    ///
    /// # 规则
    /// - 用量为 0 的条目忽略；用量为负或非有限值 → InvalidInput
    /// - (物料编码, 批次号) 不在库存中 → NotFound
    /// - 不受单批次最小用量限制
    /// - 用量超过批次可用量 → InvalidInput
    /// - 需求总量以配比合计为准
    pub fn simulate_blend(
        &self,
        inventory: &[LotRecord],
        composition: &BTreeMap<LotKey, f64>,
        requirements: &Requirements,
    ) -> ApiResult<Solution> {
        let mut items: Vec<(&LotRecord, f64)> = Vec::with_capacity(composition.len());
        for (key, &qty) in composition {
            if !qty.is_finite() || qty < 0.0 {
                return Err(ApiError::InvalidInput(format!(
                    "批次{}用量无效: {}",
                    key, qty
                )));
            }
            if qty == 0.0 {
                continue;
            }
            let lot = inventory
                .iter()
                .find(|l| l.matches(key))
                .ok_or_else(|| EngineError::LotNotFound(key.to_string()))?;
            if qty > lot.available_qty {
                return Err(ApiError::InvalidInput(format!(
                    "批次{}用量 {} 超出可用量 {}",
                    key, qty, lot.available_qty
                )));
            }
            items.push((lot, qty));
        }
        if items.is_empty() {
            return Err(EngineError::EmptyComposition.into());
        }

        let allocation = Allocation::new(items);
        let mut req = requirements.clone();
        req.total_qty = allocation.total();
        req.validate().map_err(EngineError::from)?;

        debug!(lots = allocation.len(), total_qty = req.total_qty, "配比模拟");
        Ok(self.orchestrator.score_allocation(&allocation, &req))
    }
}

/// 拼配优化（默认配置）
pub fn optimize(inventory: &[LotRecord], requirements: &Requirements) -> ApiResult<Vec<Solution>> {
    BlendApi::new(OptimizerConfig::default())?.optimize(inventory, requirements)
}
