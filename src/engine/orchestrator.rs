// ==========================================
// 羽绒拼配优化系统 - 引擎编排器
// ==========================================
// 用途: 协调拼配搜索的执行顺序
// 流程: 准入 → 组合生成 → (逐组合) 分配 → 评分 → 筛选
// 红线: 单次调用内全部状态为请求局部，不跨请求共享可变状态
// ==========================================

use crate::config::{OptimizerConfig, Tolerances};
use crate::domain::lot::LotRecord;
use crate::domain::requirements::Requirements;
use crate::domain::solution::{Allocation, Candidate, Solution};
use crate::engine::allocation::AllocationSolver;
use crate::engine::compatibility::CompatibilityRules;
use crate::engine::eligibility::EligibilityFilter;
use crate::engine::error::EngineResult;
use crate::engine::generator::CombinationGenerator;
use crate::engine::scoring::ScoringEngine;
use crate::engine::selector::SolutionSelector;
use crate::engine::strategy::GenerationStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// ==========================================
// OptimizationReport - 优化结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,

    // 准入 / 生成统计
    pub candidates_considered: usize,
    pub combinations_explored: usize,
    pub combinations_feasible: usize,
    pub strategy_counts: Vec<(GenerationStrategy, usize)>,

    // 排序后的方案
    pub solutions: Vec<Solution>,

    /// 仅用实测数据无解，但放开估算数据后有解
    pub estimated_data_would_help: bool,
}

/// 单轮搜索结果
struct SearchPass {
    candidates_considered: usize,
    estimated_excluded: usize,
    combinations_explored: usize,
    combinations_feasible: usize,
    strategy_counts: Vec<(GenerationStrategy, usize)>,
    solutions: Vec<Solution>,
}

// ==========================================
// BlendOrchestrator - 引擎编排器
// ==========================================
pub struct BlendOrchestrator {
    config: OptimizerConfig,
    strategies: Vec<GenerationStrategy>,
    eligibility: EligibilityFilter,
    generator: CombinationGenerator,
    allocator: AllocationSolver,
    scorer: ScoringEngine,
    selector: SolutionSelector,
}

impl BlendOrchestrator {
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - config: 优化器配置（创建时校验）
    pub fn new(config: OptimizerConfig) -> EngineResult<Self> {
        config.validate()?;
        let rules = CompatibilityRules::new(&config.weights);
        Ok(Self {
            strategies: GenerationStrategy::ALL.to_vec(),
            eligibility: EligibilityFilter::new(&config.search),
            generator: CombinationGenerator::new(&config.search, rules),
            allocator: AllocationSolver::new(&config.search),
            scorer: ScoringEngine::new(&config.weights),
            selector: SolutionSelector::new(&config.search),
            config,
        })
    }

    /// 指定策略运行顺序（空列表时保持默认顺序）
    pub fn with_strategies(mut self, strategies: Vec<GenerationStrategy>) -> Self {
        if !strategies.is_empty() {
            self.strategies = strategies;
        }
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn strategies(&self) -> &[GenerationStrategy] {
        &self.strategies
    }

    /// 执行完整拼配搜索
    ///
    /// # 参数
    /// - inventory: 库存快照（只读）
    /// - req: 拼配需求（先校验，失败则不开始搜索）
    ///
    /// # 返回
    /// 优化结果；无可行方案时 solutions 为空，不视为错误
    #[instrument(
        skip(self, inventory, req),
        fields(inventory = inventory.len(), target_dc = req.target_dc, total_qty = req.total_qty)
    )]
    pub fn run(
        &self,
        inventory: &[LotRecord],
        req: &Requirements,
    ) -> EngineResult<OptimizationReport> {
        req.validate()?;
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let tolerances = self.config.tolerances.with_overrides(req);

        info!(
            request_id = %request_id,
            num_solutions = req.num_solutions,
            max_lots = req.max_lots,
            "开始执行拼配搜索"
        );

        let pass = self.search(inventory, req, &tolerances, req.allow_estimated);

        // 级联: 仅实测数据无解时，试探放开估算数据是否有解（不返回估算方案）
        let estimated_data_would_help = if pass.solutions.is_empty()
            && !req.allow_estimated
            && pass.estimated_excluded > 0
        {
            debug!(
                estimated_excluded = pass.estimated_excluded,
                "实测数据无解，试探估算数据"
            );
            !self.search(inventory, req, &tolerances, true).solutions.is_empty()
        } else {
            false
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            request_id = %request_id,
            candidates = pass.candidates_considered,
            explored = pass.combinations_explored,
            feasible = pass.combinations_feasible,
            solutions = pass.solutions.len(),
            estimated_data_would_help,
            elapsed_ms,
            "拼配搜索完成"
        );

        Ok(OptimizationReport {
            request_id,
            generated_at: Utc::now(),
            elapsed_ms,
            candidates_considered: pass.candidates_considered,
            combinations_explored: pass.combinations_explored,
            combinations_feasible: pass.combinations_feasible,
            strategy_counts: pass.strategy_counts,
            solutions: pass.solutions,
            estimated_data_would_help,
        })
    }

    /// 对给定分配直接评分（配比模拟）
    pub fn score_allocation(&self, allocation: &Allocation<'_>, req: &Requirements) -> Solution {
        let tolerances = self.config.tolerances.with_overrides(req);
        self.scorer.score(allocation, req, &tolerances)
    }

    fn search(
        &self,
        inventory: &[LotRecord],
        req: &Requirements,
        tolerances: &Tolerances,
        allow_estimated: bool,
    ) -> SearchPass {
        // ==========================================
        // 步骤1: 候选准入
        // ==========================================
        let eligible = self.eligibility.filter(inventory, req, allow_estimated);
        debug!(candidates = eligible.candidates.len(), "步骤1: 候选准入完成");

        // ==========================================
        // 步骤2: 组合生成
        // ==========================================
        let generated =
            self.generator
                .generate(&eligible.candidates, req, tolerances, &self.strategies);
        debug!(
            combinations = generated.candidates.len(),
            explored = generated.explored,
            "步骤2: 组合生成完成"
        );

        // ==========================================
        // 步骤3: 分配 + 评分
        // ==========================================
        let scored = self.evaluate(&generated.candidates, req, tolerances);
        let combinations_feasible = scored.len();
        let scored: Vec<Solution> = if req.compliant_only {
            scored.into_iter().filter(|s| s.is_fully_compliant()).collect()
        } else {
            scored
        };
        debug!(
            feasible = combinations_feasible,
            kept = scored.len(),
            "步骤3: 分配评分完成"
        );

        // ==========================================
        // 步骤4: 去重 + 排序 + 取前 N
        // ==========================================
        let solutions = self.selector.select(scored, req.num_solutions);

        SearchPass {
            candidates_considered: eligible.candidates.len(),
            estimated_excluded: eligible.estimated_excluded,
            combinations_explored: generated.explored,
            combinations_feasible,
            strategy_counts: generated.per_strategy,
            solutions,
        }
    }

    #[cfg(feature = "parallel")]
    fn evaluate(
        &self,
        candidates: &[Candidate<'_>],
        req: &Requirements,
        tolerances: &Tolerances,
    ) -> Vec<Solution> {
        use rayon::prelude::*;
        candidates
            .par_iter()
            .filter_map(|c| self.evaluate_one(c, req, tolerances))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate(
        &self,
        candidates: &[Candidate<'_>],
        req: &Requirements,
        tolerances: &Tolerances,
    ) -> Vec<Solution> {
        candidates
            .iter()
            .filter_map(|c| self.evaluate_one(c, req, tolerances))
            .collect()
    }

    fn evaluate_one(
        &self,
        candidate: &Candidate<'_>,
        req: &Requirements,
        tolerances: &Tolerances,
    ) -> Option<Solution> {
        match self.allocator.allocate(candidate, req, tolerances) {
            Ok(allocation) => Some(self.scorer.score(&allocation, req, tolerances)),
            Err(reason) => {
                debug!(lots = ?candidate.signature(), %reason, "组合不可行，丢弃");
                None
            }
        }
    }
}
