// ==========================================
// 羽绒拼配优化系统 - 候选组合生成器
// ==========================================
// 职责: 在有序候选池上按多种策略生成批次组合
// 输入: 已准入且排序的候选批次
// 输出: 去重后的 Candidate 列表（未分配、未评分）
// 红线:
// - 组合内批次两两兼容，规模 ≤ max_lots
// - 总预算 max_combinations，各策略均分，未用完的额度顺延
// - 所有遍历按候选池顺序进行，平局以批次号决定
// ==========================================

use crate::config::{SearchLimits, Tolerances};
use crate::domain::lot::{LotKey, LotRecord};
use crate::domain::requirements::Requirements;
use crate::domain::solution::Candidate;
use crate::domain::types::QualityMetric;
use crate::engine::compatibility::CompatibilityRules;
use crate::engine::strategy::GenerationStrategy;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

// ==========================================
// GenerationOutcome - 生成结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome<'a> {
    pub candidates: Vec<Candidate<'a>>,
    /// 每个策略贡献的组合数
    pub per_strategy: Vec<(GenerationStrategy, usize)>,
    /// 提交过的组合数（含重复/不可行）
    pub explored: usize,
    /// 是否因预算耗尽而提前终止
    pub budget_exhausted: bool,
}

// ==========================================
// CandidateSink - 组合收集器（去重 + 可行性 + 预算）
// ==========================================
struct CandidateSink<'a, 'r> {
    rules: &'r CompatibilityRules,
    seen: HashSet<Vec<LotKey>>,
    candidates: Vec<Candidate<'a>>,
    total_qty: f64,
    epsilon: f64,
    usage_fraction: f64,
    max_lots: usize,
    quota: usize,
    accepted_in_round: usize,
    explored: usize,
}

impl<'a, 'r> CandidateSink<'a, 'r> {
    fn is_full(&self) -> bool {
        self.accepted_in_round >= self.quota
    }

    fn capacity(&self, lots: &[&LotRecord]) -> f64 {
        lots.iter()
            .filter(|l| l.has_stock())
            .map(|l| l.available_qty * self.usage_fraction)
            .sum()
    }

    fn feasible(&self, lots: &[&LotRecord]) -> bool {
        self.capacity(lots) >= self.total_qty - self.epsilon
    }

    /// 提交组合，接受时返回 true
    fn offer(&mut self, lots: &[&'a LotRecord]) -> bool {
        if self.is_full() || lots.is_empty() || lots.len() > self.max_lots {
            return false;
        }
        self.explored += 1;

        if !self.feasible(lots) {
            return false;
        }
        for (i, a) in lots.iter().enumerate() {
            if lots[i + 1..]
                .iter()
                .any(|b| std::ptr::eq(*a, *b) || !self.rules.compatible(a, b))
            {
                return false;
            }
        }

        let candidate = Candidate::new(lots.to_vec());
        if !self.seen.insert(candidate.signature()) {
            return false;
        }

        self.candidates.push(candidate);
        self.accepted_in_round += 1;
        true
    }

    fn start_round(&mut self, quota: usize) {
        self.quota = quota;
        self.accepted_in_round = 0;
    }
}

// ==========================================
// CombinationGenerator - 组合生成器
// ==========================================
pub struct CombinationGenerator {
    limits: SearchLimits,
    rules: CompatibilityRules,
}

impl CombinationGenerator {
    pub fn new(limits: &SearchLimits, rules: CompatibilityRules) -> Self {
        Self {
            limits: limits.clone(),
            rules,
        }
    }

    /// 依次运行各策略生成组合
    ///
    /// # 参数
    /// - pool: 已排序的候选批次（EligibilityFilter 输出）
    /// - req: 拼配需求
    /// - tolerances: 生效容差
    /// - strategies: 策略运行顺序
    #[instrument(skip_all, fields(pool = pool.len(), max_lots = req.max_lots))]
    pub fn generate<'a>(
        &self,
        pool: &[&'a LotRecord],
        req: &Requirements,
        tolerances: &Tolerances,
        strategies: &[GenerationStrategy],
    ) -> GenerationOutcome<'a> {
        let mut sink = CandidateSink {
            rules: &self.rules,
            seen: HashSet::new(),
            candidates: Vec::new(),
            total_qty: req.total_qty,
            epsilon: self.limits.epsilon,
            usage_fraction: self.limits.max_lot_usage_fraction,
            max_lots: req.max_lots,
            quota: 0,
            accepted_in_round: 0,
            explored: 0,
        };
        let mut per_strategy = Vec::with_capacity(strategies.len());

        for (index, strategy) in strategies.iter().enumerate() {
            let remaining_budget = self.limits.max_combinations - sink.candidates.len();
            let rounds_left = strategies.len() - index;
            // 向上取整: 预算少于策略数时靠前的策略优先获得额度
            sink.start_round(remaining_budget.div_ceil(rounds_left));

            let ctx = StrategyContext {
                pool,
                req,
                tolerances,
            };
            match strategy {
                GenerationStrategy::QualityFirst => self.quality_first(&ctx, &mut sink),
                GenerationStrategy::GreedyBest => self.greedy_best(&ctx, &mut sink),
                GenerationStrategy::TopPerformers => self.top_performers(&ctx, &mut sink),
                GenerationStrategy::Diversity => self.diversity(&ctx, &mut sink),
            }

            debug!(
                strategy = strategy.as_str(),
                accepted = sink.accepted_in_round,
                quota = sink.quota,
                "策略生成完成"
            );
            per_strategy.push((*strategy, sink.accepted_in_round));
        }

        let budget_exhausted = sink.candidates.len() >= self.limits.max_combinations;
        if budget_exhausted {
            warn!(
                max_combinations = self.limits.max_combinations,
                "组合预算已耗尽，搜索提前终止"
            );
        }

        GenerationOutcome {
            candidates: sink.candidates,
            per_strategy,
            explored: sink.explored,
            budget_exhausted,
        }
    }

    // ==========================================
    // 策略: 绒朵优先
    // ==========================================
    // 1) 单批次（按绒朵接近度）
    // 2) 跨目标配对: 低于目标 × 高于目标，按合计距离排序；
    //    可用量不足时按接近度继续补批次
    fn quality_first<'a>(&self, ctx: &StrategyContext<'a, '_>, sink: &mut CandidateSink<'a, '_>) {
        let target = ctx.req.target_dc;
        let mut near: Vec<&'a LotRecord> = ctx.pool.to_vec();
        near.sort_by(|a, b| {
            dc_distance(a, target)
                .total_cmp(&dc_distance(b, target))
                .then_with(|| a.lot_code.cmp(&b.lot_code))
        });
        near.truncate(self.limits.quality_first_pool);

        for lot in &near {
            if sink.is_full() {
                return;
            }
            sink.offer(&[*lot]);
        }

        let (below, above): (Vec<&'a LotRecord>, Vec<&'a LotRecord>) = near
            .iter()
            .copied()
            .partition(|l| l.down_cluster().map(|dc| dc < target).unwrap_or(false));

        let mut pairs: Vec<(f64, &'a LotRecord, &'a LotRecord)> = Vec::new();
        for lo in &below {
            for hi in &above {
                if self.rules.compatible(lo, hi) {
                    pairs.push((dc_distance(lo, target) + dc_distance(hi, target), *lo, *hi));
                }
            }
        }
        pairs.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.lot_code.cmp(&b.1.lot_code))
                .then_with(|| a.2.lot_code.cmp(&b.2.lot_code))
        });

        for (_, lo, hi) in pairs {
            if sink.is_full() {
                return;
            }
            let mut lots = vec![lo, hi];
            for extra in &near {
                if sink.feasible(&lots) || lots.len() >= ctx.req.max_lots {
                    break;
                }
                if !lots.iter().any(|l| std::ptr::eq(*l, *extra))
                    && self.rules.compatible_with_all(extra, &lots)
                {
                    lots.push(*extra);
                }
            }
            sink.offer(&lots);
        }
    }

    // ==========================================
    // 策略: 贪心逼近
    // ==========================================
    // 从前 greedy_starts 个批次出发，每步加入使画像偏差下降最多的批次；
    // 可行的前缀都提交，偏差进入容差后停止
    fn greedy_best<'a>(&self, ctx: &StrategyContext<'a, '_>, sink: &mut CandidateSink<'a, '_>) {
        let targets = ctx.req.targets();
        let expansion: Vec<&'a LotRecord> =
            ctx.pool.iter().copied().take(self.limits.greedy_pool).collect();

        for start in ctx.pool.iter().take(self.limits.greedy_starts) {
            if sink.is_full() {
                return;
            }
            let mut current: Vec<&'a LotRecord> = vec![*start];

            loop {
                let deviation = profile_deviation(&current, &targets, ctx.tolerances);
                if sink.feasible(&current) {
                    sink.offer(&current);
                    if deviation <= 1.0 {
                        break;
                    }
                }
                if current.len() >= ctx.req.max_lots || sink.is_full() {
                    break;
                }

                let mut best: Option<(f64, &'a LotRecord)> = None;
                for lot in &expansion {
                    if current.iter().any(|l| std::ptr::eq(*l, *lot))
                        || !self.rules.compatible_with_all(lot, &current)
                    {
                        continue;
                    }
                    current.push(*lot);
                    let trial = profile_deviation(&current, &targets, ctx.tolerances);
                    current.pop();
                    // 偏差相同时保留池中靠前者
                    if best.map(|(d, _)| trial < d).unwrap_or(true) {
                        best = Some((trial, *lot));
                    }
                }

                match best {
                    Some((_, lot)) => current.push(lot),
                    None => break,
                }
            }
        }
    }

    // ==========================================
    // 策略: 优选池枚举
    // ==========================================
    // 取综合画像最接近目标的 K 个批次，按规模从小到大枚举两两兼容的子集
    fn top_performers<'a>(&self, ctx: &StrategyContext<'a, '_>, sink: &mut CandidateSink<'a, '_>) {
        let targets = ctx.req.targets();
        let mut top: Vec<&'a LotRecord> = ctx.pool.to_vec();
        // 稳定排序: 画像相同的批次保持候选池顺序
        top.sort_by(|a, b| {
            profile_deviation(&[*a], &targets, ctx.tolerances)
                .total_cmp(&profile_deviation(&[*b], &targets, ctx.tolerances))
        });
        top.truncate(self.limits.top_performers_pool);

        let max_size = ctx.req.max_lots.min(top.len());
        for size in 1..=max_size {
            let mut stack = Vec::with_capacity(size);
            self.enumerate(&top, 0, size, &mut stack, sink);
            if sink.is_full() {
                return;
            }
        }
    }

    fn enumerate<'a>(
        &self,
        pool: &[&'a LotRecord],
        from: usize,
        size: usize,
        stack: &mut Vec<&'a LotRecord>,
        sink: &mut CandidateSink<'a, '_>,
    ) {
        if sink.is_full() {
            return;
        }
        if stack.len() == size {
            sink.offer(stack);
            return;
        }
        let needed = size - stack.len();
        for i in from..pool.len() {
            if pool.len() - i < needed {
                break;
            }
            let lot = pool[i];
            if !self.rules.compatible_with_all(lot, stack) {
                continue;
            }
            stack.push(lot);
            self.enumerate(pool, i + 1, size, stack, sink);
            stack.pop();
            if sink.is_full() {
                return;
            }
        }
    }

    // ==========================================
    // 策略: 多来源轮转
    // ==========================================
    // 按物料编码分组（组顺序 = 首次出现顺序），每轮从不同起始组
    // 轮流取批次，避免单一来源的组合
    fn diversity<'a>(&self, ctx: &StrategyContext<'a, '_>, sink: &mut CandidateSink<'a, '_>) {
        let mut groups: Vec<(&str, Vec<&'a LotRecord>)> = Vec::new();
        for lot in ctx.pool {
            match groups.iter_mut().find(|(key, _)| *key == lot.article_code) {
                Some((_, members)) => members.push(*lot),
                None => groups.push((lot.article_code.as_str(), vec![*lot])),
            }
        }
        if groups.is_empty() {
            return;
        }
        let group_count = groups.len();

        for rotation in 0..self.limits.diversity_rotations {
            if sink.is_full() {
                return;
            }
            let depth = rotation / group_count;
            let mut lots: Vec<&'a LotRecord> = Vec::new();

            // 每组至多取一个批次，循环直至可行且跨组，或达到规模上限
            for step in 0..group_count * ctx.req.max_lots {
                if lots.len() >= ctx.req.max_lots
                    || (lots.len() >= 2 && sink.feasible(&lots))
                {
                    break;
                }
                let (_, members) = &groups[(rotation + step) % group_count];
                let pick = members[(depth + step / group_count) % members.len()];
                if !lots.iter().any(|l| std::ptr::eq(*l, pick))
                    && self.rules.compatible_with_all(pick, &lots)
                {
                    lots.push(pick);
                }
            }
            if !lots.is_empty() {
                sink.offer(&lots);
            }
        }
    }
}

impl Default for CombinationGenerator {
    fn default() -> Self {
        Self::new(&SearchLimits::default(), CompatibilityRules::default())
    }
}

struct StrategyContext<'a, 'q> {
    pool: &'q [&'a LotRecord],
    req: &'q Requirements,
    tolerances: &'q Tolerances,
}

fn dc_distance(lot: &LotRecord, target: f64) -> f64 {
    lot.down_cluster()
        .map(|dc| (dc - target).abs())
        .unwrap_or(f64::INFINITY)
}

/// 组合画像偏差: 各目标指标（批次简单平均）与目标的距离 / 容差，取最大值
///
/// 返回值 ≤ 1 表示所有目标指标的画像都落在容差内
fn profile_deviation(
    lots: &[&LotRecord],
    targets: &[(QualityMetric, f64)],
    tolerances: &Tolerances,
) -> f64 {
    targets
        .iter()
        .filter_map(|(metric, target)| {
            let tol = tolerances.for_metric(*metric)?;
            let values: Vec<f64> = lots.iter().filter_map(|l| l.metric(*metric)).collect();
            if values.is_empty() {
                return None;
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Some((mean - target).abs() / tol)
        })
        .fold(0.0, f64::max)
}
