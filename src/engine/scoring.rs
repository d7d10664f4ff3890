// ==========================================
// 羽绒拼配优化系统 - 方案评分引擎
// ==========================================
// 职责: Allocation → Solution（加权平均/偏差/合规/成本/评分）
// 红线: 同一输入重复评分结果完全一致（纯函数）
// ==========================================
// 加权平均: Σ(metric_i × qty_i) / Σ(qty_i)
//   缺失值不进分子，但分母始终为总用量
//   全部缺失 → None，偏差 0，视为合规
// 评分组成（见 ScoreBreakdown）:
//   目标匹配 + 颜色降级 + 成本 + 处置 + 批次数 + 物种配合 + 估算数据 + 绒朵超标
// ==========================================

use crate::config::{ScoringWeights, Tolerances};
use crate::domain::lot::LotRecord;
use crate::domain::requirements::Requirements;
use crate::domain::solution::{
    AllocatedLot, Allocation, ComplianceFlags, MetricSummary, ScoreBreakdown, Solution,
};
use crate::domain::types::{QualityMetric, Species};
use crate::engine::compatibility::CompatibilityRules;

/// 浮点比较余量
const COMPLIANCE_SLACK: f64 = 1e-9;

// ==========================================
// ScoringEngine - 评分引擎
// ==========================================
pub struct ScoringEngine {
    weights: ScoringWeights,
    rules: CompatibilityRules,
}

impl ScoringEngine {
    pub fn new(weights: &ScoringWeights) -> Self {
        Self {
            weights: weights.clone(),
            rules: CompatibilityRules::new(weights),
        }
    }

    /// 评分: 把分配结果转换为自包含的方案
    pub fn score(
        &self,
        allocation: &Allocation<'_>,
        req: &Requirements,
        tolerances: &Tolerances,
    ) -> Solution {
        let total = allocation.total();

        // === 步骤 1: 指标加权平均与偏差 ===
        let metrics: Vec<MetricSummary> = QualityMetric::ALL
            .iter()
            .map(|&metric| {
                let average = weighted_average(allocation, metric);
                let target = req.target(metric);
                let deviation = match (average, target) {
                    (Some(avg), Some(t)) => (avg - t).abs(),
                    _ => 0.0,
                };
                MetricSummary {
                    metric,
                    average,
                    target,
                    deviation,
                }
            })
            .collect();
        let summary = |metric: QualityMetric| metrics.iter().find(|m| m.metric == metric);
        let avg_of = |metric: QualityMetric| summary(metric).and_then(|m| m.average);
        let dev_of = |metric: QualityMetric| summary(metric).map(|m| m.deviation).unwrap_or(0.0);

        // === 步骤 2: 合规标记 ===
        let oe_average = avg_of(QualityMetric::OtherElements);
        let compliance = ComplianceFlags {
            down_cluster: dev_of(QualityMetric::DownCluster) <= tolerances.dc + COMPLIANCE_SLACK,
            fill_power: dev_of(QualityMetric::FillPower) <= tolerances.fp + COMPLIANCE_SLACK,
            duck: dev_of(QualityMetric::Duck) <= tolerances.duck + COMPLIANCE_SLACK,
            other_elements: match (oe_average, req.max_other_elements) {
                (Some(avg), Some(max)) => avg <= max + COMPLIANCE_SLACK,
                _ => true,
            },
        };

        // === 步骤 3: 颜色降级惩罚 ===
        let tier_penalty = self.tier_penalty(allocation, req, total);

        // === 步骤 4: 成本 ===
        // 单位成本只按有价批次的用量折算，未定价批次不拉低单价
        let (total_cost, priced_qty) = allocation
            .items
            .iter()
            .filter_map(|(lot, qty)| lot.cost_per_unit.map(|c| (c * qty, *qty)))
            .fold((0.0, 0.0), |(cost, q), (c, qty)| (cost + c, q + qty));
        let cost_per_unit = if priced_qty > 0.0 { total_cost / priced_qty } else { 0.0 };

        // === 步骤 5: 评分 ===
        let w = &self.weights;
        let mut breakdown = ScoreBreakdown::default();

        if avg_of(QualityMetric::DownCluster).is_some() {
            breakdown.dc_match =
                match_score(dev_of(QualityMetric::DownCluster), tolerances.dc, w.dc_match);
        }
        if req.target_fp.is_some() && avg_of(QualityMetric::FillPower).is_some() {
            breakdown.fp_match =
                match_score(dev_of(QualityMetric::FillPower), tolerances.fp, w.fp_match);
        }
        if let (Some(target), Some(actual)) = (req.target_duck, avg_of(QualityMetric::Duck)) {
            breakdown.duck_match = self.duck_content_score(actual, target, tolerances.duck);
        }
        if let (Some(max), Some(avg)) = (req.max_other_elements, oe_average) {
            if avg > max {
                breakdown.oe_excess = -w.oe_excess * (avg - max) / tolerances.oe;
            }
        }
        if req.effective_color().is_some() {
            breakdown.tier = if tier_penalty > 0.0 {
                -tier_penalty
            } else {
                w.tier_compliance_bonus
            };
        }
        breakdown.cost_efficiency = -w.cost_efficiency * cost_per_unit;
        breakdown.disposal = shared_sum(allocation, total, |lot| lot.disposal_score()) * w.disposal;
        breakdown.lot_count = self.lot_count_score(allocation.len());
        breakdown.species_mix = self.species_mix_score(allocation, req, total);
        breakdown.estimated_data = -w.estimated_data
            * shared_sum(allocation, total, |lot| {
                let mut flags = 0.0;
                if lot.dc_estimated {
                    flags += 1.0;
                }
                if req.target_fp.is_some() && lot.fp_estimated {
                    flags += 1.0;
                }
                flags
            });
        breakdown.dc_overqualification = shared_sum(allocation, total, |lot| {
            match lot.down_cluster() {
                Some(dc) if dc - req.target_dc > w.dc_overqualification_threshold => {
                    -(dc - req.target_dc).powi(2) * w.dc_overqualification_weight
                }
                _ => 0.0,
            }
        });

        let lots = allocation
            .items
            .iter()
            .map(|(lot, qty)| AllocatedLot {
                lot: (*lot).clone(),
                quantity: *qty,
                share_pct: if total > 0.0 { qty / total * 100.0 } else { 0.0 },
                cost: lot.cost_per_unit.map(|c| c * qty),
            })
            .collect();

        Solution {
            lots,
            total_qty: total,
            metrics,
            compliance,
            tier_penalty,
            total_cost,
            cost_per_unit,
            score: breakdown.total(),
            breakdown,
        }
    }

    /// 颜色降级惩罚: Σ 每级惩罚 × 等级差 × 用量占比
    fn tier_penalty(&self, allocation: &Allocation<'_>, req: &Requirements, total: f64) -> f64 {
        let Some(requested) = req.effective_color() else {
            return 0.0;
        };
        shared_sum(allocation, total, |lot| {
            lot.color
                .map(|tier| self.rules.tier_penalty(requested, tier))
                .unwrap_or(0.0)
        })
    }

    /// 鸭绒匹配（非对称）
    ///
    /// 低于目标 - 容差: 重罚（按相对缺口）
    /// 高于目标 + 容差: 轻罚（按相对超出）
    /// 容差内: 按 (1 - dev/tol) 加分
    pub fn duck_content_score(&self, actual: f64, target: f64, tolerance: f64) -> f64 {
        let w = &self.weights;
        // 目标为 0 时按容差归一化
        let scale = if target > 0.0 { target } else { tolerance };
        if actual < target - tolerance {
            -w.duck_below_target * (target - actual) / scale
        } else if actual > target + tolerance {
            -w.duck_above_target * (actual - target) / scale
        } else {
            w.duck_match * (1.0 - (actual - target).abs() / tolerance)
        }
    }

    /// 批次数惩罚: 理想数以内为 0，此后逐个递增
    pub fn lot_count_score(&self, lot_count: usize) -> f64 {
        let w = &self.weights;
        ((w.ideal_lots + 1)..=lot_count)
            .map(|n| match n {
                n if n <= 7 => -w.lot_penalty_light,
                n if n <= 9 => -w.lot_penalty_medium,
                _ => -w.lot_penalty_heavy,
            })
            .sum()
    }

    /// 物种配合: 鹅绒需求带鸭绒目标时，混合批次加分、纯鸭批次扣分
    fn species_mix_score(
        &self,
        allocation: &Allocation<'_>,
        req: &Requirements,
        total: f64,
    ) -> f64 {
        let goose_with_duck_target = req.effective_species() == Some(Species::Goose)
            && req.target_duck.map(|t| t > 0.0).unwrap_or(false);
        if !goose_with_duck_target {
            return 0.0;
        }
        let w = &self.weights;
        shared_sum(allocation, total, |lot| match lot.species {
            Some(Species::Mixed) => w.species_mix_bonus,
            Some(Species::Duck) => -w.species_mismatch * 0.5,
            _ => 0.0,
        })
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(&ScoringWeights::default())
    }
}

/// 加权平均（缺失值不进分子，分母为总用量；全部缺失为 None）
pub fn weighted_average(allocation: &Allocation<'_>, metric: QualityMetric) -> Option<f64> {
    let total = allocation.total();
    if total <= 0.0 {
        return None;
    }
    let mut present = false;
    let mut weighted = 0.0;
    for (lot, qty) in &allocation.items {
        if let Some(value) = lot.metric(metric) {
            present = true;
            weighted += value * qty;
        }
    }
    present.then(|| weighted / total)
}

/// 目标匹配: 容差内按比例加分，容差外按超出比例扣分
fn match_score(deviation: f64, tolerance: f64, weight: f64) -> f64 {
    if deviation <= tolerance {
        weight * (1.0 - deviation / tolerance)
    } else {
        -weight * (deviation - tolerance) / tolerance
    }
}

/// 按用量占比加权求和
fn shared_sum<F>(allocation: &Allocation<'_>, total: f64, f: F) -> f64
where
    F: Fn(&LotRecord) -> f64,
{
    if total <= 0.0 {
        return 0.0;
    }
    allocation
        .items
        .iter()
        .map(|(lot, qty)| f(*lot) * qty / total)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lot::LotBuilder;
    use crate::domain::types::ColorTier;

    fn oe_lot(code: &str, oe: Option<f64>) -> LotRecord {
        let builder = LotBuilder::new("3|POB", code).down_cluster(80.0).available(5000.0);
        match oe {
            Some(v) => builder.other_elements(v).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn test_weighted_average_by_quantity() {
        let a = oe_lot("A", Some(2.5));
        let b = oe_lot("B", Some(1.5));
        let allocation = Allocation::new(vec![(&a, 600.0), (&b, 1400.0)]);
        let avg = weighted_average(&allocation, QualityMetric::OtherElements).unwrap();
        assert!((avg - 1.80).abs() < 1e-9);
    }

    #[test]
    fn test_missing_value_keeps_full_denominator() {
        let a = oe_lot("A", None);
        let b = oe_lot("B", Some(2.0));
        let allocation = Allocation::new(vec![(&a, 1000.0), (&b, 1000.0)]);
        let avg = weighted_average(&allocation, QualityMetric::OtherElements).unwrap();
        assert!((avg - 1.00).abs() < 1e-9);
    }

    #[test]
    fn test_metric_absent_everywhere_is_compliant() {
        let a = oe_lot("A", None);
        let b = oe_lot("B", None);
        let allocation = Allocation::new(vec![(&a, 500.0), (&b, 500.0)]);
        let mut req = Requirements::new(80.0, 1000.0);
        req.max_other_elements = Some(1.0);
        req.target_fp = Some(700.0);

        let solution = ScoringEngine::default().score(&allocation, &req, &Tolerances::default());
        assert_eq!(solution.average(QualityMetric::OtherElements), None);
        assert_eq!(solution.deviation(QualityMetric::FillPower), 0.0);
        assert!(solution.compliance.other_elements);
        assert!(solution.compliance.fill_power);
        assert_eq!(solution.breakdown.fp_match, 0.0);
        assert_eq!(solution.breakdown.oe_excess, 0.0);
    }

    #[test]
    fn test_compliance_flags() {
        let a = LotBuilder::new("3|POB", "A").down_cluster(85.0).other_elements(3.0).build();
        let allocation = Allocation::new(vec![(&a, 100.0)]);
        let mut req = Requirements::new(80.0, 100.0);
        req.max_other_elements = Some(2.0);

        let solution = ScoringEngine::default().score(&allocation, &req, &Tolerances::default());
        assert!(!solution.compliance.down_cluster);
        assert!(!solution.compliance.other_elements);
        assert_eq!(
            solution.compliance.failures(),
            vec![QualityMetric::DownCluster, QualityMetric::OtherElements]
        );
        assert!(solution.breakdown.dc_match < 0.0);
        assert!(solution.breakdown.oe_excess < 0.0);
    }

    #[test]
    fn test_rescoring_is_idempotent() {
        let a = oe_lot("A", Some(1.2));
        let b = LotBuilder::new("3|POAB", "B").down_cluster(78.0).duck(30.0).cost(25.0).build();
        let allocation = Allocation::new(vec![(&a, 300.0), (&b, 700.0)]);
        let mut req = Requirements::new(80.0, 1000.0);
        req.target_duck = Some(20.0);
        req.color = Some(ColorTier::PureWhite);

        let engine = ScoringEngine::default();
        let first = engine.score(&allocation, &req, &Tolerances::default());
        let second = engine.score(&allocation, &req, &Tolerances::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_tier_penalty_weighted_by_share() {
        let pw = LotBuilder::new("3|POPW", "PW").down_cluster(80.0).build();
        let b = LotBuilder::new("3|POB", "B").down_cluster(80.0).build();
        let allocation = Allocation::new(vec![(&pw, 500.0), (&b, 500.0)]);
        let mut req = Requirements::new(80.0, 1000.0);
        req.color = Some(ColorTier::PureWhite);

        let solution = ScoringEngine::default().score(&allocation, &req, &Tolerances::default());
        // 白(3) 替代纯白(1): 2 级 × 150 × 0.5
        assert!((solution.tier_penalty - 150.0).abs() < 1e-9);
        assert!((solution.breakdown.tier + 150.0).abs() < 1e-9);

        let only_pw = Allocation::new(vec![(&pw, 1000.0)]);
        let solution = ScoringEngine::default().score(&only_pw, &req, &Tolerances::default());
        assert_eq!(solution.tier_penalty, 0.0);
        assert_eq!(solution.breakdown.tier, 100.0);
    }

    #[test]
    fn test_cost_totals() {
        let a = LotBuilder::new("3|POB", "A").down_cluster(80.0).cost(20.0).build();
        let b = LotBuilder::new("3|POB", "B").down_cluster(80.0).cost(30.0).build();
        let allocation = Allocation::new(vec![(&a, 100.0), (&b, 300.0)]);
        let solution = ScoringEngine::default().score(
            &allocation,
            &Requirements::new(80.0, 400.0),
            &Tolerances::default(),
        );
        assert!((solution.total_cost - 11_000.0).abs() < 1e-9);
        assert!((solution.cost_per_unit - 27.5).abs() < 1e-9);
        assert!((solution.breakdown.cost_efficiency + 275.0).abs() < 1e-9);
        assert_eq!(solution.lots[1].cost, Some(9000.0));
        assert!((solution.lots[1].share_pct - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_unpriced_lot_does_not_dilute_unit_cost() {
        let a = LotBuilder::new("3|POB", "A").down_cluster(80.0).cost(40.0).build();
        let free = LotBuilder::new("3|POB", "FREE").down_cluster(80.0).build();
        let allocation = Allocation::new(vec![(&a, 250.0), (&free, 750.0)]);
        let solution = ScoringEngine::default().score(
            &allocation,
            &Requirements::new(80.0, 1000.0),
            &Tolerances::default(),
        );
        assert!((solution.total_cost - 10_000.0).abs() < 1e-9);
        assert!((solution.cost_per_unit - 40.0).abs() < 1e-9);
        assert_eq!(solution.lots[1].cost, None);

        let nothing_priced = Allocation::new(vec![(&free, 1000.0)]);
        let solution = ScoringEngine::default().score(
            &nothing_priced,
            &Requirements::new(80.0, 1000.0),
            &Tolerances::default(),
        );
        assert_eq!(solution.total_cost, 0.0);
        assert_eq!(solution.cost_per_unit, 0.0);
        assert_eq!(solution.breakdown.cost_efficiency, 0.0);
    }

    #[test]
    fn test_duck_score_is_asymmetric() {
        let engine = ScoringEngine::default();
        assert_eq!(engine.duck_content_score(20.0, 20.0, 5.0), 600.0);
        let below = engine.duck_content_score(10.0, 20.0, 5.0);
        let above = engine.duck_content_score(30.0, 20.0, 5.0);
        assert_eq!(below, -250.0);
        assert_eq!(above, -100.0);
    }

    #[test]
    fn test_lot_count_penalty_progressive() {
        let engine = ScoringEngine::default();
        assert_eq!(engine.lot_count_score(5), 0.0);
        assert_eq!(engine.lot_count_score(7), -50.0);
        assert_eq!(engine.lot_count_score(9), -150.0);
        assert_eq!(engine.lot_count_score(11), -350.0);
    }

    #[test]
    fn test_estimated_and_overqualified_lots_penalised() {
        let est = LotBuilder::new("3|POB", "E").down_cluster(92.0).estimated().build();
        let allocation = Allocation::new(vec![(&est, 100.0)]);
        let solution = ScoringEngine::default().score(
            &allocation,
            &Requirements::new(80.0, 100.0),
            &Tolerances::default(),
        );
        assert_eq!(solution.breakdown.estimated_data, -100.0);
        assert_eq!(solution.breakdown.dc_overqualification, -144.0);
    }

    #[test]
    fn test_species_mix_for_goose_blend() {
        let mixed = LotBuilder::new("3|POAB", "M").down_cluster(80.0).duck(30.0).build();
        let duck = LotBuilder::new("3|PAB", "D").down_cluster(80.0).duck(100.0).build();
        let allocation = Allocation::new(vec![(&mixed, 500.0), (&duck, 500.0)]);
        let mut req = Requirements::new(80.0, 1000.0);
        req.species = Some(Species::Goose);
        req.target_duck = Some(20.0);

        let solution = ScoringEngine::default().score(&allocation, &req, &Tolerances::default());
        assert!((solution.breakdown.species_mix - (25.0 - 37.5)).abs() < 1e-9);
    }
}
