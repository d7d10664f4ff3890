// ==========================================
// 羽绒拼配优化系统 - 方案筛选器
// ==========================================
// 职责: 排序 + 近似方案去重 + 取前 N
// 排序: 评分降序 → 总成本升序 → 批次数升序 → 批次标识字典序
// 去重: 与已入选（评分更高）方案的用量加权重叠度 > 阈值则丢弃
// ==========================================

use crate::config::SearchLimits;
use crate::domain::solution::Solution;
use std::cmp::Ordering;
use tracing::debug;

pub struct SolutionSelector {
    similarity_threshold: f64,
}

impl SolutionSelector {
    pub fn new(limits: &SearchLimits) -> Self {
        Self {
            similarity_threshold: limits.similarity_threshold,
        }
    }

    /// 用量加权的批次重叠度 ∈ [0, 1]
    ///
    /// = Σ 共同批次的 min(占比 a, 占比 b)
    pub fn similarity(a: &Solution, b: &Solution) -> f64 {
        if a.total_qty <= 0.0 || b.total_qty <= 0.0 {
            return 0.0;
        }
        a.lots
            .iter()
            .filter_map(|la| {
                b.quantity_of(&la.lot.key()).map(|qb| {
                    let share_a = la.quantity / a.total_qty;
                    let share_b = qb / b.total_qty;
                    share_a.min(share_b)
                })
            })
            .sum()
    }

    /// 确定性排序
    pub fn compare(a: &Solution, b: &Solution) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.total_cost.total_cmp(&b.total_cost))
            .then_with(|| a.lot_count().cmp(&b.lot_count()))
            .then_with(|| a.lot_keys().cmp(&b.lot_keys()))
    }

    /// 选出前 num_solutions 个互不相似的方案
    pub fn select(&self, mut solutions: Vec<Solution>, num_solutions: usize) -> Vec<Solution> {
        let total = solutions.len();
        solutions.sort_by(Self::compare);

        let mut selected: Vec<Solution> = Vec::with_capacity(num_solutions);
        for solution in solutions {
            if selected.len() >= num_solutions {
                break;
            }
            let too_similar = selected
                .iter()
                .any(|kept| Self::similarity(kept, &solution) > self.similarity_threshold);
            if !too_similar {
                selected.push(solution);
            }
        }

        debug!(
            scored = total,
            selected = selected.len(),
            threshold = self.similarity_threshold,
            "方案筛选完成"
        );
        selected
    }
}

impl Default for SolutionSelector {
    fn default() -> Self {
        Self::new(&SearchLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lot::{LotBuilder, LotRecord};
    use crate::domain::solution::{AllocatedLot, ComplianceFlags, ScoreBreakdown};

    fn lot(code: &str) -> LotRecord {
        LotBuilder::new("3|POB", code)
            .down_cluster(80.0)
            .available(1000.0)
            .build()
    }

    fn codes(selected: &[Solution]) -> Vec<Vec<String>> {
        selected
            .iter()
            .map(|s| s.lot_keys().into_iter().map(|k| k.lot_code).collect())
            .collect()
    }

    fn solution(parts: &[(&str, f64)], score: f64, total_cost: f64) -> Solution {
        let total: f64 = parts.iter().map(|(_, q)| q).sum();
        Solution {
            lots: parts
                .iter()
                .map(|(code, qty)| AllocatedLot {
                    lot: lot(code),
                    quantity: *qty,
                    share_pct: qty / total * 100.0,
                    cost: None,
                })
                .collect(),
            total_qty: total,
            metrics: Vec::new(),
            compliance: ComplianceFlags {
                down_cluster: true,
                fill_power: true,
                duck: true,
                other_elements: true,
            },
            tier_penalty: 0.0,
            total_cost,
            cost_per_unit: total_cost / total,
            score,
            breakdown: ScoreBreakdown::default(),
        }
    }

    #[test]
    fn test_similarity() {
        let a = solution(&[("A", 500.0), ("B", 500.0)], 1.0, 0.0);
        let b = solution(&[("A", 900.0), ("C", 100.0)], 1.0, 0.0);
        assert!((SolutionSelector::similarity(&a, &b) - 0.5).abs() < 1e-9);
        assert!((SolutionSelector::similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_lot_code_under_other_article_is_distinct() {
        let mut pw = solution(&[("L1", 1000.0)], 2.0, 0.0);
        pw.lots[0].lot.article_code = "3|PONPW".to_string();
        let white = solution(&[("L1", 1000.0)], 1.0, 0.0);

        assert_eq!(SolutionSelector::similarity(&pw, &white), 0.0);
        assert_eq!(SolutionSelector::default().select(vec![pw, white], 3).len(), 2);
    }

    #[test]
    fn test_near_duplicates_dropped() {
        let best = solution(&[("A", 500.0), ("B", 500.0)], 900.0, 0.0);
        let near = solution(&[("A", 450.0), ("B", 450.0), ("C", 100.0)], 850.0, 0.0);
        let distinct = solution(&[("D", 500.0), ("E", 500.0)], 800.0, 0.0);

        let selected = SolutionSelector::default().select(vec![near, distinct, best], 3);
        assert_eq!(codes(&selected), vec![vec!["A", "B"], vec!["D", "E"]]);
    }

    #[test]
    fn test_ties_broken_by_cost_then_lot_count() {
        let pricey = solution(&[("A", 1000.0)], 500.0, 20_000.0);
        let cheap_many = solution(&[("B", 500.0), ("C", 500.0)], 500.0, 10_000.0);
        let cheap_few = solution(&[("D", 1000.0)], 500.0, 10_000.0);

        let selected = SolutionSelector::default().select(vec![pricey, cheap_many, cheap_few], 3);
        assert_eq!(codes(&selected), vec![vec!["D"], vec!["B", "C"], vec!["A"]]);
    }

    #[test]
    fn test_limit_respected() {
        let solutions = (0..5)
            .map(|i| solution(&[(format!("L{}", i).as_str(), 100.0)], i as f64, 0.0))
            .collect();
        let selected = SolutionSelector::default().select(solutions, 2);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].score, 4.0);
    }
}
