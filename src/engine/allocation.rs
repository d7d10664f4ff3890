// ==========================================
// 羽绒拼配优化系统 - 配比分配求解
// ==========================================
// 职责: 为固定的批次组合计算每批用量
// 约束: 合计 = 需求总量（误差 ≤ epsilon）；单批 ≤ 可用量 × 使用比例
// 算法:
// 1. 生成初始比例方案（接近目标的批次权重大 / 绒朵平衡迭代）
// 2. 按比例分配，超出可用量的批次封顶，差额按比例分给未封顶批次
//    （迭代至不动点，或达到迭代上限）
// 3. 删除用量低于最小用量的批次，差额补回其余批次
// 4. 多个方案取绒朵偏差最小者
// ==========================================

use crate::config::{SearchLimits, Tolerances};
use crate::domain::lot::LotRecord;
use crate::domain::requirements::Requirements;
use crate::domain::solution::{Allocation, Candidate};
use thiserror::Error;

/// 绒朵平衡迭代的收敛阈值（百分点）
const BALANCE_CONVERGENCE: f64 = 0.1;
/// 平衡迭代的放大/缩小系数
const BALANCE_STEP_UP: f64 = 1.1;
const BALANCE_STEP_DOWN: f64 = 0.9;

/// 分配失败（组合被丢弃，不对外报错）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationFailure {
    #[error("可用量不足: 可用 {available:.2}, 需求 {requested:.2}")]
    InsufficientQuantity { available: f64, requested: f64 },

    #[error("候选组合为空")]
    EmptyCandidate,

    #[error("没有正数量的分配")]
    NoPositiveAllocation,
}

// ==========================================
// AllocationSolver - 配比分配求解器
// ==========================================
pub struct AllocationSolver {
    max_iterations: usize,
    balance_iterations: usize,
    epsilon: f64,
    min_lot_usage: f64,
    max_usage_fraction: f64,
    similar_dc_spread: f64,
}

impl AllocationSolver {
    pub fn new(limits: &SearchLimits) -> Self {
        Self {
            max_iterations: limits.allocation_max_iterations,
            balance_iterations: limits.balance_iterations,
            epsilon: limits.epsilon,
            min_lot_usage: limits.min_lot_usage,
            max_usage_fraction: limits.max_lot_usage_fraction,
            similar_dc_spread: limits.similar_dc_spread,
        }
    }

    /// 单批次可用上限
    pub fn capacity_of(&self, lot: &LotRecord) -> f64 {
        if lot.has_stock() {
            lot.available_qty * self.max_usage_fraction
        } else {
            0.0
        }
    }

    /// 为组合计算分配
    ///
    /// # 返回
    /// - Ok(Allocation): 合计 = req.total_qty，且每批用量 ≥ 最小用量
    /// - Err(AllocationFailure): 组合不可行，调用方丢弃
    pub fn allocate<'a>(
        &self,
        candidate: &Candidate<'a>,
        req: &Requirements,
        tolerances: &Tolerances,
    ) -> Result<Allocation<'a>, AllocationFailure> {
        if candidate.is_empty() {
            return Err(AllocationFailure::EmptyCandidate);
        }

        let total = req.total_qty;
        let caps: Vec<f64> = candidate.lots.iter().map(|l| self.capacity_of(l)).collect();
        let available: f64 = caps.iter().sum();
        if available < total - self.epsilon {
            return Err(AllocationFailure::InsufficientQuantity {
                available,
                requested: total,
            });
        }

        let proposals = [
            self.weighted_proportions(&candidate.lots, req, tolerances),
            self.balanced_proportions(&candidate.lots, req.target_dc),
        ];

        let mut best: Option<(f64, Vec<f64>)> = None;
        for proportions in proposals.iter() {
            let quantities = self.reconcile(proportions, &caps, total);
            let deviation = dc_deviation(&candidate.lots, &quantities, req.target_dc);
            // 偏差相同时保留先出现的方案
            let better = match &best {
                Some((best_dev, _)) => deviation < *best_dev,
                None => true,
            };
            if better {
                best = Some((deviation, quantities));
            }
        }

        let Some((_, quantities)) = best else {
            return Err(AllocationFailure::NoPositiveAllocation);
        };
        self.finalize(&candidate.lots, quantities, &caps, total)
    }

    /// 初始方案 A: 权重 = 1 / (1 + d)，d 为各目标指标的归一化距离之和
    fn weighted_proportions(
        &self,
        lots: &[&LotRecord],
        req: &Requirements,
        tolerances: &Tolerances,
    ) -> Vec<f64> {
        let targets = req.targets();
        lots.iter()
            .map(|lot| {
                let distance: f64 = targets
                    .iter()
                    .filter_map(|(metric, target)| {
                        let tol = tolerances.for_metric(*metric)?;
                        lot.metric(*metric).map(|v| (v - target).abs() / tol)
                    })
                    .sum();
                1.0 / (1.0 + distance)
            })
            .collect()
    }

    /// 初始方案 B: 绒朵平衡迭代
    ///
    /// 绒朵极差很小时均分；否则从均分开始，偏高则放大低绒朵批次、
    /// 偏低则放大高绒朵批次，直至偏差 < 0.1 或达到迭代上限
    fn balanced_proportions(&self, lots: &[&LotRecord], target_dc: f64) -> Vec<f64> {
        let n = lots.len();
        let mut proportions = vec![1.0 / n as f64; n];

        let dcs: Vec<Option<f64>> = lots.iter().map(|l| l.down_cluster()).collect();
        let present: Vec<f64> = dcs.iter().flatten().copied().collect();
        let (Some(min), Some(max)) = (
            present.iter().copied().reduce(f64::min),
            present.iter().copied().reduce(f64::max),
        ) else {
            return proportions;
        };
        if max - min < self.similar_dc_spread {
            return proportions;
        }

        for _ in 0..self.balance_iterations {
            let (weighted, weight) = dcs
                .iter()
                .zip(&proportions)
                .filter_map(|(dc, p)| dc.map(|v| (v * p, *p)))
                .fold((0.0, 0.0), |(s, w), (x, p)| (s + x, w + p));
            if weight <= 0.0 {
                break;
            }
            let current = weighted / weight;
            if (current - target_dc).abs() < BALANCE_CONVERGENCE {
                break;
            }

            let too_high = current > target_dc;
            for (p, dc) in proportions.iter_mut().zip(&dcs) {
                let Some(dc) = dc else { continue };
                let wanted = if too_high { *dc < target_dc } else { *dc > target_dc };
                let unwanted = if too_high { *dc > target_dc } else { *dc < target_dc };
                if wanted {
                    *p *= BALANCE_STEP_UP;
                } else if unwanted {
                    *p *= BALANCE_STEP_DOWN;
                }
            }

            let sum: f64 = proportions.iter().sum();
            if sum > 0.0 {
                proportions.iter_mut().for_each(|p| *p /= sum);
            }
        }
        proportions
    }

    /// 按比例分配并封顶再分配，迭代至不动点
    fn reconcile(&self, weights: &[f64], caps: &[f64], total: f64) -> Vec<f64> {
        let n = weights.len();
        let mut quantities = vec![0.0; n];
        let mut capped = vec![false; n];

        for _ in 0..self.max_iterations {
            let fixed: f64 = (0..n).filter(|&i| capped[i]).map(|i| caps[i]).sum();
            let remaining = (total - fixed).max(0.0);
            let free_weight: f64 = (0..n).filter(|&i| !capped[i]).map(|i| weights[i]).sum();

            if free_weight <= 0.0 {
                break;
            }

            let free: Vec<usize> = (0..n).filter(|&i| !capped[i]).collect();
            let mut newly_capped = false;
            for i in free {
                let share = remaining * weights[i] / free_weight;
                if share > caps[i] {
                    capped[i] = true;
                    newly_capped = true;
                }
                quantities[i] = share.min(caps[i]);
            }
            for i in (0..n).filter(|&i| capped[i]) {
                quantities[i] = caps[i];
            }

            if !newly_capped {
                break;
            }
        }

        // 迭代上限内未收敛时，按权重顺序用剩余可用量补足
        let mut deficit = total - quantities.iter().sum::<f64>();
        if deficit > 0.0 {
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then(a.cmp(&b)));
            for i in order {
                if deficit <= 0.0 {
                    break;
                }
                let add = deficit.min(caps[i] - quantities[i]).max(0.0);
                quantities[i] += add;
                deficit -= add;
            }
        }
        quantities
    }

    /// 删除低于最小用量的批次，并把舍去的量补回仍有余量的批次
    ///
    /// 最小用量不超过需求总量，且不低于 epsilon
    fn finalize<'a>(
        &self,
        lots: &[&'a LotRecord],
        quantities: Vec<f64>,
        caps: &[f64],
        total: f64,
    ) -> Result<Allocation<'a>, AllocationFailure> {
        let floor = self.min_lot_usage.min(total).max(self.epsilon);
        let mut kept: Vec<(&'a LotRecord, f64, f64)> = lots
            .iter()
            .zip(quantities)
            .zip(caps)
            .filter(|((_, qty), _)| *qty >= floor)
            .map(|((lot, qty), cap)| (*lot, qty, *cap))
            .collect();

        if kept.is_empty() {
            return Err(AllocationFailure::NoPositiveAllocation);
        }

        let mut deficit = total - kept.iter().map(|(_, q, _)| q).sum::<f64>();
        if deficit > 0.0 {
            for (_, qty, cap) in kept.iter_mut() {
                let add = deficit.min(*cap - *qty).max(0.0);
                *qty += add;
                deficit -= add;
                if deficit <= 0.0 {
                    break;
                }
            }
        }

        let allocation = Allocation::new(kept.into_iter().map(|(l, q, _)| (l, q)).collect());
        if (allocation.total() - total).abs() > self.epsilon {
            return Err(AllocationFailure::InsufficientQuantity {
                available: allocation.total(),
                requested: total,
            });
        }
        Ok(allocation)
    }
}

impl Default for AllocationSolver {
    fn default() -> Self {
        Self::new(&SearchLimits::default())
    }
}

/// 绒朵加权平均与目标的偏差（分母 = 总用量）
fn dc_deviation(lots: &[&LotRecord], quantities: &[f64], target_dc: f64) -> f64 {
    let total: f64 = quantities.iter().sum();
    if total <= 0.0 {
        return f64::INFINITY;
    }
    let weighted: f64 = lots
        .iter()
        .zip(quantities)
        .filter_map(|(lot, q)| lot.down_cluster().map(|dc| dc * q))
        .sum();
    (weighted / total - target_dc).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lot::{LotBuilder, LotKey};

    fn lot(code: &str, dc: f64, available: f64) -> LotRecord {
        LotBuilder::new("3|POB", code)
            .down_cluster(dc)
            .available(available)
            .build()
    }

    fn solve<'a>(
        lots: &'a [LotRecord],
        req: &Requirements,
    ) -> Result<Allocation<'a>, AllocationFailure> {
        let candidate = Candidate::new(lots.iter().collect());
        AllocationSolver::default().allocate(&candidate, req, &Tolerances::default())
    }

    fn qty(allocation: &Allocation<'_>, code: &str) -> Option<f64> {
        allocation.quantity_of(&LotKey::new("3|POB", code))
    }

    #[test]
    fn test_sum_matches_requested_total() {
        let lots = vec![lot("A", 70.0, 1000.0), lot("B", 90.0, 1000.0)];
        let req = Requirements::new(80.0, 500.0);
        let allocation = solve(&lots, &req).unwrap();
        assert!((allocation.total() - 500.0).abs() <= 0.01);
        assert_eq!(allocation.len(), 2);
    }

    #[test]
    fn test_balancing_approaches_dc_target() {
        let lots = vec![lot("A", 70.0, 1000.0), lot("B", 86.0, 1000.0)];
        let req = Requirements::new(80.0, 600.0);
        let allocation = solve(&lots, &req).unwrap();
        let a = qty(&allocation, "A").unwrap();
        let b = qty(&allocation, "B").unwrap();
        let dc = (70.0 * a + 86.0 * b) / 600.0;
        assert!((dc - 80.0).abs() < 1.0, "dc = {}", dc);
    }

    #[test]
    fn test_capped_lot_shortfall_redistributed() {
        let lots = vec![lot("SMALL", 80.0, 100.0), lot("BIG", 80.0, 1000.0)];
        let req = Requirements::new(80.0, 500.0);
        let allocation = solve(&lots, &req).unwrap();
        assert!(qty(&allocation, "SMALL").unwrap() <= 100.0 + 1e-9);
        assert!((allocation.total() - 500.0).abs() <= 0.01);
    }

    #[test]
    fn test_exact_fit_uses_everything() {
        let lots = vec![lot("A", 78.0, 600.0), lot("B", 82.0, 400.0)];
        let req = Requirements::new(80.0, 1000.0);
        let allocation = solve(&lots, &req).unwrap();
        assert!((qty(&allocation, "A").unwrap() - 600.0).abs() < 0.01);
        assert!((qty(&allocation, "B").unwrap() - 400.0).abs() < 0.01);
    }

    #[test]
    fn test_insufficient_quantity() {
        let lots = vec![lot("A", 80.0, 50.0), lot("B", 80.0, 30.0)];
        let req = Requirements::new(80.0, 100.0);
        let err = solve(&lots, &req).unwrap_err();
        assert!(matches!(
            err,
            AllocationFailure::InsufficientQuantity { available, .. }
                if (available - 80.0).abs() < 1e-9
        ));
    }

    #[test]
    fn test_empty_candidate() {
        let req = Requirements::new(80.0, 100.0);
        let candidate = Candidate::new(Vec::new());
        let err = AllocationSolver::default()
            .allocate(&candidate, &req, &Tolerances::default())
            .unwrap_err();
        assert_eq!(err, AllocationFailure::EmptyCandidate);
    }

    #[test]
    fn test_usage_fraction_limits_each_lot() {
        let limits = SearchLimits {
            max_lot_usage_fraction: 0.5,
            ..SearchLimits::default()
        };
        let lots = vec![lot("A", 80.0, 100.0), lot("B", 80.0, 100.0)];
        let candidate = Candidate::new(lots.iter().collect());

        let req = Requirements::new(80.0, 100.0);
        let allocation = AllocationSolver::new(&limits)
            .allocate(&candidate, &req, &Tolerances::default())
            .unwrap();
        assert!(allocation.items.iter().all(|(_, q)| *q <= 50.0 + 1e-9));

        let req = Requirements::new(80.0, 150.0);
        assert!(AllocationSolver::new(&limits)
            .allocate(&candidate, &req, &Tolerances::default())
            .is_err());
    }

    #[test]
    fn test_close_lots_all_receive_quantity() {
        let lots = vec![
            lot("NEAR", 80.0, 1000.0),
            lot("NEAR2", 80.5, 1000.0),
            lot("FAR", 79.5, 1000.0),
        ];
        let req = Requirements::new(80.0, 300.0);
        let allocation = solve(&lots, &req).unwrap();
        assert!((allocation.total() - 300.0).abs() <= 0.01);
        assert!(allocation.items.iter().all(|(_, q)| *q > 0.0));
    }

    #[test]
    fn test_sliver_below_min_usage_moved_to_other_lots() {
        // 远离目标的批次只分到零头，低于最小用量后被删除
        let lots = vec![
            lot("MAIN", 80.0, 1000.0),
            lot("ALT", 80.2, 1000.0),
            lot("TAIL", 95.0, 1000.0),
        ];
        let req = Requirements::new(80.0, 40.0);
        let allocation = solve(&lots, &req).unwrap();

        assert!((allocation.total() - 40.0).abs() <= 0.01);
        assert_eq!(qty(&allocation, "TAIL"), None);
        assert!(allocation.items.iter().all(|(_, q)| *q >= 10.0));
    }

    #[test]
    fn test_min_usage_capped_by_total() {
        let lots = vec![lot("A", 80.0, 1000.0)];
        let req = Requirements::new(80.0, 4.0);
        let allocation = solve(&lots, &req).unwrap();
        assert!((qty(&allocation, "A").unwrap() - 4.0).abs() <= 0.01);
    }

    #[test]
    fn test_min_usage_drop_can_make_candidate_infeasible() {
        let limits = SearchLimits {
            min_lot_usage: 150.0,
            ..SearchLimits::default()
        };
        // 两批次都只能分到 ≤ 100
        let lots = vec![lot("A", 80.0, 100.0), lot("B", 80.0, 100.0)];
        let candidate = Candidate::new(lots.iter().collect());
        let req = Requirements::new(80.0, 200.0);

        let err = AllocationSolver::new(&limits)
            .allocate(&candidate, &req, &Tolerances::default())
            .unwrap_err();
        assert_eq!(err, AllocationFailure::NoPositiveAllocation);
    }
}
