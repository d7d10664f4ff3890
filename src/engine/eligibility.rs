// ==========================================
// 羽绒拼配优化系统 - 候选准入引擎
// ==========================================
// 职责: 按需求过滤库存批次 + 候选排序
// 输入: 库存快照 + Requirements
// 输出: 有序候选池 + 被排除批次及原因
// 红线: 所有排除必须给出 reason
// ==========================================
// 排序（保值优先）:
// 1. 鸭绒保值惩罚（升序）
// 2. 绒朵超标惩罚 max(0, dc - target)^1.5（升序）
// 3. 处置评分（降序，优先消化低品质批次）
// 4. 单价（升序，缺失排最后）
// 5. 批次号、物料编码（升序，保证确定性）
// ==========================================

use crate::config::SearchLimits;
use crate::domain::lot::LotRecord;
use crate::domain::requirements::Requirements;
use crate::engine::compatibility::CompatibilityRules;
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// 缺失值在排序中的占位
const MISSING_SORT_KEY: f64 = 999.0;

// ==========================================
// EligibilityOutcome - 准入结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct EligibilityOutcome<'a> {
    /// 已排序的候选批次
    pub candidates: Vec<&'a LotRecord>,
    /// 被排除的批次及原因
    pub excluded: Vec<(&'a LotRecord, String)>,
    /// 仅因估算数据被排除的批次数
    pub estimated_excluded: usize,
}

// ==========================================
// EligibilityFilter - 候选准入
// ==========================================
pub struct EligibilityFilter {
    initial_dc_range: f64,
    min_lot_usage: f64,
}

impl EligibilityFilter {
    pub fn new(limits: &SearchLimits) -> Self {
        Self {
            initial_dc_range: limits.initial_dc_range,
            min_lot_usage: limits.min_lot_usage,
        }
    }

    /// 过滤并排序候选批次
    ///
    /// # 参数
    /// - inventory: 库存快照
    /// - req: 拼配需求
    /// - allow_estimated: 是否接受估算数据（级联搜索时可临时放开）
    #[instrument(skip(self, inventory, req), fields(inventory = inventory.len()))]
    pub fn filter<'a>(
        &self,
        inventory: &'a [LotRecord],
        req: &Requirements,
        allow_estimated: bool,
    ) -> EligibilityOutcome<'a> {
        let mut outcome = EligibilityOutcome::default();

        for lot in inventory {
            match self.check(lot, req) {
                Ok(()) if lot.is_estimated() && !allow_estimated => {
                    outcome.estimated_excluded += 1;
                    outcome.excluded.push((
                        lot,
                        "ESTIMATED_DATA: 绒朵为标称估算值".to_string(),
                    ));
                }
                Ok(()) => outcome.candidates.push(lot),
                Err(reason) => outcome.excluded.push((lot, reason)),
            }
        }

        Self::rank(&mut outcome.candidates, req);

        debug!(
            candidates = outcome.candidates.len(),
            excluded = outcome.excluded.len(),
            estimated_excluded = outcome.estimated_excluded,
            "候选准入完成"
        );
        outcome
    }

    /// 单批次准入判定（不含估算数据判定）
    pub fn check(&self, lot: &LotRecord, req: &Requirements) -> Result<(), String> {
        if !lot.is_active {
            return Err("INACTIVE: 批次已停用".to_string());
        }
        if !lot.has_stock() {
            return Err(format!("NO_STOCK: 可用量 {}", lot.available_qty));
        }
        if lot.available_qty < self.min_lot_usage {
            return Err(format!(
                "BELOW_MIN_USAGE: 可用量 {} 低于最小用量 {}",
                lot.available_qty, self.min_lot_usage
            ));
        }
        if lot.is_raw_material() && !req.include_raw_materials {
            return Err("RAW_MATERIAL: 原料组别 G".to_string());
        }
        if !CompatibilityRules::water_repellent_allowed(lot, req.requires_water_repellent()) {
            return Err(format!(
                "WATER_REPELLENT_MISMATCH: 批次防水={}",
                lot.is_water_repellent()
            ));
        }

        let Some(dc) = lot.down_cluster() else {
            return Err("MISSING_DC: 无绒朵数据".to_string());
        };
        if (dc - req.target_dc).abs() > self.initial_dc_range {
            return Err(format!(
                "DC_OUT_OF_RANGE: 绒朵 {:.1} 超出 {:.1} ± {:.1}",
                dc, req.target_dc, self.initial_dc_range
            ));
        }

        if !CompatibilityRules::state_allowed(lot.state, req.target_dc) {
            return Err(format!(
                "STATE_INCOMPATIBLE: 状态 {:?} 不适用绒朵目标 {:.1}",
                lot.state.map(|s| s.code()),
                req.target_dc
            ));
        }
        if let (Some(requested), Some(state)) = (req.effective_state(), lot.state) {
            if requested != state {
                return Err(format!(
                    "STATE_MISMATCH: 需求 {} 批次 {}",
                    requested.code(),
                    state.code()
                ));
            }
        }

        let species = req.effective_species();
        if !CompatibilityRules::species_allowed(lot, species, req.target_duck) {
            return Err(format!(
                "SPECIES_MISMATCH: 需求 {:?} 批次 {:?} 鸭绒 {:?}",
                species.map(|s| s.code()),
                lot.species.map(|s| s.code()),
                lot.duck()
            ));
        }

        let color = req.effective_color();
        if !CompatibilityRules::color_allowed(lot, color) {
            return Err(format!(
                "COLOR_MISMATCH: 需求 {:?} 批次 {:?}",
                color.map(|c| c.code()),
                lot.color.map(|c| c.code())
            ));
        }

        Ok(())
    }

    /// 候选排序（保值优先，批次号兜底）
    pub fn rank(candidates: &mut [&LotRecord], req: &Requirements) {
        candidates.sort_by(|a, b| Self::compare(a, b, req));
    }

    fn compare(a: &LotRecord, b: &LotRecord, req: &Requirements) -> Ordering {
        let duck_a = CompatibilityRules::duck_preservation_penalty(a.duck(), req.target_duck);
        let duck_b = CompatibilityRules::duck_preservation_penalty(b.duck(), req.target_duck);

        duck_a
            .total_cmp(&duck_b)
            .then_with(|| {
                Self::overqualification(a, req.target_dc)
                    .total_cmp(&Self::overqualification(b, req.target_dc))
            })
            .then_with(|| b.disposal_score().total_cmp(&a.disposal_score()))
            .then_with(|| {
                let cost_a = a.cost_per_unit.unwrap_or(MISSING_SORT_KEY);
                let cost_b = b.cost_per_unit.unwrap_or(MISSING_SORT_KEY);
                cost_a.total_cmp(&cost_b)
            })
            .then_with(|| a.lot_code.cmp(&b.lot_code))
            .then_with(|| a.article_code.cmp(&b.article_code))
    }

    fn overqualification(lot: &LotRecord, target_dc: f64) -> f64 {
        match lot.down_cluster() {
            Some(dc) => (dc - target_dc).max(0.0).powf(1.5),
            None => MISSING_SORT_KEY,
        }
    }
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(&SearchLimits::default())
    }
}
