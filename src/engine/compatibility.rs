// ==========================================
// 羽绒拼配优化系统 - 兼容性规则
// ==========================================
// 职责: 判定两个批次能否同场拼配，量化颜色降级
// 红线: 纯函数，规则表为编译期常量，不可运行时修改
// ==========================================
// 规则表:
// - 物种: 羽片(C) 不与任何其他物种混拼
// - 颜色: 纯白/近纯白 不与 灰/再生 混拼
// - 防水: 防水批次与非防水批次不混拼
// ==========================================

use crate::config::ScoringWeights;
use crate::domain::lot::LotRecord;
use crate::domain::types::{ColorTier, MaterialState, Species};

/// 不兼容物种对（无序）
const INCOMPATIBLE_SPECIES: [(Species, Species); 3] = [
    (Species::Couche, Species::Goose),
    (Species::Couche, Species::Duck),
    (Species::Couche, Species::Mixed),
];

/// 不兼容颜色对（无序）
const INCOMPATIBLE_COLORS: [(ColorTier, ColorTier); 4] = [
    (ColorTier::PureWhite, ColorTier::Grey),
    (ColorTier::PureWhite, ColorTier::Recycled),
    (ColorTier::NearlyPureWhite, ColorTier::Grey),
    (ColorTier::NearlyPureWhite, ColorTier::Recycled),
];

/// 半绒(M) 可用的绒朵目标上限
const HALF_DOWN_MAX_DC_TARGET: f64 = 50.0;
/// 毛片(S) 可用的绒朵目标上限
const FEATHER_MAX_DC_TARGET: f64 = 30.0;

fn pair_in<T: PartialEq + Copy>(table: &[(T, T)], a: T, b: T) -> bool {
    table
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

// ==========================================
// CompatibilityRules - 兼容性规则
// ==========================================
#[derive(Debug, Clone)]
pub struct CompatibilityRules {
    tier_penalty_per_rank: f64,
}

impl CompatibilityRules {
    pub fn new(weights: &ScoringWeights) -> Self {
        Self {
            tier_penalty_per_rank: weights.tier_penalty_per_rank,
        }
    }

    /// 两个批次能否同场拼配
    ///
    /// 缺失的分类信息不构成冲突
    pub fn compatible(&self, a: &LotRecord, b: &LotRecord) -> bool {
        if a.is_water_repellent() != b.is_water_repellent() {
            return false;
        }
        if let (Some(sa), Some(sb)) = (a.species, b.species) {
            if pair_in(&INCOMPATIBLE_SPECIES, sa, sb) {
                return false;
            }
        }
        if let (Some(ca), Some(cb)) = (a.color, b.color) {
            if pair_in(&INCOMPATIBLE_COLORS, ca, cb) {
                return false;
            }
        }
        true
    }

    /// 批次能否加入已有组合（与每个成员两两兼容）
    pub fn compatible_with_all(&self, lot: &LotRecord, members: &[&LotRecord]) -> bool {
        members.iter().all(|m| self.compatible(lot, m))
    }

    /// 颜色降级惩罚（每单位用量占比）
    ///
    /// 批次等级不低于需求等级时为 0，否则 = 等级差 × 每级惩罚
    pub fn tier_penalty(&self, requested: ColorTier, lot_tier: ColorTier) -> f64 {
        let gap = lot_tier.rank().saturating_sub(requested.rank());
        f64::from(gap) * self.tier_penalty_per_rank
    }

    /// 物料状态与绒朵目标是否匹配
    ///
    /// P 总是可用；M 仅用于目标 ≤ 50；S 仅用于目标 ≤ 30；O 不用于标准拼配
    pub fn state_allowed(state: Option<MaterialState>, target_dc: f64) -> bool {
        match state {
            None | Some(MaterialState::Down) => true,
            Some(MaterialState::HalfDown) => target_dc <= HALF_DOWN_MAX_DC_TARGET,
            Some(MaterialState::Feather) => target_dc <= FEATHER_MAX_DC_TARGET,
            Some(MaterialState::Original) => false,
        }
    }

    /// 物种过滤（以实测鸭绒比例为准）
    ///
    /// - 鸭绒需求: 拒绝鸭绒 < 15 的鹅绒批次；接受鸭绒 ≥ 50 或编码为鸭的批次
    /// - 鹅绒需求: 有鸭绒目标时接受鸭绒 ≤ 目标 + 30；无目标时拒绝鸭绒 > 95
    /// - 混合需求: 全部接受
    pub fn species_allowed(
        lot: &LotRecord,
        requested: Option<Species>,
        target_duck: Option<f64>,
    ) -> bool {
        let duck = lot.duck().unwrap_or(0.0);
        match requested {
            None | Some(Species::Mixed) => true,
            Some(Species::Duck) => {
                if lot.species == Some(Species::Goose) && duck < 15.0 {
                    return false;
                }
                duck >= 50.0 || lot.species == Some(Species::Duck)
            }
            Some(Species::Goose) => match target_duck {
                Some(target) if target > 0.0 => duck <= target + 30.0,
                _ => duck <= 95.0,
            },
            Some(Species::Couche) => lot.species == Some(Species::Couche),
        }
    }

    /// 颜色过滤: 同一颜色族即可（低等级成员以 tier_penalty 计罚）
    pub fn color_allowed(lot: &LotRecord, requested: Option<ColorTier>) -> bool {
        match (requested, lot.color) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(req), Some(color)) => req.family() == color.family(),
        }
    }

    /// 防水过滤: 要求防水时仅防水批次，否则排除防水批次
    pub fn water_repellent_allowed(lot: &LotRecord, requested: bool) -> bool {
        lot.is_water_repellent() == requested
    }

    /// 鸭绒保值惩罚（候选排序用）
    ///
    /// 鸭绒 < 目标 × 0.5: 珍贵，(阈值 - duck)²
    /// 鸭绒 ∈ [目标 × 0.5, 目标 × 2]: 0
    /// 鸭绒 > 目标 × 2: (duck - 上限)²
    pub fn duck_preservation_penalty(duck: Option<f64>, target_duck: Option<f64>) -> f64 {
        let (Some(duck), Some(target)) = (duck, target_duck) else {
            return 0.0;
        };
        let lower = target * 0.5;
        let upper = target * 2.0;
        if duck < lower {
            (lower - duck).powi(2)
        } else if duck <= upper {
            0.0
        } else {
            (duck - upper).powi(2)
        }
    }
}

impl Default for CompatibilityRules {
    fn default() -> Self {
        Self::new(&ScoringWeights::default())
    }
}
