// ==========================================
// 羽绒拼配优化系统 - 优化器配置
// ==========================================
// 职责: 合规容差、评分权重、搜索预算
// 存储: JSON（所有字段可缺省，缺省时使用内置默认值）
// 红线: 评分公式中不出现裸常数，全部经由本配置
// ==========================================

use crate::domain::requirements::Requirements;
use crate::domain::types::QualityMetric;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置读取失败 (path: {path}): {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ValueError {
        key: String,
        value: String,
        message: String,
    },
}

impl ConfigError {
    fn value(key: &str, value: impl ToString, message: &str) -> Self {
        ConfigError::ValueError {
            key: key.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }
}

// ==========================================
// Tolerances - 合规容差
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// 绒朵 ± 百分点
    pub dc: f64,
    /// 蓬松度 ± 绝对单位
    pub fp: f64,
    /// 鸭绒比例 ± 百分点
    pub duck: f64,
    /// 杂质超限的归一化尺度（百分点）
    pub oe: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            dc: 3.0,
            fp: 5.0,
            duck: 5.0,
            oe: 2.0,
        }
    }
}

impl Tolerances {
    /// 应用需求中的容差覆写
    pub fn with_overrides(&self, req: &Requirements) -> Self {
        Self {
            dc: req.dc_tolerance.unwrap_or(self.dc),
            fp: req.fp_tolerance.unwrap_or(self.fp),
            duck: req.duck_tolerance.unwrap_or(self.duck),
            oe: self.oe,
        }
    }

    /// 指标的合规容差（无容差定义的指标为 None）
    pub fn for_metric(&self, metric: QualityMetric) -> Option<f64> {
        match metric {
            QualityMetric::DownCluster => Some(self.dc),
            QualityMetric::FillPower => Some(self.fp),
            QualityMetric::Duck => Some(self.duck),
            QualityMetric::OtherElements => Some(self.oe),
            _ => None,
        }
    }
}

// ==========================================
// ScoringWeights - 评分权重
// ==========================================
// 惩罚项以正数存储，计算时扣减
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// 绒朵目标匹配: 容差内按 (1 - dev/tol) 加分，超出按 (dev-tol)/tol 扣分
    pub dc_match: f64,
    /// 蓬松度目标匹配（同上）
    pub fp_match: f64,
    /// 鸭绒比例在容差内的加分
    pub duck_match: f64,
    /// 鸭绒低于目标的扣分（按相对缺口）
    pub duck_below_target: f64,
    /// 鸭绒高于目标的扣分（按相对超出）
    pub duck_above_target: f64,
    /// 杂质超过上限的扣分（按 超出/oe 容差）
    pub oe_excess: f64,

    /// 颜色每降一级、每单位占比的扣分
    pub tier_penalty_per_rank: f64,
    /// 无任何颜色降级时的加分
    pub tier_compliance_bonus: f64,

    /// 每单位成本的扣分
    pub cost_efficiency: f64,

    /// 处置评分系数（消化低品质批次的加分）
    pub disposal: f64,

    /// 理想批次数（不超过时无扣分）
    pub ideal_lots: usize,
    /// 第 6-7 个批次每个扣分
    pub lot_penalty_light: f64,
    /// 第 8-9 个批次每个扣分
    pub lot_penalty_medium: f64,
    /// 第 10 个及以上批次每个扣分
    pub lot_penalty_heavy: f64,

    /// 目标指标使用估算值时的扣分（按用量加权）
    pub estimated_data: f64,

    /// 鹅绒需求含鸭绒目标时，使用混合批次的加分
    pub species_mix_bonus: f64,
    /// 鹅绒需求含鸭绒目标时，使用纯鸭批次的扣分
    pub species_mismatch: f64,

    /// 高绒朵批次浪费惩罚系数（surplus² × 系数）
    pub dc_overqualification_weight: f64,
    /// 绒朵超出目标多少百分点后开始惩罚
    pub dc_overqualification_threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            dc_match: 1000.0,
            fp_match: 800.0,
            duck_match: 600.0,
            duck_below_target: 500.0,
            duck_above_target: 200.0,
            oe_excess: 250.0,
            tier_penalty_per_rank: 150.0,
            tier_compliance_bonus: 100.0,
            cost_efficiency: 10.0,
            disposal: 0.5,
            ideal_lots: 5,
            lot_penalty_light: 25.0,
            lot_penalty_medium: 50.0,
            lot_penalty_heavy: 100.0,
            estimated_data: 100.0,
            species_mix_bonus: 50.0,
            species_mismatch: 150.0,
            dc_overqualification_weight: 1.0,
            dc_overqualification_threshold: 5.0,
        }
    }
}

// ==========================================
// SearchLimits - 搜索预算
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// 全部策略合计最多生成的组合数
    pub max_combinations: usize,
    /// 优选池大小（top-performers 策略）
    pub top_performers_pool: usize,
    /// 贪心起点数量
    pub greedy_starts: usize,
    /// 贪心扩展时考察的候选数量
    pub greedy_pool: usize,
    /// 多样性策略的轮转次数
    pub diversity_rotations: usize,
    /// 质量优先策略考察的候选数量
    pub quality_first_pool: usize,
    /// 初筛绒朵范围（目标 ± 该值）
    pub initial_dc_range: f64,
    /// 产能封顶再分配的最大迭代次数
    pub allocation_max_iterations: usize,
    /// 绒朵平衡调整的最大迭代次数
    pub balance_iterations: usize,
    /// 数值容差（合计误差、零分配判定）
    pub epsilon: f64,
    /// 单批次最小用量（低于该值的分配删除，可用量低于该值的批次不参与）
    pub min_lot_usage: f64,
    /// 单批次最多使用可用量的比例
    pub max_lot_usage_fraction: f64,
    /// 方案去重阈值（按用量加权的批次重叠度）
    pub similarity_threshold: f64,
    /// 绒朵极差小于该值时均分
    pub similar_dc_spread: f64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_combinations: 25_000,
            top_performers_pool: 12,
            greedy_starts: 20,
            greedy_pool: 60,
            diversity_rotations: 24,
            quality_first_pool: 40,
            initial_dc_range: 15.0,
            allocation_max_iterations: 50,
            balance_iterations: 50,
            epsilon: 0.01,
            min_lot_usage: 10.0,
            max_lot_usage_fraction: 1.0,
            similarity_threshold: 0.8,
            similar_dc_spread: 2.0,
        }
    }
}

// ==========================================
// OptimizerConfig - 优化器配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub tolerances: Tolerances,
    pub weights: ScoringWeights,
    pub search: SearchLimits,
}

impl OptimizerConfig {
    /// 从 JSON 文本加载（缺省字段使用默认值）
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: OptimizerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// 配置快照（JSON），随结果一并记录便于复现
    pub fn snapshot(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("tolerances.dc", self.tolerances.dc),
            ("tolerances.fp", self.tolerances.fp),
            ("tolerances.duck", self.tolerances.duck),
            ("tolerances.oe", self.tolerances.oe),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::value(key, value, "容差必须大于 0"));
            }
        }

        let search = &self.search;
        if search.max_combinations == 0 {
            return Err(ConfigError::value(
                "search.max_combinations",
                search.max_combinations,
                "搜索预算必须大于 0",
            ));
        }
        if search.allocation_max_iterations == 0 {
            return Err(ConfigError::value(
                "search.allocation_max_iterations",
                search.allocation_max_iterations,
                "迭代次数必须大于 0",
            ));
        }
        if !search.epsilon.is_finite() || search.epsilon <= 0.0 {
            return Err(ConfigError::value("search.epsilon", search.epsilon, "必须大于 0"));
        }
        if !(search.max_lot_usage_fraction > 0.0 && search.max_lot_usage_fraction <= 1.0) {
            return Err(ConfigError::value(
                "search.max_lot_usage_fraction",
                search.max_lot_usage_fraction,
                "必须在 (0, 1] 内",
            ));
        }
        if !(search.similarity_threshold > 0.0 && search.similarity_threshold <= 1.0) {
            return Err(ConfigError::value(
                "search.similarity_threshold",
                search.similarity_threshold,
                "必须在 (0, 1] 内",
            ));
        }
        if !search.min_lot_usage.is_finite() || search.min_lot_usage < 0.0 {
            return Err(ConfigError::value(
                "search.min_lot_usage",
                search.min_lot_usage,
                "不能为负",
            ));
        }
        if !search.initial_dc_range.is_finite() || search.initial_dc_range < 0.0 {
            return Err(ConfigError::value(
                "search.initial_dc_range",
                search.initial_dc_range,
                "不能为负",
            ));
        }
        Ok(())
    }
}
