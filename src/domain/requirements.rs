// ==========================================
// 羽绒拼配优化系统 - 拼配需求
// ==========================================
// 职责: 目标质量、过滤条件、总量与搜索规模
// 红线: 校验失败必须在搜索开始前返回
// ==========================================

use crate::domain::product_code::ProductCode;
use crate::domain::types::{ColorTier, MaterialState, QualityMetric, Species};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// 方案数量上下限
pub const NUM_SOLUTIONS_RANGE: RangeInclusive<usize> = 1..=10;

/// 单方案批次数上下限
pub const MAX_LOTS_RANGE: RangeInclusive<usize> = 2..=15;

/// 需求校验违规
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: {message}")]
pub struct RequirementsViolation {
    pub field: String,
    pub message: String,
}

impl RequirementsViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ==========================================
// Requirements - 拼配需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    // ===== 目标质量 =====
    pub target_dc: f64,
    #[serde(default)]
    pub target_fp: Option<f64>,
    #[serde(default)]
    pub target_duck: Option<f64>,
    #[serde(default)]
    pub max_other_elements: Option<f64>,

    // ===== 过滤条件 =====
    #[serde(default)]
    pub species: Option<Species>,
    #[serde(default)]
    pub color: Option<ColorTier>,
    #[serde(default)]
    pub water_repellent: Option<bool>,
    /// 物料编码过滤（优先于 species/color）
    #[serde(default)]
    pub product_code: Option<String>,

    // ===== 数量与规模 =====
    pub total_qty: f64,
    #[serde(default = "default_num_solutions")]
    pub num_solutions: usize,
    #[serde(default = "default_max_lots")]
    pub max_lots: usize,

    // ===== 选项 =====
    #[serde(default)]
    pub allow_estimated: bool,
    #[serde(default)]
    pub include_raw_materials: bool,
    #[serde(default)]
    pub compliant_only: bool,

    // ===== 容差覆写（None = 使用配置默认值） =====
    #[serde(default)]
    pub dc_tolerance: Option<f64>,
    #[serde(default)]
    pub fp_tolerance: Option<f64>,
    #[serde(default)]
    pub duck_tolerance: Option<f64>,
}

fn default_num_solutions() -> usize {
    3
}

fn default_max_lots() -> usize {
    10
}

impl Requirements {
    /// 以默认选项构造需求
    pub fn new(target_dc: f64, total_qty: f64) -> Self {
        Self {
            target_dc,
            target_fp: None,
            target_duck: None,
            max_other_elements: None,
            species: None,
            color: None,
            water_repellent: None,
            product_code: None,
            total_qty,
            num_solutions: default_num_solutions(),
            max_lots: default_max_lots(),
            allow_estimated: false,
            include_raw_materials: false,
            compliant_only: false,
            dc_tolerance: None,
            fp_tolerance: None,
            duck_tolerance: None,
        }
    }

    /// 校验需求
    ///
    /// # 规则
    /// 1. total_qty > 0 且有限
    /// 2. num_solutions ∈ [1, 10]
    /// 3. max_lots ∈ [2, 15]
    /// 4. 百分比目标 ∈ [0, 100]，蓬松度 ≥ 0
    /// 5. 容差覆写 > 0
    /// 6. product_code 必须可识别
    pub fn validate(&self) -> Result<(), RequirementsViolation> {
        if !self.total_qty.is_finite() || self.total_qty <= 0.0 {
            return Err(RequirementsViolation::new(
                "total_qty",
                format!("总量必须大于 0 (实际 {})", self.total_qty),
            ));
        }
        if !NUM_SOLUTIONS_RANGE.contains(&self.num_solutions) {
            return Err(RequirementsViolation::new(
                "num_solutions",
                format!(
                    "方案数量 {} 超出范围 [{}, {}]",
                    self.num_solutions,
                    NUM_SOLUTIONS_RANGE.start(),
                    NUM_SOLUTIONS_RANGE.end()
                ),
            ));
        }
        if !MAX_LOTS_RANGE.contains(&self.max_lots) {
            return Err(RequirementsViolation::new(
                "max_lots",
                format!(
                    "批次数上限 {} 超出范围 [{}, {}]",
                    self.max_lots,
                    MAX_LOTS_RANGE.start(),
                    MAX_LOTS_RANGE.end()
                ),
            ));
        }

        check_percentage("target_dc", Some(self.target_dc))?;
        check_percentage("target_duck", self.target_duck)?;
        check_percentage("max_other_elements", self.max_other_elements)?;
        if let Some(fp) = self.target_fp {
            if !fp.is_finite() || fp < 0.0 {
                return Err(RequirementsViolation::new(
                    "target_fp",
                    format!("蓬松度目标无效: {}", fp),
                ));
            }
        }

        for (field, value) in [
            ("dc_tolerance", self.dc_tolerance),
            ("fp_tolerance", self.fp_tolerance),
            ("duck_tolerance", self.duck_tolerance),
        ] {
            if let Some(tol) = value {
                if !tol.is_finite() || tol <= 0.0 {
                    return Err(RequirementsViolation::new(
                        field,
                        format!("容差必须大于 0 (实际 {})", tol),
                    ));
                }
            }
        }

        if let Some(code) = &self.product_code {
            let parsed = ProductCode::parse(code);
            if parsed.species.is_none() && parsed.color.is_none() {
                return Err(RequirementsViolation::new(
                    "product_code",
                    format!("无法识别的物料编码: {}", code),
                ));
            }
        }

        Ok(())
    }

    fn parsed_product_code(&self) -> Option<ProductCode> {
        self.product_code.as_deref().map(ProductCode::parse)
    }

    /// 生效的物种过滤（物料编码优先）
    pub fn effective_species(&self) -> Option<Species> {
        match self.parsed_product_code() {
            Some(code) => code.species,
            None => self.species,
        }
    }

    /// 生效的颜色过滤（物料编码优先）
    pub fn effective_color(&self) -> Option<ColorTier> {
        match self.parsed_product_code() {
            Some(code) => code.color,
            None => self.color,
        }
    }

    /// 物料编码指定的状态
    pub fn effective_state(&self) -> Option<MaterialState> {
        self.parsed_product_code().and_then(|code| code.state)
    }

    /// 是否要求防水处理
    pub fn requires_water_repellent(&self) -> bool {
        let from_code = self
            .parsed_product_code()
            .map(|code| code.is_water_repellent())
            .unwrap_or(false);
        self.water_repellent.unwrap_or(false) || from_code
    }

    /// 有目标值的指标（绒朵/蓬松度/鸭绒）
    pub fn targets(&self) -> Vec<(QualityMetric, f64)> {
        let mut targets = vec![(QualityMetric::DownCluster, self.target_dc)];
        if let Some(fp) = self.target_fp {
            targets.push((QualityMetric::FillPower, fp));
        }
        if let Some(duck) = self.target_duck {
            targets.push((QualityMetric::Duck, duck));
        }
        targets
    }

    pub fn target(&self, metric: QualityMetric) -> Option<f64> {
        match metric {
            QualityMetric::DownCluster => Some(self.target_dc),
            QualityMetric::FillPower => self.target_fp,
            QualityMetric::Duck => self.target_duck,
            _ => None,
        }
    }
}

fn check_percentage(field: &str, value: Option<f64>) -> Result<(), RequirementsViolation> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=100.0).contains(&v) => {
            Err(RequirementsViolation::new(
                field,
                format!("百分比必须在 [0, 100] 内 (实际 {})", v),
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_requirements() {
        let req = Requirements::new(80.0, 1000.0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let req = Requirements::new(80.0, 0.0);
        let err = req.validate().unwrap_err();
        assert_eq!(err.field, "total_qty");

        let req = Requirements::new(80.0, f64::NAN);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_bounds_rejected() {
        let mut req = Requirements::new(80.0, 1000.0);
        req.num_solutions = 0;
        assert_eq!(req.validate().unwrap_err().field, "num_solutions");

        let mut req = Requirements::new(80.0, 1000.0);
        req.num_solutions = 11;
        assert!(req.validate().is_err());

        let mut req = Requirements::new(80.0, 1000.0);
        req.max_lots = 1;
        assert_eq!(req.validate().unwrap_err().field, "max_lots");

        let mut req = Requirements::new(80.0, 1000.0);
        req.max_lots = 16;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_percentage_targets_checked() {
        let req = Requirements::new(120.0, 1000.0);
        assert_eq!(req.validate().unwrap_err().field, "target_dc");

        let mut req = Requirements::new(80.0, 1000.0);
        req.target_duck = Some(-1.0);
        assert_eq!(req.validate().unwrap_err().field, "target_duck");
    }

    #[test]
    fn test_product_code_overrides_filters() {
        let mut req = Requirements::new(80.0, 1000.0);
        req.species = Some(Species::Goose);
        req.product_code = Some("PAB".to_string());
        assert_eq!(req.effective_species(), Some(Species::Duck));
        assert_eq!(req.effective_color(), Some(ColorTier::White));
        assert_eq!(req.effective_state(), Some(MaterialState::Down));
    }

    #[test]
    fn test_unknown_product_code_rejected() {
        let mut req = Requirements::new(80.0, 1000.0);
        req.product_code = Some("??".to_string());
        assert_eq!(req.validate().unwrap_err().field, "product_code");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let req: Requirements =
            serde_json::from_str(r#"{"target_dc": 85.0, "total_qty": 500.0}"#).unwrap();
        assert_eq!(req.num_solutions, 3);
        assert_eq!(req.max_lots, 10);
        assert!(!req.allow_estimated);
        assert_eq!(req.targets().len(), 1);
    }
}
