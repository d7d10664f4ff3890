// ==========================================
// 羽绒拼配优化系统 - 库存批次领域模型
// ==========================================
// 职责: 单个库存批次的不可变快照
// 红线: 引擎只读，不修改批次数据
// 说明: 字段名在入库边界统一，引擎内不做多字段名回退
// ==========================================

use crate::domain::product_code::{is_water_repellent_code, ProductCode};
use crate::domain::types::{ColorTier, MaterialState, QualityMetric, Species};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// QualityValues - 质量指标集合
// ==========================================
// None 表示未检测/缺失
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityValues {
    #[serde(default)]
    pub down_cluster: Option<f64>, // 绒朵含量 %
    #[serde(default)]
    pub fill_power: Option<f64>, // 蓬松度
    #[serde(default)]
    pub duck: Option<f64>, // 鸭绒比例 %
    #[serde(default)]
    pub other_elements: Option<f64>, // 杂质 %
    #[serde(default)]
    pub feather: Option<f64>, // 毛片 %
    #[serde(default)]
    pub oxygen: Option<f64>, // 耗氧量
    #[serde(default)]
    pub turbidity: Option<f64>, // 浊度
    #[serde(default)]
    pub total_fibres: Option<f64>, // 纤维 %
    #[serde(default)]
    pub broken: Option<f64>, // 破损 %
    #[serde(default)]
    pub landfowl: Option<f64>, // 陆禽 %
}

impl QualityValues {
    pub fn get(&self, metric: QualityMetric) -> Option<f64> {
        let value = match metric {
            QualityMetric::DownCluster => self.down_cluster,
            QualityMetric::FillPower => self.fill_power,
            QualityMetric::Duck => self.duck,
            QualityMetric::OtherElements => self.other_elements,
            QualityMetric::Feather => self.feather,
            QualityMetric::Oxygen => self.oxygen,
            QualityMetric::Turbidity => self.turbidity,
            QualityMetric::TotalFibres => self.total_fibres,
            QualityMetric::Broken => self.broken,
            QualityMetric::Landfowl => self.landfowl,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn set(&mut self, metric: QualityMetric, value: Option<f64>) {
        let slot = match metric {
            QualityMetric::DownCluster => &mut self.down_cluster,
            QualityMetric::FillPower => &mut self.fill_power,
            QualityMetric::Duck => &mut self.duck,
            QualityMetric::OtherElements => &mut self.other_elements,
            QualityMetric::Feather => &mut self.feather,
            QualityMetric::Oxygen => &mut self.oxygen,
            QualityMetric::Turbidity => &mut self.turbidity,
            QualityMetric::TotalFibres => &mut self.total_fibres,
            QualityMetric::Broken => &mut self.broken,
            QualityMetric::Landfowl => &mut self.landfowl,
        };
        *slot = value;
    }
}

// ==========================================
// LotKey - 批次标识
// ==========================================
// 批次号只在物料编码内唯一，引擎内一律以 (物料编码, 批次号) 识别批次
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LotKey {
    pub article_code: String,
    pub lot_code: String,
}

impl LotKey {
    pub fn new(article_code: &str, lot_code: &str) -> Self {
        Self {
            article_code: article_code.to_string(),
            lot_code: lot_code.to_string(),
        }
    }
}

impl fmt::Display for LotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.article_code, self.lot_code)
    }
}

// ==========================================
// LotRecord - 库存批次快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotRecord {
    // ===== 标识 =====
    pub article_code: String, // 物料编码
    pub lot_code: String,     // 批次号

    #[serde(default)]
    pub description: Option<String>,

    // ===== 分类 =====
    #[serde(default)]
    pub group_code: Option<String>, // 组别 (G = 原料)
    #[serde(default)]
    pub species: Option<Species>,
    #[serde(default)]
    pub color: Option<ColorTier>,
    #[serde(default)]
    pub state: Option<MaterialState>,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub water_repellent: bool,

    // ===== 质量 =====
    #[serde(default)]
    pub measured: QualityValues, // 实测值
    #[serde(default)]
    pub nominal: QualityValues, // 标称值
    #[serde(default)]
    pub quality_nominal: Option<String>,

    // ===== 业务 =====
    pub available_qty: f64,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,

    // ===== 估算标记 =====
    #[serde(default)]
    pub dc_estimated: bool, // 绒朵由标称值补齐
    #[serde(default)]
    pub fp_estimated: bool, // 蓬松度由标称值补齐
}

fn default_active() -> bool {
    true
}

impl LotRecord {
    pub fn key(&self) -> LotKey {
        LotKey::new(&self.article_code, &self.lot_code)
    }

    /// 与标识是否一致
    pub fn matches(&self, key: &LotKey) -> bool {
        self.article_code == key.article_code && self.lot_code == key.lot_code
    }

    /// 实测指标值（缺失为 None）
    pub fn metric(&self, metric: QualityMetric) -> Option<f64> {
        self.measured.get(metric)
    }

    pub fn down_cluster(&self) -> Option<f64> {
        self.metric(QualityMetric::DownCluster)
    }

    pub fn duck(&self) -> Option<f64> {
        self.metric(QualityMetric::Duck)
    }

    /// 估算批次（仅以绒朵是否补齐为准）
    pub fn is_estimated(&self) -> bool {
        self.dc_estimated
    }

    /// 防水处理: 认证或标称质量任一为 GWR/NWR
    pub fn is_water_repellent(&self) -> bool {
        self.water_repellent
            || self
                .certification
                .as_deref()
                .map(is_water_repellent_code)
                .unwrap_or(false)
            || self
                .quality_nominal
                .as_deref()
                .map(is_water_repellent_code)
                .unwrap_or(false)
    }

    pub fn is_raw_material(&self) -> bool {
        matches!(self.group_code.as_deref(), Some(g) if g.trim().eq_ignore_ascii_case("G"))
    }

    /// 可用量是否有效且为正
    pub fn has_stock(&self) -> bool {
        self.available_qty.is_finite() && self.available_qty > 0.0
    }

    /// 处置评分（越高 = 品质越差 = 越优先消化）
    pub fn disposal_score(&self) -> f64 {
        let weighted = [
            (QualityMetric::Duck, 1.5),
            (QualityMetric::OtherElements, 3.0),
            (QualityMetric::Feather, 1.0),
            (QualityMetric::TotalFibres, 2.0),
            (QualityMetric::Broken, 1.5),
            (QualityMetric::Landfowl, 2.0),
        ];

        let mut score = self
            .down_cluster()
            .map(|dc| (100.0 - dc) * 2.0)
            .unwrap_or(0.0);
        for (metric, factor) in weighted {
            if let Some(value) = self.metric(metric) {
                score += value * factor;
            }
        }
        if self.is_estimated() {
            score -= 50.0;
        }
        score
    }
}

// ==========================================
// LotBuilder - 批次构建器
// ==========================================
// 供入库边界与测试使用: 由物料编码推导分类，可选补齐估算值
pub struct LotBuilder {
    lot: LotRecord,
}

impl LotBuilder {
    pub fn new(article_code: &str, lot_code: &str) -> Self {
        let product = ProductCode::parse(article_code);
        let water_repellent = product.is_water_repellent();
        Self {
            lot: LotRecord {
                article_code: article_code.to_string(),
                lot_code: lot_code.to_string(),
                description: None,
                group_code: product.group,
                species: product.species,
                color: product.color,
                state: product.state,
                certification: product.certification,
                water_repellent,
                measured: QualityValues::default(),
                nominal: QualityValues::default(),
                quality_nominal: None,
                available_qty: 0.0,
                cost_per_unit: None,
                is_active: true,
                dc_estimated: false,
                fp_estimated: false,
            },
        }
    }

    pub fn measured(mut self, metric: QualityMetric, value: f64) -> Self {
        self.lot.measured.set(metric, Some(value));
        self
    }

    pub fn nominal(mut self, metric: QualityMetric, value: f64) -> Self {
        self.lot.nominal.set(metric, Some(value));
        self
    }

    pub fn down_cluster(self, value: f64) -> Self {
        self.measured(QualityMetric::DownCluster, value)
    }

    pub fn fill_power(self, value: f64) -> Self {
        self.measured(QualityMetric::FillPower, value)
    }

    pub fn duck(self, value: f64) -> Self {
        self.measured(QualityMetric::Duck, value)
    }

    pub fn other_elements(self, value: f64) -> Self {
        self.measured(QualityMetric::OtherElements, value)
    }

    pub fn available(mut self, qty: f64) -> Self {
        self.lot.available_qty = qty;
        self
    }

    pub fn cost(mut self, cost_per_unit: f64) -> Self {
        self.lot.cost_per_unit = Some(cost_per_unit);
        self
    }

    pub fn quality_nominal(mut self, quality: &str) -> Self {
        self.lot.quality_nominal = Some(quality.to_string());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.lot.is_active = false;
        self
    }

    pub fn estimated(mut self) -> Self {
        self.lot.dc_estimated = true;
        self
    }

    /// 补齐未检测指标
    ///
    /// 规则:
    /// 1) 绒朵/蓬松度实测缺失或为 0 → 使用标称值，并标记为估算
    /// 2) 纯鸭批次鸭绒比例缺失或为 0 → 100
    pub fn impute_from_nominal(mut self) -> Self {
        let untested = |v: Option<f64>| v.map(|x| x == 0.0).unwrap_or(true);

        if untested(self.lot.measured.down_cluster) {
            if let Some(nominal) = self.lot.nominal.down_cluster.filter(|v| *v > 0.0) {
                self.lot.measured.down_cluster = Some(nominal);
                self.lot.dc_estimated = true;
            }
        }
        if untested(self.lot.measured.fill_power) {
            if let Some(nominal) = self.lot.nominal.fill_power.filter(|v| *v > 0.0) {
                self.lot.measured.fill_power = Some(nominal);
                self.lot.fp_estimated = true;
            }
        }
        if self.lot.species == Some(Species::Duck) && untested(self.lot.measured.duck) {
            self.lot.measured.duck = Some(100.0);
        }
        self
    }

    pub fn build(self) -> LotRecord {
        self.lot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_derives_classification() {
        let lot = LotBuilder::new("3|POAB|NWR", "L001").available(500.0).build();
        assert_eq!(lot.species, Some(Species::Mixed));
        assert_eq!(lot.color, Some(ColorTier::White));
        assert_eq!(lot.state, Some(MaterialState::Down));
        assert!(lot.is_water_repellent());
        assert!(lot.has_stock());
    }

    #[test]
    fn test_water_repellent_from_quality_nominal() {
        let lot = LotBuilder::new("3|POB", "L002").quality_nominal("gwr").build();
        assert!(lot.is_water_repellent());
    }

    #[test]
    fn test_impute_from_nominal() {
        let lot = LotBuilder::new("3|PAB", "L003")
            .down_cluster(0.0)
            .nominal(QualityMetric::DownCluster, 90.0)
            .nominal(QualityMetric::FillPower, 650.0)
            .impute_from_nominal()
            .build();
        assert_eq!(lot.down_cluster(), Some(90.0));
        assert!(lot.dc_estimated);
        assert!(lot.fp_estimated);
        assert!(lot.is_estimated());
        assert_eq!(lot.duck(), Some(100.0));
    }

    #[test]
    fn test_measured_values_not_overwritten() {
        let lot = LotBuilder::new("3|POB", "L004")
            .down_cluster(85.0)
            .nominal(QualityMetric::DownCluster, 90.0)
            .impute_from_nominal()
            .build();
        assert_eq!(lot.down_cluster(), Some(85.0));
        assert!(!lot.is_estimated());
    }

    #[test]
    fn test_disposal_score_prefers_low_quality() {
        let good = LotBuilder::new("3|POB", "G1").down_cluster(90.0).build();
        let poor = LotBuilder::new("3|POB", "P1").down_cluster(60.0).other_elements(4.0).build();
        assert!(poor.disposal_score() > good.disposal_score());
    }

    #[test]
    fn test_nan_metric_treated_as_missing() {
        let lot = LotBuilder::new("3|POB", "N1").other_elements(f64::NAN).build();
        assert_eq!(lot.metric(QualityMetric::OtherElements), None);
    }
}
