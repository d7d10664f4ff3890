// ==========================================
// 羽绒拼配优化系统 - 候选组合与配比方案
// ==========================================
// Candidate:  一组互相兼容的批次（未分配）
// Allocation: 每个批次的分配量（合计 = 需求总量）
// Solution:   评分后的配比方案（自包含，可直接交给上层导出）
// ==========================================

use crate::domain::lot::{LotKey, LotRecord};
use crate::domain::types::QualityMetric;
use serde::{Deserialize, Serialize};

// ==========================================
// Candidate - 候选批次组合
// ==========================================
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub lots: Vec<&'a LotRecord>,
}

impl<'a> Candidate<'a> {
    pub fn new(lots: Vec<&'a LotRecord>) -> Self {
        Self { lots }
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// 组合签名（排序后的批次标识，用于去重）
    pub fn signature(&self) -> Vec<LotKey> {
        let mut keys: Vec<LotKey> = self.lots.iter().map(|l| l.key()).collect();
        keys.sort();
        keys
    }
}

// ==========================================
// Allocation - 批次分配
// ==========================================
#[derive(Debug, Clone)]
pub struct Allocation<'a> {
    pub items: Vec<(&'a LotRecord, f64)>,
}

impl<'a> Allocation<'a> {
    pub fn new(items: Vec<(&'a LotRecord, f64)>) -> Self {
        Self { items }
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(|(_, qty)| *qty).sum()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, key: &LotKey) -> Option<f64> {
        self.items
            .iter()
            .find(|(lot, _)| lot.matches(key))
            .map(|(_, qty)| *qty)
    }
}

// ==========================================
// AllocatedLot - 方案中的单个批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedLot {
    pub lot: LotRecord,
    pub quantity: f64,
    /// 占配比百分比
    pub share_pct: f64,
    /// 该批次成本（无单价时为 None）
    pub cost: Option<f64>,
}

// ==========================================
// MetricSummary - 单指标汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: QualityMetric,
    /// 加权平均（所有批次均缺失时为 None）
    pub average: Option<f64>,
    pub target: Option<f64>,
    /// |average - target|，无目标或无数据时为 0
    pub deviation: f64,
}

// ==========================================
// ComplianceFlags - 合规标记
// ==========================================
// 无目标或无数据的指标视为合规
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFlags {
    pub down_cluster: bool,
    pub fill_power: bool,
    pub duck: bool,
    pub other_elements: bool,
}

impl ComplianceFlags {
    pub fn all(&self) -> bool {
        self.down_cluster && self.fill_power && self.duck && self.other_elements
    }

    /// 不合规指标列表
    pub fn failures(&self) -> Vec<QualityMetric> {
        let mut failed = Vec::new();
        if !self.down_cluster {
            failed.push(QualityMetric::DownCluster);
        }
        if !self.fill_power {
            failed.push(QualityMetric::FillPower);
        }
        if !self.duck {
            failed.push(QualityMetric::Duck);
        }
        if !self.other_elements {
            failed.push(QualityMetric::OtherElements);
        }
        failed
    }
}

// ==========================================
// ScoreBreakdown - 评分明细
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub dc_match: f64,
    pub fp_match: f64,
    pub duck_match: f64,
    pub oe_excess: f64,
    pub tier: f64,
    pub cost_efficiency: f64,
    pub disposal: f64,
    pub lot_count: f64,
    pub species_mix: f64,
    pub estimated_data: f64,
    pub dc_overqualification: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.dc_match
            + self.fp_match
            + self.duck_match
            + self.oe_excess
            + self.tier
            + self.cost_efficiency
            + self.disposal
            + self.lot_count
            + self.species_mix
            + self.estimated_data
            + self.dc_overqualification
    }
}

// ==========================================
// Solution - 配比方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub lots: Vec<AllocatedLot>,
    pub total_qty: f64,

    // ===== 质量 =====
    pub metrics: Vec<MetricSummary>,
    pub compliance: ComplianceFlags,
    /// 颜色降级惩罚（按用量加权）
    pub tier_penalty: f64,

    // ===== 成本 =====
    /// 有价批次的成本合计（未定价批次不计入）
    pub total_cost: f64,
    /// total_cost / 有价批次用量；没有任何有价批次时为 0
    pub cost_per_unit: f64,

    // ===== 评分 =====
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl Solution {
    pub fn lot_count(&self) -> usize {
        self.lots.len()
    }

    pub fn metric(&self, metric: QualityMetric) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    pub fn average(&self, metric: QualityMetric) -> Option<f64> {
        self.metric(metric).and_then(|m| m.average)
    }

    pub fn deviation(&self, metric: QualityMetric) -> f64 {
        self.metric(metric).map(|m| m.deviation).unwrap_or(0.0)
    }

    pub fn quantity_of(&self, key: &LotKey) -> Option<f64> {
        self.lots
            .iter()
            .find(|l| l.lot.matches(key))
            .map(|l| l.quantity)
    }

    /// 排序后的批次标识
    pub fn lot_keys(&self) -> Vec<LotKey> {
        let mut keys: Vec<LotKey> = self.lots.iter().map(|l| l.lot.key()).collect();
        keys.sort();
        keys
    }

    pub fn is_fully_compliant(&self) -> bool {
        self.compliance.all()
    }
}
