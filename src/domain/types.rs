// ==========================================
// 羽绒拼配优化系统 - 领域类型定义
// ==========================================
// 职责: 物种/颜色等级/物料状态/质量指标的枚举
// 序列化格式: 与物料编码一致的短代码
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 物种 (Species)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Species {
    #[serde(rename = "O")]
    Goose, // 鹅
    #[serde(rename = "A")]
    Duck, // 鸭
    #[serde(rename = "OA")]
    Mixed, // 鹅鸭混合
    #[serde(rename = "C")]
    Couche, // Couché
}

impl Species {
    pub fn code(&self) -> &'static str {
        match self {
            Species::Goose => "O",
            Species::Duck => "A",
            Species::Mixed => "OA",
            Species::Couche => "C",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "O" => Ok(Species::Goose),
            "A" => Ok(Species::Duck),
            "OA" => Ok(Species::Mixed),
            "C" => Ok(Species::Couche),
            other => Err(format!("未知物种代码: {}", other)),
        }
    }
}

// ==========================================
// 颜色家族 (Color Family)
// ==========================================
// 同一家族内允许降级替代（由等级惩罚约束）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorFamily {
    White,
    Grey,
    Recycled,
}

// ==========================================
// 颜色等级 (Color Tier)
// ==========================================
// 顺序: PureWhite < NearlyPureWhite < White < Grey < Recycled
// rank 越小等级越高
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColorTier {
    #[serde(rename = "PW")]
    PureWhite,
    #[serde(rename = "NPW")]
    NearlyPureWhite,
    #[serde(rename = "B")]
    White,
    #[serde(rename = "G")]
    Grey,
    #[serde(rename = "R")]
    Recycled,
}

impl ColorTier {
    pub fn code(&self) -> &'static str {
        match self {
            ColorTier::PureWhite => "PW",
            ColorTier::NearlyPureWhite => "NPW",
            ColorTier::White => "B",
            ColorTier::Grey => "G",
            ColorTier::Recycled => "R",
        }
    }

    /// 质量等级（1=最好）
    pub fn rank(&self) -> u8 {
        match self {
            ColorTier::PureWhite => 1,
            ColorTier::NearlyPureWhite => 2,
            ColorTier::White => 3,
            ColorTier::Grey => 4,
            ColorTier::Recycled => 5,
        }
    }

    pub fn family(&self) -> ColorFamily {
        match self {
            ColorTier::PureWhite | ColorTier::NearlyPureWhite | ColorTier::White => {
                ColorFamily::White
            }
            ColorTier::Grey => ColorFamily::Grey,
            ColorTier::Recycled => ColorFamily::Recycled,
        }
    }

    /// 解析颜色代码，接受 BPW/BNPW 变体与后缀（如 B.FM、G.CINA）
    pub fn parse_flexible(raw: &str) -> Option<ColorTier> {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if let Some(tier) = Self::exact(&upper) {
            return Some(tier);
        }

        let base = upper.split('.').next().unwrap_or("");
        if let Some(tier) = Self::exact(base) {
            return Some(tier);
        }

        // 逐步截短前缀: BNPW -> BNP -> BN -> B
        for len in [4usize, 3, 2, 1] {
            if base.len() >= len {
                if let Some(tier) = base.get(..len).and_then(Self::exact) {
                    return Some(tier);
                }
            }
        }
        None
    }

    fn exact(code: &str) -> Option<ColorTier> {
        match code {
            "PW" | "BPW" => Some(ColorTier::PureWhite),
            "NPW" | "BNPW" => Some(ColorTier::NearlyPureWhite),
            "B" => Some(ColorTier::White),
            "G" => Some(ColorTier::Grey),
            "R" => Some(ColorTier::Recycled),
            _ => None,
        }
    }
}

impl fmt::Display for ColorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ColorTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorTier::parse_flexible(s).ok_or_else(|| format!("未知颜色代码: {}", s))
    }
}

// ==========================================
// 物料状态 (Material State)
// ==========================================
// 物料编码首字母: P/M/S/O
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialState {
    #[serde(rename = "P")]
    Down, // 绒
    #[serde(rename = "M")]
    HalfDown, // 半绒
    #[serde(rename = "S")]
    Feather, // 毛片
    #[serde(rename = "O")]
    Original, // 原料
}

impl MaterialState {
    pub fn code(&self) -> &'static str {
        match self {
            MaterialState::Down => "P",
            MaterialState::HalfDown => "M",
            MaterialState::Feather => "S",
            MaterialState::Original => "O",
        }
    }
}

impl fmt::Display for MaterialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for MaterialState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "P" => Ok(MaterialState::Down),
            "M" => Ok(MaterialState::HalfDown),
            "S" => Ok(MaterialState::Feather),
            "O" => Ok(MaterialState::Original),
            other => Err(format!("未知物料状态: {}", other)),
        }
    }
}

// ==========================================
// 质量指标 (Quality Metric)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMetric {
    DownCluster,
    FillPower,
    Duck,
    OtherElements,
    Feather,
    Oxygen,
    Turbidity,
    TotalFibres,
    Broken,
    Landfowl,
}

impl QualityMetric {
    pub const ALL: [QualityMetric; 10] = [
        QualityMetric::DownCluster,
        QualityMetric::FillPower,
        QualityMetric::Duck,
        QualityMetric::OtherElements,
        QualityMetric::Feather,
        QualityMetric::Oxygen,
        QualityMetric::Turbidity,
        QualityMetric::TotalFibres,
        QualityMetric::Broken,
        QualityMetric::Landfowl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityMetric::DownCluster => "down_cluster",
            QualityMetric::FillPower => "fill_power",
            QualityMetric::Duck => "duck",
            QualityMetric::OtherElements => "other_elements",
            QualityMetric::Feather => "feather",
            QualityMetric::Oxygen => "oxygen",
            QualityMetric::Turbidity => "turbidity",
            QualityMetric::TotalFibres => "total_fibres",
            QualityMetric::Broken => "broken",
            QualityMetric::Landfowl => "landfowl",
        }
    }
}

impl fmt::Display for QualityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
