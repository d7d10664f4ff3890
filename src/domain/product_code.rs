// ==========================================
// 羽绒拼配优化系统 - 物料编码解析
// ==========================================
// 格式: [组别]|{状态}{物种}{颜色}|[认证]
//   例: 3|POB, 3|PAB, G|POAG|GWR, 3|PABPW
// 简写: {状态}{物种}{颜色}  例: POB, POAG
// 特殊编码: PGR -> POAG, PBR -> POAB（按包含匹配，忽略 .GRS 等后缀）
// ==========================================

use crate::domain::types::{ColorTier, MaterialState, Species};
use serde::{Deserialize, Serialize};

/// 防水处理认证代码（GWR 与 NWR 可互换）
pub const WATER_REPELLENT_CERTIFICATIONS: [&str; 2] = ["GWR", "NWR"];

/// 回收料特殊编码: (编码, 状态, 物种, 颜色)
const SPECIAL_ARTICLE_CODES: [(&str, MaterialState, Species, ColorTier); 2] = [
    ("PGR", MaterialState::Down, Species::Mixed, ColorTier::Grey),
    ("PBR", MaterialState::Down, Species::Mixed, ColorTier::White),
];

// ==========================================
// ProductCode - 解析后的物料编码
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCode {
    pub raw_code: String,
    pub group: Option<String>,
    pub state: Option<MaterialState>,
    pub species: Option<Species>,
    pub color: Option<ColorTier>,
    pub certification: Option<String>,
}

impl ProductCode {
    /// 解析物料编码（不会失败，无法识别的部分为 None）
    pub fn parse(raw: &str) -> Self {
        let raw_code = raw.trim().to_string();
        let parts: Vec<&str> = raw_code.split('|').map(str::trim).collect();

        let (group, main_code, certification) = match parts.as_slice() {
            [main] => (None, *main, None),
            [group, main] => (non_empty(group), *main, None),
            [group, main, cert, ..] => (non_empty(group), *main, non_empty(cert)),
            [] => (None, "", None),
        };

        let mut code = ProductCode {
            raw_code: raw_code.clone(),
            group,
            state: None,
            species: None,
            color: None,
            certification,
        };

        let main_upper = main_code.to_uppercase();

        // 特殊编码优先
        if let Some((_, state, species, color)) = SPECIAL_ARTICLE_CODES
            .iter()
            .find(|(special, ..)| main_upper.contains(special))
        {
            code.state = Some(*state);
            code.species = Some(*species);
            code.color = Some(*color);
            return code;
        }

        if main_upper.len() < 3 || !main_upper.is_ascii() {
            return code;
        }

        code.state = main_upper.get(..1).and_then(|s| s.parse().ok());

        let color_part = if main_upper.len() >= 4 && main_upper.get(1..3) == Some("OA") {
            code.species = Some(Species::Mixed);
            main_upper.get(3..)
        } else {
            code.species = main_upper.get(1..2).and_then(|s| s.parse().ok());
            main_upper.get(2..)
        };

        code.color = color_part.and_then(ColorTier::parse_flexible);
        code
    }

    /// 状态/物种/颜色均已识别
    pub fn is_valid(&self) -> bool {
        self.state.is_some() && self.species.is_some() && self.color.is_some()
    }

    pub fn is_water_repellent(&self) -> bool {
        self.certification
            .as_deref()
            .map(is_water_repellent_code)
            .unwrap_or(false)
    }
}

/// 判断代码是否为防水处理（GWR/NWR）
pub fn is_water_repellent_code(code: &str) -> bool {
    let upper = code.trim().to_uppercase();
    WATER_REPELLENT_CERTIFICATIONS.contains(&upper.as_str())
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grouped_code() {
        let code = ProductCode::parse("3|POB");
        assert_eq!(code.group.as_deref(), Some("3"));
        assert_eq!(code.state, Some(MaterialState::Down));
        assert_eq!(code.species, Some(Species::Goose));
        assert_eq!(code.color, Some(ColorTier::White));
        assert!(code.certification.is_none());
        assert!(code.is_valid());
    }

    #[test]
    fn test_parse_mixed_species_with_certification() {
        let code = ProductCode::parse("G|POAG|GWR");
        assert_eq!(code.species, Some(Species::Mixed));
        assert_eq!(code.color, Some(ColorTier::Grey));
        assert!(code.is_water_repellent());
        assert_eq!(code.group.as_deref(), Some("G"));
    }

    #[test]
    fn test_parse_simple_code_with_color_variant() {
        let code = ProductCode::parse("PABPW");
        assert_eq!(code.species, Some(Species::Duck));
        assert_eq!(code.color, Some(ColorTier::PureWhite));
        assert!(code.group.is_none());
    }

    #[test]
    fn test_parse_special_recycled_code() {
        let code = ProductCode::parse("3|PGR.GRS");
        assert_eq!(code.state, Some(MaterialState::Down));
        assert_eq!(code.species, Some(Species::Mixed));
        assert_eq!(code.color, Some(ColorTier::Grey));

        let white = ProductCode::parse("PBR");
        assert_eq!(white.color, Some(ColorTier::White));
    }

    #[test]
    fn test_parse_unrecognized_code() {
        let code = ProductCode::parse("XY");
        assert!(!code.is_valid());
        assert!(code.state.is_none());
    }
}
