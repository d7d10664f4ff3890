// ==========================================
// 羽绒拼配优化系统 - 组合生成策略
// ==========================================
// 用途：
// - 多种策略依次运行，扩大候选组合的多样性；
// - 策略顺序固定，保证相同输入得到相同结果。

use serde::{Deserialize, Serialize};

/// 组合生成策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    GreedyBest,
    TopPerformers,
    Diversity,
    QualityFirst,
}

impl GenerationStrategy {
    /// 默认运行顺序
    pub const ALL: [GenerationStrategy; 4] = [
        GenerationStrategy::QualityFirst,
        GenerationStrategy::GreedyBest,
        GenerationStrategy::TopPerformers,
        GenerationStrategy::Diversity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStrategy::GreedyBest => "greedy_best",
            GenerationStrategy::TopPerformers => "top_performers",
            GenerationStrategy::Diversity => "diversity",
            GenerationStrategy::QualityFirst => "quality_first",
        }
    }
}

impl std::fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GenerationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "greedy_best" | "greedy-best" | "greedy" => Ok(GenerationStrategy::GreedyBest),
            "top_performers" | "top-performers" => Ok(GenerationStrategy::TopPerformers),
            "diversity" => Ok(GenerationStrategy::Diversity),
            "quality_first" | "quality-first" => Ok(GenerationStrategy::QualityFirst),
            other => Err(format!("未知生成策略: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy() {
        assert_eq!("greedy-best".parse::<GenerationStrategy>(), Ok(GenerationStrategy::GreedyBest));
        assert_eq!(" Diversity ".parse::<GenerationStrategy>(), Ok(GenerationStrategy::Diversity));
        assert!("random".parse::<GenerationStrategy>().is_err());
    }

    #[test]
    fn test_all_strategies_listed_once() {
        for strategy in [
            GenerationStrategy::GreedyBest,
            GenerationStrategy::TopPerformers,
            GenerationStrategy::Diversity,
            GenerationStrategy::QualityFirst,
        ] {
            assert_eq!(GenerationStrategy::ALL.iter().filter(|s| **s == strategy).count(), 1);
            assert_eq!(strategy.as_str().parse::<GenerationStrategy>(), Ok(strategy));
        }
    }
}
