//! 考试阶段模型
//!
//! 历史数据中同一阶段有多种写法（"Fase I"、"fase 1"、"first"…），
//! 解析器需要按所有写法合并查询

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// 考试阶段（三轮，依次进行）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    First,
    Second,
    Third,
}

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:fase|phase)?\s*(iii|ii|i|1|2|3)$").expect("phase regex is valid")
});

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::First, Phase::Second, Phase::Third];

    /// 存储中出现过的所有写法
    pub fn variants(self) -> &'static [&'static str] {
        match self {
            Phase::First => &[
                "Fase I", "fase I", "Fase 1", "fase 1", "fase1", "first", "First", "phase1",
            ],
            Phase::Second => &[
                "Fase II", "fase II", "Fase 2", "fase 2", "fase2", "second", "Second", "phase2",
            ],
            Phase::Third => &[
                "Fase III", "fase III", "Fase 3", "fase 3", "fase3", "third", "Third", "phase3",
            ],
        }
    }

    /// 显示名称
    pub fn label(self) -> &'static str {
        match self {
            Phase::First => "Fase I",
            Phase::Second => "Fase II",
            Phase::Third => "Fase III",
        }
    }

    /// 序号（从 1 开始）
    pub fn number(self) -> u8 {
        match self {
            Phase::First => 1,
            Phase::Second => 2,
            Phase::Third => 3,
        }
    }

    /// 最后一个阶段的报告需要展示前两阶段的趋势
    pub fn is_final(self) -> bool {
        self == Phase::Third
    }

    /// 当前阶段之前的所有阶段
    pub fn previous(self) -> Vec<Phase> {
        Phase::ALL.into_iter().filter(|p| *p < self).collect()
    }

    /// 从任意写法解析阶段
    pub fn parse(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if let Some(caps) = NUMBERED.captures(trimmed) {
            return match caps[1].to_lowercase().as_str() {
                "i" | "1" => Some(Phase::First),
                "ii" | "2" => Some(Phase::Second),
                "iii" | "3" => Some(Phase::Third),
                _ => None,
            };
        }

        match trimmed.to_lowercase().as_str() {
            "first" | "primera" | "primer" | "1st" => Some(Phase::First),
            "second" | "segunda" | "segundo" | "2nd" => Some(Phase::Second),
            "third" | "tercera" | "tercer" | "3rd" | "final" => Some(Phase::Third),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
