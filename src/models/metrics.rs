//! 计分结果模型

use crate::models::subject::CanonicalSubject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单个阶段的综合指标（按需计算，不持久化）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseMetrics {
    /// 加权总分 [0, 500]
    pub global_score: u32,
    /// 7 个科目中已完成的比例 [0, 100]
    pub phase_percentage: u32,
    /// 平均每题用时（分钟）
    pub average_time_per_question: f64,
    /// 疑似作弊次数
    pub fraud_attempts: u32,
    /// 10 秒内作答的比例 [0, 100]
    pub luck_percentage: u32,
    /// 已完成科目数
    pub completed_subjects: u32,
    /// 总题数
    pub total_questions: u32,
}

/// 单科得分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScoreEntry {
    pub subject: CanonicalSubject,
    /// 最佳百分比
    pub percentage: f64,
    /// 取整后的分数
    pub score: u32,
    /// 百分位档
    pub percentile: u32,
    /// 在同学中的排名
    pub rank: Option<RankResult>,
}

/// 排名结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankResult {
    pub student_id: String,
    /// 名次（从 1 开始），学生不在排名列表中时为 None
    pub position: Option<usize>,
    /// 参与排名的人数
    pub cohort_size: usize,
}

impl RankResult {
    /// 形如 "3/28" 的显示文本
    pub fn display(&self) -> String {
        match self.position {
            Some(position) => format!("{}/{}", position, self.cohort_size),
            None => format!("-/{}", self.cohort_size),
        }
    }
}

/// 前一阶段各科百分比快照（用于趋势展示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorPhaseSnapshot {
    pub phase: crate::models::Phase,
    pub percentages: BTreeMap<CanonicalSubject, u32>,
}
