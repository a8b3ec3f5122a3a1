//! 计分引擎 - 业务能力层
//!
//! 纯计算：输入已解析的作答记录，输出加权总分、完成度、百分位档和行为指标。
//! 同一组记录重复计算结果完全一致。

use crate::models::{CanonicalSubject, EvaluationRecord, PhaseMetrics, SubjectScoreEntry};
use crate::services::evaluation_resolver::ResolvedEvaluations;
use std::collections::BTreeMap;

/// "凭运气"作答的时间阈值（秒）
const LUCKY_GUESS_SECONDS: f64 = 10.0;

/// 百分位档：(最低分, 百分位)，从高到低
const PERCENTILE_STEPS: [(u32, u32); 13] = [
    (90, 95),
    (85, 90),
    (80, 85),
    (75, 80),
    (70, 75),
    (65, 70),
    (60, 65),
    (55, 60),
    (50, 55),
    (45, 50),
    (40, 45),
    (35, 40),
    (30, 35),
];

/// 把分数映射到固定的百分位档（查表，不是统计百分位）
pub fn percentile(score: u32) -> u32 {
    PERCENTILE_STEPS
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, bucket)| *bucket)
        .unwrap_or_else(|| ((f64::from(score) / 2.0).round() as u32).max(5))
}

/// 计分引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// 计算阶段指标
    pub fn score(&self, records: &[EvaluationRecord]) -> PhaseMetrics {
        let best = self.best_percentages(records);

        let completed_subjects = best.len() as u32;
        let phase_percentage =
            (f64::from(completed_subjects) / CanonicalSubject::COUNT as f64 * 100.0).round() as u32;

        let total_questions = records.iter().map(EvaluationRecord::question_count).sum();
        let fraud_attempts = records.iter().filter(|r| r.is_suspicious()).count() as u32;

        PhaseMetrics {
            global_score: global_score(&best),
            phase_percentage,
            average_time_per_question: average_minutes_per_question(records),
            fraud_attempts,
            luck_percentage: luck_percentage(records),
            completed_subjects,
            total_questions,
        }
    }

    /// 计算已解析记录的阶段指标
    pub fn score_resolved(&self, resolved: &ResolvedEvaluations) -> PhaseMetrics {
        let records: Vec<EvaluationRecord> = resolved.records().into_iter().cloned().collect();
        self.score(&records)
    }

    /// 每个标准科目的最佳百分比，限制在 [0, 100]
    pub fn best_percentages(
        &self,
        records: &[EvaluationRecord],
    ) -> BTreeMap<CanonicalSubject, f64> {
        let mut best: BTreeMap<CanonicalSubject, f64> = BTreeMap::new();
        for record in records {
            let Some(subject) = record.canonical_subject() else {
                continue;
            };
            let pct = record.percentage().clamp(0.0, 100.0);
            best.entry(subject)
                .and_modify(|current| {
                    if pct > *current {
                        *current = pct;
                    }
                })
                .or_insert(pct);
        }
        best
    }

    /// 按标准科目顺序生成单科得分（排名稍后填入）
    pub fn subject_entries(&self, records: &[EvaluationRecord]) -> Vec<SubjectScoreEntry> {
        self.best_percentages(records)
            .into_iter()
            .map(|(subject, percentage)| {
                let score = percentage.round() as u32;
                SubjectScoreEntry {
                    subject,
                    percentage,
                    score,
                    percentile: percentile(score),
                    rank: None,
                }
            })
            .collect()
    }
}

/// 加权总分：自然科学每科最多 100/3，其余每科最多 100
pub fn global_score(best: &BTreeMap<CanonicalSubject, f64>) -> u32 {
    let total: f64 = best
        .iter()
        .map(|(subject, pct)| pct.clamp(0.0, 100.0) / 100.0 * subject.weight_cap())
        .sum();
    (total.round() as u32).min(500)
}

/// 所有正用时样本的平均值（分钟）
fn average_minutes_per_question(records: &[EvaluationRecord]) -> f64 {
    let samples: Vec<f64> = records
        .iter()
        .flat_map(|r| r.answers.iter())
        .filter_map(|a| a.time_spent_secs)
        .filter(|t| *t > 0.0)
        .collect();

    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64 / 60.0
}

/// 非英语科目中已作答且有用时的题目里，10 秒内作答的比例
fn luck_percentage(records: &[EvaluationRecord]) -> u32 {
    let mut qualifying = 0usize;
    let mut quick = 0usize;

    for record in records {
        if record.canonical_subject() == Some(CanonicalSubject::English) {
            continue;
        }
        for answer in record.answers.iter().filter(|a| a.answered) {
            let Some(seconds) = answer.time_spent_secs.filter(|t| *t > 0.0) else {
                continue;
            };
            qualifying += 1;
            if seconds < LUCKY_GUESS_SECONDS {
                quick += 1;
            }
        }
    }

    if qualifying == 0 {
        return 0;
    }
    (quick as f64 / qualifying as f64 * 100.0).round() as u32
}
