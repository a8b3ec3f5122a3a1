//! 排名服务 - 业务能力层
//!
//! 对同学范围内每个人分别解析并计分，再按分数降序定位目标学生。
//! 每个同学都需要一次独立的解析 + 计分，这是批量导出的主要开销。

use crate::models::{CanonicalSubject, Phase, RankResult, StudentRef};
use crate::services::evaluation_resolver::EvaluationResolver;
use crate::services::scoring::ScoringEngine;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 单个同学的得分
#[derive(Debug, Clone, PartialEq)]
pub struct MemberScores {
    pub student_id: String,
    pub global_score: u32,
    /// 已完成科目的取整分数
    pub subject_scores: BTreeMap<CanonicalSubject, u32>,
}

/// 同学范围在某阶段的得分快照
///
/// 一次计算即可回答总分排名和各科排名
#[derive(Debug, Clone, Default)]
pub struct CohortSnapshot {
    members: Vec<MemberScores>,
    excluded: usize,
    exclude_zero_scores: bool,
}

impl CohortSnapshot {
    pub fn new(members: Vec<MemberScores>, exclude_zero_scores: bool) -> Self {
        Self {
            members,
            excluded: 0,
            exclude_zero_scores,
        }
    }

    pub fn members(&self) -> &[MemberScores] {
        &self.members
    }

    /// 因解析失败被排除的人数
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// 总分排名
    pub fn rank_global(&self, student_id: &str) -> RankResult {
        let scores = self
            .members
            .iter()
            .map(|m| (m.student_id.as_str(), m.global_score))
            .collect();
        rank_by_score(scores, student_id, self.exclude_zero_scores)
    }

    /// 单科排名；没有该科记录的同学不参与
    pub fn rank_subject(&self, student_id: &str, subject: CanonicalSubject) -> RankResult {
        let scores = self
            .members
            .iter()
            .filter_map(|m| {
                m.subject_scores
                    .get(&subject)
                    .map(|score| (m.student_id.as_str(), *score))
            })
            .collect();
        rank_by_score(scores, student_id, self.exclude_zero_scores)
    }
}

/// 按分数降序排序（同分按学生ID升序），返回目标学生的名次
pub fn rank_by_score(
    mut scores: Vec<(&str, u32)>,
    student_id: &str,
    exclude_zero_scores: bool,
) -> RankResult {
    if exclude_zero_scores {
        scores.retain(|(_, score)| *score > 0);
    }
    scores.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    RankResult {
        student_id: student_id.to_string(),
        position: scores.iter().position(|(id, _)| *id == student_id).map(|i| i + 1),
        cohort_size: scores.len(),
    }
}

/// 排名服务
#[derive(Clone)]
pub struct RankingService {
    resolver: EvaluationResolver,
    scoring: ScoringEngine,
    /// 同时进行的同学解析数
    concurrency: usize,
    exclude_zero_scores: bool,
}

impl RankingService {
    pub fn new(
        resolver: EvaluationResolver,
        concurrency: usize,
        exclude_zero_scores: bool,
    ) -> Self {
        Self {
            resolver,
            scoring: ScoringEngine::new(),
            concurrency: concurrency.max(1),
            exclude_zero_scores,
        }
    }

    /// 计算同学范围的得分快照，解析失败的同学被排除
    pub async fn snapshot(&self, cohort: &[StudentRef], phase: Phase) -> CohortSnapshot {
        let results: Vec<Option<MemberScores>> = stream::iter(cohort.to_vec())
            .map(|member| {
                let service = self.clone();
                async move { service.score_member(&member, phase).await }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let total = results.len();
        let members: Vec<MemberScores> = results.into_iter().flatten().collect();
        let mut snapshot = CohortSnapshot::new(members, self.exclude_zero_scores);
        snapshot.excluded = total - snapshot.members.len();

        debug!(
            "同学范围 {} 计分完成: {} 人, 排除 {} 人",
            phase,
            snapshot.members.len(),
            snapshot.excluded
        );
        snapshot
    }

    /// 总分排名
    pub async fn rank_global(
        &self,
        student_id: &str,
        cohort: &[StudentRef],
        phase: Phase,
    ) -> RankResult {
        self.snapshot(cohort, phase).await.rank_global(student_id)
    }

    /// 单科排名
    pub async fn rank_subject(
        &self,
        student_id: &str,
        subject: CanonicalSubject,
        cohort: &[StudentRef],
        phase: Phase,
    ) -> RankResult {
        self.snapshot(cohort, phase).await.rank_subject(student_id, subject)
    }

    async fn score_member(&self, member: &StudentRef, phase: Phase) -> Option<MemberScores> {
        match self.resolver.resolve(&member.id, phase).await {
            Ok(resolved) => {
                let records = resolved.into_records();
                let best = self.scoring.best_percentages(&records);
                Some(MemberScores {
                    student_id: member.id.clone(),
                    global_score: crate::services::scoring::global_score(&best),
                    subject_scores: best
                        .into_iter()
                        .map(|(subject, pct)| (subject, pct.round() as u32))
                        .collect(),
                })
            }
            Err(e) => {
                warn!("⚠️ 同学 {} 解析失败，不参与排名: {}", member.name, e);
                None
            }
        }
    }
}
