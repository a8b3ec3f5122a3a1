//! 报告生成流程 - 流程层
//!
//! 核心职责：定义"一个学生一个阶段"的完整报告流程
//!
//! 流程顺序：
//! 1. 学生档案 → 解析作答记录 → 计分
//! 2. 同学范围 → 总分排名 + 各科排名
//! 3. 最终阶段：前两阶段各科快照
//! 4. 交给报告组装器

use crate::config::Config;
use crate::error::{AppResult, ExportError};
use crate::infrastructure::{OutputResource, RecordStore, ReportAssembler};
use crate::models::{CohortKey, Phase, PriorPhaseSnapshot, StudentReport};
use crate::services::{EvaluationResolver, RankingService, ScoringEngine};
use crate::workflow::report_ctx::ReportCtx;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 报告生成流程
///
/// - 不持有任何输出资源
/// - 不关心批次、并发和进度
/// - 每次调用拥有自己的解析结果和指标，调用之间没有共享可变状态
pub struct ReportFlow {
    store: Arc<dyn RecordStore>,
    resolver: EvaluationResolver,
    scoring: ScoringEngine,
    ranking: RankingService,
    assembler: Arc<dyn ReportAssembler>,
}

impl ReportFlow {
    pub fn new(
        store: Arc<dyn RecordStore>,
        assembler: Arc<dyn ReportAssembler>,
        config: &Config,
    ) -> Self {
        let resolver = EvaluationResolver::new(store.clone());
        let ranking = RankingService::new(
            resolver.clone(),
            config.cohort_concurrency,
            config.exclude_zero_scores_from_rank,
        );
        Self {
            store,
            resolver,
            scoring: ScoringEngine::new(),
            ranking,
            assembler,
        }
    }

    /// 运行完整流程，返回组装器产生的输出资源
    pub async fn run(&self, ctx: &ReportCtx) -> AppResult<Box<dyn OutputResource>> {
        info!("{} 📝 开始生成报告", ctx);

        let report = self.build_report(&ctx.student_id, ctx.phase).await?;

        debug!(
            "{} 总分 {} / 排名 {}",
            ctx,
            report.metrics.global_score,
            report.global_rank.display()
        );

        let output = self.assembler.assemble(&report).await?;
        info!("{} ✓ 报告已生成: {}", ctx, output.label());
        Ok(output)
    }

    /// 生成报告数据（不含组装）
    pub async fn build_report(&self, student_id: &str, phase: Phase) -> AppResult<StudentReport> {
        let profile = self.store.get_student_profile(student_id).await?;

        let resolved = self.resolver.resolve(student_id, phase).await?;
        if resolved.is_empty() {
            return Err(ExportError::NoEvaluations {
                student_id: student_id.to_string(),
                phase: phase.label().to_string(),
            }
            .into());
        }
        let records = resolved.into_records();
        let metrics = self.scoring.score(&records);

        let cohort = self
            .store
            .list_cohort_students(&CohortKey::from(&profile), true)
            .await?;
        let snapshot = self.ranking.snapshot(&cohort, phase).await;
        let global_rank = snapshot.rank_global(student_id);

        let mut subjects = self.scoring.subject_entries(&records);
        for entry in &mut subjects {
            entry.rank = Some(snapshot.rank_subject(student_id, entry.subject));
        }

        let prior_phases = if phase.is_final() {
            self.prior_snapshots(student_id, phase).await
        } else {
            Vec::new()
        };

        let institution_name = match self
            .store
            .get_institution_name(&profile.institution_id)
            .await
        {
            Ok(name) => name,
            Err(e) => {
                warn!("⚠️ 无法获取机构名称，使用机构ID代替: {}", e);
                profile.institution_id.clone()
            }
        };

        Ok(StudentReport {
            profile,
            institution_name,
            phase,
            metrics,
            subjects,
            global_rank,
            prior_phases,
            generated_at: chrono::Local::now(),
        })
    }

    /// 前几个阶段的各科百分比，用于趋势展示；查询失败的阶段被跳过
    async fn prior_snapshots(&self, student_id: &str, phase: Phase) -> Vec<PriorPhaseSnapshot> {
        let mut snapshots = Vec::new();
        for previous in phase.previous() {
            match self.resolver.resolve(student_id, previous).await {
                Ok(resolved) => {
                    let records = resolved.into_records();
                    let percentages = self
                        .scoring
                        .best_percentages(&records)
                        .into_iter()
                        .map(|(subject, pct)| (subject, pct.round() as u32))
                        .collect();
                    snapshots.push(PriorPhaseSnapshot {
                        phase: previous,
                        percentages,
                    });
                }
                Err(e) => {
                    warn!("⚠️ {} 的 {} 快照获取失败，跳过: {}", student_id, previous, e);
                }
            }
        }
        snapshots
    }
}
