//! 作答记录解析服务 - 业务能力层
//!
//! 按阶段的所有历史写法合并查询，每个标准科目只保留一条最佳记录

use crate::error::{StoreError, StoreResult};
use crate::infrastructure::RecordStore;
use crate::models::{CanonicalSubject, EvaluationRecord, Phase};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 某学生某阶段解析后的记录，每个标准科目至多一条
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedEvaluations {
    by_subject: BTreeMap<CanonicalSubject, EvaluationRecord>,
}

impl ResolvedEvaluations {
    /// 从任意记录集合中挑选每科最佳记录，无法识别的科目被丢弃
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = EvaluationRecord>,
    {
        let mut by_subject: BTreeMap<CanonicalSubject, EvaluationRecord> = BTreeMap::new();
        for record in records {
            let Some(subject) = record.canonical_subject() else {
                debug!("跳过无法识别的科目: {}", record.subject);
                continue;
            };
            match by_subject.get(&subject) {
                Some(current) if !is_better(&record, current) => {}
                _ => {
                    by_subject.insert(subject, record);
                }
            }
        }
        Self { by_subject }
    }

    /// 按标准科目顺序返回记录
    pub fn records(&self) -> Vec<&EvaluationRecord> {
        self.by_subject.values().collect()
    }

    pub fn into_records(self) -> Vec<EvaluationRecord> {
        self.by_subject.into_values().collect()
    }

    pub fn get(&self, subject: CanonicalSubject) -> Option<&EvaluationRecord> {
        self.by_subject.get(&subject)
    }

    pub fn subjects(&self) -> Vec<CanonicalSubject> {
        self.by_subject.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_subject.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_subject.is_empty()
    }
}

/// 重复记录的取舍：百分比高者优先，相同则记录ID字典序小者优先
fn is_better(candidate: &EvaluationRecord, current: &EvaluationRecord) -> bool {
    let (a, b) = (candidate.percentage(), current.percentage());
    a > b || (a == b && candidate.id < current.id)
}

/// 作答记录解析服务
#[derive(Clone)]
pub struct EvaluationResolver {
    store: Arc<dyn RecordStore>,
}

impl EvaluationResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// 解析某学生某阶段的记录
    ///
    /// 单个写法查询失败只记录日志并继续；所有写法都失败时返回错误
    pub async fn resolve(
        &self,
        student_id: &str,
        phase: Phase,
    ) -> StoreResult<ResolvedEvaluations> {
        let variants = phase.variants();
        let lookups = variants
            .iter()
            .map(|variant| self.store.list_completed_evaluations(student_id, variant));
        let results = join_all(lookups).await;

        let mut failures = 0;
        let mut collected = Vec::new();
        for (variant, result) in variants.iter().zip(results) {
            match result {
                Ok(records) => {
                    collected.extend(records.into_iter().filter(|r| r.completed));
                }
                Err(e) => {
                    failures += 1;
                    warn!("⚠️ 查询 {} 的 \"{}\" 记录失败，跳过: {}", student_id, variant, e);
                }
            }
        }

        if failures == variants.len() {
            return Err(StoreError::AllVariantsFailed {
                student_id: student_id.to_string(),
                phase: phase.label().to_string(),
                attempts: failures,
            });
        }

        let resolved = ResolvedEvaluations::from_records(collected);
        debug!(
            "{} {} 解析完成: {} 个科目",
            student_id,
            phase,
            resolved.len()
        );
        Ok(resolved)
    }
}
