//! 内存记录存储
//!
//! 由 TOML 数据集构建，供离线导出和测试使用

use crate::error::{StoreError, StoreResult};
use crate::infrastructure::record_store::RecordStore;
use crate::models::{CohortKey, Dataset, EvaluationRecord, StudentProfile, StudentRef};
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

/// 内存记录存储
#[derive(Debug, Default)]
pub struct InMemoryStore {
    institutions: HashMap<String, String>,
    students: Vec<StudentProfile>,
    evaluations: Vec<EvaluationRecord>,
    /// 模拟每次读取的延迟
    latency: Duration,
    /// 查询会失败的 (学生, 阶段写法)
    failing_variants: HashSet<(String, String)>,
    /// 任何作答查询都会失败的学生
    failing_students: HashSet<String>,
    evaluation_queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从数据集构建
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            institutions: dataset
                .institutions
                .into_iter()
                .map(|i| (i.id, i.name))
                .collect(),
            students: dataset.students,
            evaluations: dataset.evaluations,
            ..Default::default()
        }
    }

    pub fn with_institution(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.institutions.insert(id.into(), name.into());
        self
    }

    pub fn with_student(mut self, profile: StudentProfile) -> Self {
        self.students.push(profile);
        self
    }

    pub fn with_evaluation(mut self, record: EvaluationRecord) -> Self {
        self.evaluations.push(record);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 让某个学生的某种阶段写法查询失败
    pub fn with_failing_variant(
        mut self,
        student_id: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        self.failing_variants.insert((student_id.into(), variant.into()));
        self
    }

    /// 让某个学生的所有作答查询失败
    pub fn with_failing_student(mut self, student_id: impl Into<String>) -> Self {
        self.failing_students.insert(student_id.into());
        self
    }

    /// 已执行的作答查询次数
    pub fn evaluation_queries(&self) -> usize {
        self.evaluation_queries.load(Ordering::Relaxed)
    }

    /// 所有在读学生
    pub fn active_students(&self) -> Vec<StudentRef> {
        self.students
            .iter()
            .filter(|s| s.active)
            .map(StudentProfile::to_ref)
            .collect()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
    }
}

impl RecordStore for InMemoryStore {
    fn list_completed_evaluations<'a>(
        &'a self,
        student_id: &'a str,
        phase_variant: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EvaluationRecord>>> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.evaluation_queries.fetch_add(1, Ordering::Relaxed);

            if self.failing_students.contains(student_id)
                || self
                    .failing_variants
                    .contains(&(student_id.to_string(), phase_variant.to_string()))
            {
                return Err(StoreError::query_failed(
                    "list_completed_evaluations",
                    format!("{student_id} / {phase_variant} 不可用"),
                ));
            }

            Ok(self
                .evaluations
                .iter()
                .filter(|e| e.student_id == student_id && e.phase == phase_variant && e.completed)
                .cloned()
                .collect())
        })
    }

    fn list_cohort_students<'a>(
        &'a self,
        cohort: &'a CohortKey,
        active_only: bool,
    ) -> BoxFuture<'a, StoreResult<Vec<StudentRef>>> {
        Box::pin(async move {
            self.simulate_latency().await;
            Ok(self
                .students
                .iter()
                .filter(|s| CohortKey::from(*s) == *cohort && (!active_only || s.active))
                .map(StudentProfile::to_ref)
                .collect())
        })
    }

    fn get_student_profile<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<StudentProfile>> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.students
                .iter()
                .find(|s| s.id == student_id)
                .cloned()
                .ok_or_else(|| StoreError::StudentNotFound {
                    student_id: student_id.to_string(),
                })
        })
    }

    fn get_institution_name<'a>(
        &'a self,
        institution_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<String>> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.institutions
                .get(institution_id)
                .cloned()
                .ok_or_else(|| StoreError::InstitutionNotFound {
                    institution_id: institution_id.to_string(),
                })
        })
    }
}
