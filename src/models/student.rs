//! 学生与机构模型

use crate::models::metrics::{PhaseMetrics, PriorPhaseSnapshot, RankResult, SubjectScoreEntry};
use crate::models::phase::Phase;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 界面选择的学生引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentRef {
    pub id: String,
    pub name: String,
}

impl StudentRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// 学生档案（报告表头）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: String,
    pub name: String,
    /// 证件号
    pub id_number: String,
    pub institution_id: String,
    pub campus_id: String,
    pub grade_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl StudentProfile {
    pub fn to_ref(&self) -> StudentRef {
        StudentRef::new(self.id.clone(), self.name.clone())
    }
}

/// 同学范围：同机构、同校区、同年级
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CohortKey {
    pub institution_id: String,
    pub campus_id: String,
    pub grade_id: String,
}

impl From<&StudentProfile> for CohortKey {
    fn from(profile: &StudentProfile) -> Self {
        Self {
            institution_id: profile.institution_id.clone(),
            campus_id: profile.campus_id.clone(),
            grade_id: profile.grade_id.clone(),
        }
    }
}

/// 批量导出中的一个任务：(学生, 阶段)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTask {
    pub student: StudentRef,
    pub phase: Phase,
}

impl BatchTask {
    /// 学生 × 阶段的笛卡尔积，保持学生顺序，阶段嵌套在学生内
    pub fn cross_product(students: &[StudentRef], phases: &[Phase]) -> Vec<BatchTask> {
        students
            .iter()
            .flat_map(|student| {
                phases.iter().map(move |phase| BatchTask {
                    student: student.clone(),
                    phase: *phase,
                })
            })
            .collect()
    }
}

impl Display for BatchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.student.name, self.phase)
    }
}

/// 交给报告组装器的完整数据
#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    pub profile: StudentProfile,
    pub institution_name: String,
    pub phase: Phase,
    pub metrics: PhaseMetrics,
    /// 按标准科目顺序排列
    pub subjects: Vec<SubjectScoreEntry>,
    pub global_rank: RankResult,
    /// 仅最终阶段报告提供
    pub prior_phases: Vec<PriorPhaseSnapshot>,
    pub generated_at: DateTime<Local>,
}
