//! 作答记录模型
//!
//! 一条记录对应一名学生在某阶段某科目的一次已完成作答。
//! 历史数据的分数有三种编码，按优先级依次取用。

use crate::models::subject::{normalize, CanonicalSubject};
use serde::{Deserialize, Serialize};

/// 单题作答情况
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionOutcome {
    /// 是否作答
    pub answered: bool,
    /// 是否正确
    pub correct: bool,
    /// 用时（秒）
    pub time_spent_secs: Option<f64>,
}

/// 已完成的作答记录（只读输入）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationRecord {
    /// 记录ID
    pub id: String,
    /// 学生ID
    pub student_id: String,
    /// 原始科目名称
    pub subject: String,
    /// 原始阶段写法
    pub phase: String,
    /// 显式的总体百分比
    pub overall_percentage: Option<f64>,
    /// 答对题数
    pub correct_answers: Option<u32>,
    /// 总题数
    pub total_questions: Option<u32>,
    /// 逐题作答情况
    pub answers: Vec<QuestionOutcome>,
    /// 切换标签页次数
    pub tab_change_count: u32,
    /// 是否因切换标签页被锁定
    pub locked_by_tab_change: bool,
    /// 是否已完成
    pub completed: bool,
}

impl EvaluationRecord {
    /// 归一化后的标准科目
    pub fn canonical_subject(&self) -> Option<CanonicalSubject> {
        normalize(&self.subject).canonical()
    }

    /// 计算该记录的百分比
    ///
    /// 优先级：显式百分比 > 答对数/总题数 > 逐题正确率，都没有则为 0
    pub fn percentage(&self) -> f64 {
        if let Some(pct) = self.overall_percentage {
            return pct;
        }

        if let (Some(correct), Some(total)) = (self.correct_answers, self.total_questions) {
            if total > 0 {
                return f64::from(correct) / f64::from(total) * 100.0;
            }
        }

        if !self.answers.is_empty() {
            let correct = self.answers.iter().filter(|a| a.correct).count();
            return correct as f64 / self.answers.len() as f64 * 100.0;
        }

        0.0
    }

    /// 题目数量
    pub fn question_count(&self) -> u32 {
        match self.total_questions {
            Some(total) if total > 0 => total,
            _ => self.answers.len() as u32,
        }
    }

    /// 是否有作弊嫌疑
    pub fn is_suspicious(&self) -> bool {
        self.tab_change_count > 0 || self.locked_by_tab_change
    }
}
