//! 报告任务上下文
//!
//! 封装"我正在处理第几个任务、哪个学生、哪个阶段"这一信息

use crate::models::{BatchTask, Phase};
use std::fmt::Display;

/// 报告任务上下文
#[derive(Debug, Clone)]
pub struct ReportCtx {
    /// 任务序号（从1开始，仅用于日志显示）
    pub task_index: usize,

    /// 任务总数
    pub total: usize,

    /// 学生ID
    pub student_id: String,

    /// 学生姓名
    pub student_name: String,

    pub phase: Phase,
}

impl ReportCtx {
    pub fn new(task: &BatchTask, task_index: usize, total: usize) -> Self {
        Self {
            task_index,
            total,
            student_id: task.student.id.clone(),
            student_name: task.student.name.clone(),
            phase: task.phase,
        }
    }
}

impl Display for ReportCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[任务 {}/{} {} {}]",
            self.task_index, self.total, self.student_name, self.phase
        )
    }
}
