//! 批次进度
//!
//! 进度状态只由调度器自己的流程修改，外部通过 watch 通道读取快照

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// 批次状态机：Idle → Running → (Completed | Cancelled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
}

/// 批次进度快照
///
/// 始终满足 `completed == success + errors <= total`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchJobState {
    /// 批次编号，每次提交递增
    pub batch_id: u64,
    pub status: JobStatus,
    pub total: usize,
    pub completed: usize,
    pub success: usize,
    pub errors: usize,
    /// 正在处理的学生（进度显示用）
    pub current_student: Option<String>,
    /// 预计剩余秒数
    pub eta_seconds: Option<f64>,
    pub elapsed_seconds: f64,
    /// 是否已请求取消
    pub cancel_requested: bool,
}

impl BatchJobState {
    /// 完成百分比 [0, 100]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// 剩余时间估计：(已用时 / 已完成) × 剩余数量
pub fn estimate_eta(elapsed: Duration, completed: usize, total: usize) -> Option<f64> {
    if completed == 0 {
        return None;
    }
    let remaining = total.saturating_sub(completed);
    Some(elapsed.as_secs_f64() / completed as f64 * remaining as f64)
}

/// 进度记录器（单写者）
#[derive(Debug)]
pub struct ProgressTracker {
    state: Arc<watch::Sender<BatchJobState>>,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(state: Arc<watch::Sender<BatchJobState>>) -> Self {
        Self {
            state,
            started: Instant::now(),
        }
    }

    /// 当前正在处理的学生
    pub fn set_current(&self, student: &str) {
        self.state.send_modify(|s| s.current_student = Some(student.to_string()));
    }

    /// 记录单个任务完成
    pub fn record(&self, success: bool) {
        let elapsed = self.started.elapsed();
        self.state.send_modify(|s| {
            if success {
                s.success += 1;
            } else {
                s.errors += 1;
            }
            s.completed = s.success + s.errors;
            s.elapsed_seconds = elapsed.as_secs_f64();
            s.eta_seconds = estimate_eta(elapsed, s.completed, s.total);
        });
    }

    pub fn mark_cancel_requested(&self) {
        self.state.send_modify(|s| s.cancel_requested = true);
    }

    /// 进入终态
    pub fn finish(&self, status: JobStatus) -> BatchJobState {
        let elapsed = self.started.elapsed();
        self.state.send_modify(|s| {
            s.status = status;
            s.current_student = None;
            s.eta_seconds = None;
            s.elapsed_seconds = elapsed.as_secs_f64();
        });
        self.state.borrow().clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> BatchJobState {
        self.state.borrow().clone()
    }
}
