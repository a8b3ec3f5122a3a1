//! 批量报告导出调度器 - 编排层
//!
//! ## 职责
//!
//! 驱动大量相互独立的 (学生, 阶段) 报告任务，控制吞吐并汇报进度。
//!
//! ## 核心功能
//!
//! 1. **输入校验**：学生或阶段为空时同步拒绝
//! 2. **分组调度**：任务按固定大小分组，组内任务间隔启动，整组完成后再开始下一组
//! 3. **并发控制**：固定数量的工作协程 + 有界任务队列
//! 4. **协作式取消**：每组开始前检查取消令牌，已派发的任务照常完成
//! 5. **资源上限**：输出资源按到达顺序保留，超出上限时淘汰最旧的
//! 6. **进度统计**：每个任务完成后更新计数和剩余时间估计
//!
//! ## 设计特点
//!
//! - 进度状态由调度器独占写入，外部只读快照
//! - 单个任务失败只计入错误数，不影响同组其他任务

use crate::config::{Config, SchedulerOptions};
use crate::error::{AppError, AppResult, ExportError};
use crate::infrastructure::{
    EvictionPolicy, FifoEviction, OutputPool, OutputResource, RecordStore, ReportAssembler,
};
use crate::models::{BatchTask, Phase, StudentRef};
use crate::orchestrator::progress::{BatchJobState, JobStatus, ProgressTracker};
use crate::orchestrator::worker_pool::{Job, TaskOutcome, WorkerPool};
use crate::utils::logging;
use crate::workflow::ReportFlow;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type PolicyFactory = Arc<dyn Fn() -> Box<dyn EvictionPolicy> + Send + Sync>;

/// 批次最终统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub status: JobStatus,
    pub total: usize,
    pub completed: usize,
    pub success: usize,
    pub errors: usize,
    /// 因超出上限被关闭的输出资源数
    pub evicted_outputs: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// 是否只完成了部分任务
    pub fn is_partial(&self) -> bool {
        self.completed < self.total
    }
}

impl Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "成功 {} / 失败 {} / 共 {} (已完成 {}), 用时 {:.1} 秒",
            self.success,
            self.errors,
            self.total,
            self.completed,
            self.elapsed.as_secs_f64()
        )?;
        if self.status == JobStatus::Cancelled {
            write!(f, " [已取消，未处理 {} 个]", self.total - self.completed)?;
        }
        Ok(())
    }
}

/// 批次运行结果：统计 + 仍保留的输出资源
#[derive(Debug)]
pub struct BatchOutcome {
    pub summary: BatchSummary,
    pub outputs: Vec<Box<dyn OutputResource>>,
}

struct ExporterInner {
    flow: Arc<ReportFlow>,
    options: SchedulerOptions,
    state: Arc<watch::Sender<BatchJobState>>,
    policy: PolicyFactory,
}

/// 批量报告导出器
///
/// 同一时间只运行一个批次
#[derive(Clone)]
pub struct BatchExporter {
    inner: Arc<ExporterInner>,
}

impl BatchExporter {
    /// 使用配置创建导出器
    pub fn new(
        store: Arc<dyn RecordStore>,
        assembler: Arc<dyn ReportAssembler>,
        config: &Config,
    ) -> Self {
        let flow = Arc::new(ReportFlow::new(store, assembler, config));
        Self::with_flow(flow, config.scheduler())
    }

    pub fn with_flow(flow: Arc<ReportFlow>, options: SchedulerOptions) -> Self {
        let (state, _) = watch::channel(BatchJobState::default());
        Self {
            inner: Arc::new(ExporterInner {
                flow,
                options,
                state: Arc::new(state),
                policy: Arc::new(|| Box::new(FifoEviction) as Box<dyn EvictionPolicy>),
            }),
        }
    }

    /// 替换输出资源淘汰策略（每个批次创建一个新实例）
    pub fn with_eviction_policy<F>(self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn EvictionPolicy> + Send + Sync + 'static,
    {
        let inner = ExporterInner {
            flow: self.inner.flow.clone(),
            options: self.inner.options.clone(),
            state: self.inner.state.clone(),
            policy: Arc::new(factory),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// 提交批次（立即返回，进度通过句柄或 `get_progress` 观察）
    pub fn submit_batch(
        &self,
        students: Vec<StudentRef>,
        phases: Vec<Phase>,
    ) -> AppResult<BatchHandle> {
        self.submit_batch_with_cancellation(students, phases, CancellationToken::new())
    }

    /// 使用调用方提供的取消令牌提交批次
    pub fn submit_batch_with_cancellation(
        &self,
        students: Vec<StudentRef>,
        phases: Vec<Phase>,
        cancel: CancellationToken,
    ) -> AppResult<BatchHandle> {
        if students.is_empty() {
            return Err(ExportError::NoStudentsSelected.into());
        }
        let mut unique_phases: Vec<Phase> = Vec::with_capacity(phases.len());
        for phase in phases {
            if !unique_phases.contains(&phase) {
                unique_phases.push(phase);
            }
        }
        if unique_phases.is_empty() {
            return Err(ExportError::NoPhasesSelected.into());
        }

        let tasks = BatchTask::cross_product(&students, &unique_phases);
        let total = tasks.len();

        let mut accepted = None;
        self.inner.state.send_if_modified(|state| {
            if state.status == JobStatus::Running {
                return false;
            }
            let batch_id = state.batch_id + 1;
            *state = BatchJobState {
                batch_id,
                status: JobStatus::Running,
                total,
                ..Default::default()
            };
            accepted = Some(batch_id);
            true
        });
        let Some(batch_id) = accepted else {
            return Err(ExportError::AlreadyRunning.into());
        };

        let progress = self.inner.state.subscribe();
        let inner = self.inner.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            let state = inner.state.clone();
            let run = run_batch(inner, tasks, token.clone());
            tokio::pin!(run);
            // 令牌可能由句柄以外的组件取消，进度里的取消标记要立即可见
            tokio::select! {
                outcome = &mut run => outcome,
                _ = token.cancelled() => {
                    mark_cancel_requested(&state, batch_id);
                    run.await
                }
            }
        });

        Ok(BatchHandle {
            batch_id,
            cancel,
            state: self.inner.state.clone(),
            progress,
            join,
        })
    }

    /// 当前进度快照
    pub fn get_progress(&self) -> BatchJobState {
        self.inner.state.borrow().clone()
    }

    /// 订阅进度变化
    pub fn subscribe(&self) -> watch::Receiver<BatchJobState> {
        self.inner.state.subscribe()
    }
}

/// 正在运行的批次句柄
#[derive(Debug)]
pub struct BatchHandle {
    batch_id: u64,
    cancel: CancellationToken,
    state: Arc<watch::Sender<BatchJobState>>,
    progress: watch::Receiver<BatchJobState>,
    join: JoinHandle<BatchOutcome>,
}

impl BatchHandle {
    /// 请求取消；进度立即带上取消标记，调度在下一组开始前停止
    pub fn cancel_batch(&self) {
        self.cancel.cancel();
        mark_cancel_requested(&self.state, self.batch_id);
    }

    /// 取消令牌（可交给其他组件）
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn get_progress(&self) -> BatchJobState {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchJobState> {
        self.progress.clone()
    }

    /// 等待批次结束
    pub async fn wait(self) -> AppResult<BatchOutcome> {
        self.join
            .await
            .map_err(|e| AppError::Export(ExportError::WorkerFailed(e.to_string())))
    }
}

/// 在本批次仍在运行时设置取消标记
fn mark_cancel_requested(state: &watch::Sender<BatchJobState>, batch_id: u64) {
    state.send_if_modified(|s| {
        if s.batch_id != batch_id || s.status != JobStatus::Running || s.cancel_requested {
            return false;
        }
        s.cancel_requested = true;
        true
    });
}

/// 运行整个批次
async fn run_batch(
    inner: Arc<ExporterInner>,
    tasks: Vec<BatchTask>,
    cancel: CancellationToken,
) -> BatchOutcome {
    let options = &inner.options;
    let batch_size = options.batch_size.max(1);
    let total = tasks.len();
    let total_groups = total.div_ceil(batch_size);
    let tracker = ProgressTracker::new(inner.state.clone());
    let mut outputs = OutputPool::with_policy(options.max_open_outputs, (inner.policy)());
    let mut pool = WorkerPool::spawn(
        options.worker_count,
        batch_size,
        inner.flow.clone(),
        options.task_timeout,
    );

    logging::log_tasks_loaded(total, batch_size, options.worker_count);

    let mut cancelled = false;
    for (group_index, group) in tasks.chunks(batch_size).enumerate() {
        if group_index > 0 && pause(options.batch_interval, &cancel).await {
            info!("⏹️ 组间等待时收到取消请求");
        }
        if cancel.is_cancelled() {
            cancelled = true;
            tracker.mark_cancel_requested();
            warn!("⏹️ 收到取消请求，停止调度剩余 {} 组", total_groups - group_index);
            break;
        }

        let first = group_index * batch_size;
        logging::log_batch_start(
            group_index + 1,
            total_groups,
            first + 1,
            first + group.len(),
            total,
        );

        let mut dispatched = 0;
        for (offset, task) in group.iter().enumerate() {
            if offset > 0 && !options.task_start_interval.is_zero() {
                tokio::time::sleep(options.task_start_interval).await;
            }
            tracker.set_current(&task.student.name);
            let job = Job {
                index: first + offset,
                total,
                task: task.clone(),
            };
            match pool.dispatch(job).await {
                Ok(()) => dispatched += 1,
                Err(job) => {
                    error!("[任务 {}] ❌ 工作池已关闭，无法派发: {}", job.index + 1, job.task);
                    tracker.record(false);
                }
            }
        }

        let mut group_success = 0;
        for _ in 0..dispatched {
            let Some(outcome) = pool.next_outcome().await else {
                error!("工作池提前关闭，本组剩余任务无法完成");
                break;
            };
            if settle(outcome, &tracker, &mut outputs) {
                group_success += 1;
            }
        }

        logging::log_batch_complete(group_index + 1, group_success, group.len());
    }

    pool.shutdown().await;

    if cancel.is_cancelled() {
        tracker.mark_cancel_requested();
    }
    let status = if cancelled {
        JobStatus::Cancelled
    } else {
        JobStatus::Completed
    };
    let final_state = tracker.finish(status);
    let summary = BatchSummary {
        status,
        total,
        completed: final_state.completed,
        success: final_state.success,
        errors: final_state.errors,
        evicted_outputs: outputs.evicted(),
        elapsed: tracker.elapsed(),
    };
    logging::print_final_stats(&summary);

    BatchOutcome {
        summary,
        outputs: outputs.into_retained(),
    }
}

/// 记录单个任务结果，返回是否成功
fn settle(outcome: TaskOutcome, tracker: &ProgressTracker, outputs: &mut OutputPool) -> bool {
    let TaskOutcome {
        index,
        task,
        result,
        elapsed,
    } = outcome;

    match result {
        Ok(output) => {
            tracker.record(true);
            outputs.admit(output);
            logging::log_progress(&tracker.snapshot());
            tracing::debug!("[任务 {}] 用时 {:.2} 秒", index + 1, elapsed.as_secs_f64());
            true
        }
        Err(e) => {
            tracker.record(false);
            error!("[任务 {}] ❌ {} 处理失败: {}", index + 1, task, e);
            logging::log_progress(&tracker.snapshot());
            false
        }
    }
}

/// 组间等待，收到取消请求时提前结束；返回是否被取消打断
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}
