//! 工作池 - 编排层
//!
//! 固定数量的工作协程从有界队列中取任务，结果通过另一个队列交回调度器。
//! 并发上限就是工作协程数量。

use crate::error::{AppError, AppResult, ExportError};
use crate::infrastructure::OutputResource;
use crate::models::BatchTask;
use crate::workflow::{ReportCtx, ReportFlow};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// 派发给工作协程的任务
#[derive(Debug)]
pub struct Job {
    /// 在整个批次中的序号（从0开始）
    pub index: usize,
    pub total: usize,
    pub task: BatchTask,
}

/// 单个任务的结果
#[derive(Debug)]
pub struct TaskOutcome {
    pub index: usize,
    pub task: BatchTask,
    pub result: AppResult<Box<dyn OutputResource>>,
    pub elapsed: Duration,
}

/// 工作池
pub struct WorkerPool {
    jobs: mpsc::Sender<Job>,
    outcomes: mpsc::Receiver<TaskOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// 启动工作池
    ///
    /// # 参数
    /// - `worker_count`: 工作协程数量
    /// - `queue_capacity`: 任务队列容量
    /// - `flow`: 报告生成流程
    /// - `task_timeout`: 单个任务超时，None 表示不限时
    pub fn spawn(
        worker_count: usize,
        queue_capacity: usize,
        flow: Arc<ReportFlow>,
        task_timeout: Option<Duration>,
    ) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>(queue_capacity.max(1));
        let (outcomes_tx, outcomes_rx) = mpsc::channel::<TaskOutcome>(queue_capacity.max(1));
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));

        let workers = (0..worker_count.max(1))
            .map(|worker_id| {
                let jobs_rx = jobs_rx.clone();
                let outcomes_tx = outcomes_tx.clone();
                let flow = flow.clone();
                tokio::spawn(async move {
                    loop {
                        let job = {
                            let mut rx = jobs_rx.lock().await;
                            rx.recv().await
                        };
                        let Some(job) = job else {
                            break;
                        };
                        debug!("工作协程 #{} 接到任务 {}", worker_id, job.index + 1);
                        let outcome = run_job(job, flow.clone(), task_timeout).await;
                        if outcomes_tx.send(outcome).await.is_err() {
                            break;
                        }
                    }
                    debug!("工作协程 #{} 退出", worker_id);
                })
            })
            .collect();

        Self {
            jobs: jobs_tx,
            outcomes: outcomes_rx,
            workers,
        }
    }

    /// 派发任务；队列已关闭时原样返回任务
    pub async fn dispatch(&self, job: Job) -> Result<(), Job> {
        self.jobs.send(job).await.map_err(|e| e.0)
    }

    /// 等待下一个完成的任务
    pub async fn next_outcome(&mut self) -> Option<TaskOutcome> {
        self.outcomes.recv().await
    }

    /// 关闭队列并等待所有工作协程退出
    pub async fn shutdown(self) {
        let WorkerPool {
            jobs,
            outcomes,
            workers,
        } = self;
        drop(jobs);
        drop(outcomes);
        for worker in workers {
            if let Err(e) = worker.await {
                error!("工作协程异常退出: {}", e);
            }
        }
    }
}

/// 在独立任务中运行流程，任务 panic 或超时都转换为错误
async fn run_job(job: Job, flow: Arc<ReportFlow>, task_timeout: Option<Duration>) -> TaskOutcome {
    let started = Instant::now();
    let ctx = ReportCtx::new(&job.task, job.index + 1, job.total);
    let label = ctx.to_string();

    let mut handle = tokio::spawn(async move { flow.run(&ctx).await });

    let result = match task_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => flatten(joined),
            Err(_) => {
                handle.abort();
                Err(AppError::Export(ExportError::TimedOut {
                    label,
                    seconds: limit.as_secs(),
                }))
            }
        },
        None => flatten(handle.await),
    };

    TaskOutcome {
        index: job.index,
        task: job.task,
        result,
        elapsed: started.elapsed(),
    }
}

fn flatten<T>(joined: Result<AppResult<T>, tokio::task::JoinError>) -> AppResult<T> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(AppError::Export(ExportError::WorkerFailed(e.to_string()))),
    }
}
