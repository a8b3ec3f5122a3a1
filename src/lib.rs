//! # Score Report Export
//!
//! 标准化考试的计分、排名与批量报告导出
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源，只暴露能力
//! - `RecordStore` - 外部记录存储（作答记录、同学范围、学生档案、机构）
//! - `ReportAssembler` - 报告组装器，产生输出资源
//! - `OutputPool` - 有上限的输出资源池，可替换淘汰策略
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个学生单个阶段
//! - `EvaluationResolver` - 合并阶段写法、每科保留最佳记录
//! - `ScoringEngine` - 加权总分、完成度、百分位档、行为指标
//! - `RankingService` - 同学范围内的总分与单科排名
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份报告"的完整处理流程
//! - `ReportCtx` - 上下文封装（任务序号 + 学生 + 阶段）
//! - `ReportFlow` - 流程编排（resolve → score → rank → assemble）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_exporter` - 批量导出调度器，管理分组、取消和资源上限
//! - `orchestrator/worker_pool` - 固定数量的工作协程
//! - `orchestrator/progress` - 进度状态与剩余时间估计
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::{Config, SchedulerOptions};
pub use error::{AppError, AppResult, ExportError, StoreError};
pub use infrastructure::{InMemoryStore, OutputPool, OutputResource, RecordStore, ReportAssembler};
pub use models::{
    BatchTask, CanonicalSubject, EvaluationRecord, Phase, PhaseMetrics, RankResult, StudentRef,
};
pub use orchestrator::{
    BatchExporter, BatchHandle, BatchJobState, BatchOutcome, BatchSummary, JobStatus,
};
pub use services::{EvaluationResolver, RankingService, ScoringEngine};
pub use workflow::{ReportCtx, ReportFlow};
