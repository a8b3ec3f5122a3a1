//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_exporter` - 批量报告导出调度器
//! - 生成 (学生 × 阶段) 任务
//! - 分组、间隔启动、组间等待
//! - 协作式取消
//! - 输出资源上限
//! - 进度与最终统计
//!
//! ### `worker_pool` - 工作池
//! - 固定数量的工作协程
//! - 有界任务队列
//! - 可选的单任务超时
//!
//! ### `progress` - 批次进度
//! - 状态机与计数器
//! - 剩余时间估计
//!
//! ## 层次关系
//!
//! ```text
//! batch_exporter (处理 Vec<BatchTask>)
//!     ↓
//! worker_pool (并发执行)
//!     ↓
//! workflow::ReportFlow (处理单个学生单个阶段)
//!     ↓
//! services (能力层：resolve / score / rank)
//!     ↓
//! infrastructure (基础设施：RecordStore / ReportAssembler / OutputPool)
//! ```

pub mod batch_exporter;
pub mod progress;
pub mod worker_pool;

// 重新导出主要类型
pub use batch_exporter::{BatchExporter, BatchHandle, BatchOutcome, BatchSummary};
pub use progress::{BatchJobState, JobStatus};
