//! 基础设施层（Infrastructure Layer）
//!
//! 持有外部资源，只暴露能力：
//! - `RecordStore` - 外部记录存储
//! - `OutputPool` - 有上限的输出资源池
//! - `ReportAssembler` - 报告组装器

pub mod memory_store;
pub mod output_pool;
pub mod record_store;
pub mod report_writer;

pub use memory_store::InMemoryStore;
pub use output_pool::{EvictionPolicy, FifoEviction, OutputPool, OutputResource};
pub use record_store::RecordStore;
pub use report_writer::{JsonReportFile, JsonReportWriter, ReportAssembler};
