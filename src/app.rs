//! 应用入口 - 离线批量导出
//!
//! 加载数据集 → 为所有在读学生 × 所选阶段提交一个批次 → 等待完成。
//! Ctrl-C 请求取消，已派发的任务会照常完成。

use crate::config::Config;
use crate::infrastructure::{InMemoryStore, JsonReportWriter};
use crate::models::load_dataset;
use crate::orchestrator::{BatchExporter, BatchOutcome};
use crate::utils::logging;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<InMemoryStore>,
    exporter: BatchExporter,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        let options = config.scheduler();
        logging::log_startup(options.batch_size, options.worker_count);

        info!("\n📁 正在加载数据集: {}", config.dataset_path);
        let dataset = load_dataset(Path::new(&config.dataset_path)).await?;
        let store = Arc::new(InMemoryStore::from_dataset(dataset));

        let assembler = Arc::new(JsonReportWriter::new(&config.output_dir));
        let exporter = BatchExporter::new(store.clone(), assembler, &config);

        Ok(Self {
            config,
            store,
            exporter,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<Option<BatchOutcome>> {
        let students = self.store.active_students();
        if students.is_empty() {
            warn!("⚠️ 数据集中没有在读学生，程序结束");
            return Ok(None);
        }

        let phases = self.config.selected_phases()?;
        let handle = self
            .exporter
            .submit_batch(students, phases)
            .context("提交导出批次失败")?;

        let token = handle.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏹️ 收到 Ctrl-C，当前组完成后停止");
                token.cancel();
            }
        });

        let outcome = handle.wait().await?;
        info!(
            "📂 报告目录: {} (保留 {} 个输出)",
            self.config.output_dir,
            outcome.outputs.len()
        );
        Ok(Some(outcome))
    }
}
