/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use crate::orchestrator::{BatchJobState, BatchSummary, JobStatus};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，详细模式下为 debug。重复调用是安全的。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `batch_size`: 每组任务数
/// - `worker_count`: 工作协程数
pub fn log_startup(batch_size: usize, worker_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量报告导出模式");
    info!("📊 每组任务数: {} | 工作协程数: {}", batch_size, worker_count);
    info!("{}", "=".repeat(60));
}

/// 记录任务生成信息
pub fn log_tasks_loaded(total: usize, batch_size: usize, worker_count: usize) {
    info!("✓ 共生成 {} 个导出任务", total);
    info!("📋 将以每组 {} 个的方式处理 ({} 个工作协程)", batch_size, worker_count);
    info!("💡 每组完成后再开始下一组\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 组编号
/// - `total_batches`: 组总数
/// - `start`: 起始任务编号
/// - `end`: 结束任务编号
/// - `total`: 任务总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 组", batch_num, total_batches);
    info!("📄 本组任务: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 组完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 记录进度
pub fn log_progress(state: &BatchJobState) {
    let eta = match state.eta_seconds {
        Some(seconds) => format!("{:.0} 秒", seconds),
        None => "--".to_string(),
    };
    let current = state
        .current_student
        .as_deref()
        .map(|name| truncate_text(name, 24))
        .unwrap_or_default();
    info!(
        "⏳ 进度 {}/{} ({:.0}%) | 成功 {} | 失败 {} | 预计剩余 {} | {}",
        state.completed,
        state.total,
        state.percent(),
        state.success,
        state.errors,
        eta,
        current
    );
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &BatchSummary) {
    info!("\n{}", "=".repeat(60));
    match summary.status {
        JobStatus::Cancelled => info!("⏹️ 导出已取消（部分完成）"),
        _ => info!("📊 全部处理完成统计"),
    }
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.success, summary.total);
    info!("❌ 失败: {}", summary.errors);
    if summary.is_partial() {
        info!("⏭️ 未处理: {}", summary.total - summary.completed);
    }
    info!("⏱️ 用时: {:.1} 秒", summary.elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
