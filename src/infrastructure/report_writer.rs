//! 报告组装器 - 基础设施层
//!
//! 版面渲染不在本系统范围内，这里只定义组装器接口，
//! 并提供一个把报告数据写成 JSON 文件的实现

use crate::error::{AppError, AppResult};
use crate::infrastructure::output_pool::OutputResource;
use crate::models::StudentReport;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 报告组装器（外部协作者）
pub trait ReportAssembler: Send + Sync {
    /// 把计分结果组装成可渲染的文档，返回对应的输出资源
    fn assemble<'a>(
        &'a self,
        report: &'a StudentReport,
    ) -> BoxFuture<'a, AppResult<Box<dyn OutputResource>>>;
}

/// 写入 JSON 文件的报告组装器
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    output_dir: PathBuf,
}

impl JsonReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 报告文件路径
    pub fn report_path(&self, report: &StudentReport) -> PathBuf {
        let student: String = report
            .profile
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.output_dir
            .join(format!("{}_fase{}.json", student, report.phase.number()))
    }
}

impl ReportAssembler for JsonReportWriter {
    fn assemble<'a>(
        &'a self,
        report: &'a StudentReport,
    ) -> BoxFuture<'a, AppResult<Box<dyn OutputResource>>> {
        Box::pin(async move {
            fs::create_dir_all(&self.output_dir)
                .await
                .map_err(|e| AppError::file(self.output_dir.display().to_string(), e))?;

            let path = self.report_path(report);
            let body = serde_json::to_vec_pretty(report)?;

            let mut file = File::create(&path)
                .await
                .map_err(|e| AppError::file(path.display().to_string(), e))?;
            file.write_all(&body)
                .await
                .map_err(|e| AppError::file(path.display().to_string(), e))?;
            file.flush()
                .await
                .map_err(|e| AppError::file(path.display().to_string(), e))?;

            let written = JsonReportFile::new(path, file);
            debug!("已写入报告: {}", written.path().display());

            let output: Box<dyn OutputResource> = Box::new(written);
            Ok(output)
        })
    }
}

/// 已写入并保持打开的报告文件
#[derive(Debug)]
pub struct JsonReportFile {
    label: String,
    path: PathBuf,
    handle: Option<File>,
}

impl JsonReportFile {
    fn new(path: PathBuf, handle: File) -> Self {
        Self {
            label: path.display().to_string(),
            path,
            handle: Some(handle),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputResource for JsonReportFile {
    fn label(&self) -> &str {
        &self.label
    }

    fn close(&mut self) {
        self.handle.take();
    }

    fn is_closed(&self) -> bool {
        self.handle.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_file_closes_once() {
        let path = std::env::temp_dir().join(format!("report-file-{}.json", std::process::id()));
        let handle = File::create(&path).await.unwrap();

        let mut report = JsonReportFile::new(path.clone(), handle);
        assert_eq!(report.path(), path.as_path());
        assert_eq!(report.label(), path.display().to_string());
        assert!(!report.is_closed());

        report.close();
        report.close();
        assert!(report.is_closed());

        fs::remove_file(&path).await.unwrap();
    }
}
