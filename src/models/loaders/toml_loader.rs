use crate::models::evaluation::EvaluationRecord;
use crate::models::student::StudentProfile;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 机构
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstitutionRecord {
    pub id: String,
    pub name: String,
}

/// 离线数据集（学生、机构、作答记录）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub institutions: Vec<InstitutionRecord>,
    pub students: Vec<StudentProfile>,
    pub evaluations: Vec<EvaluationRecord>,
}

/// 从 TOML 文件加载数据集
pub async fn load_dataset(path: &Path) -> Result<Dataset> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取数据集文件: {}", path.display()))?;

    let dataset: Dataset = toml::from_str(&content)
        .with_context(|| format!("无法解析数据集文件: {}", path.display()))?;

    tracing::info!(
        "成功加载数据集: {} 个机构, {} 名学生, {} 条作答记录",
        dataset.institutions.len(),
        dataset.students.len(),
        dataset.evaluations.len()
    );

    let orphans = dataset
        .evaluations
        .iter()
        .filter(|e| !dataset.students.iter().any(|s| s.id == e.student_id))
        .count();
    if orphans > 0 {
        tracing::warn!("⚠️ {} 条作答记录找不到对应学生", orphans);
    }

    Ok(dataset)
}
