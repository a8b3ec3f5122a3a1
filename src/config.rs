use crate::error::ConfigError;
use crate::models::Phase;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每组同时启动的任务数量
    pub batch_size: usize,
    /// 工作协程数量（0 表示与 batch_size 相同）
    pub worker_count: usize,
    /// 组内任务启动间隔（毫秒）
    pub task_start_interval_ms: u64,
    /// 组与组之间的间隔（毫秒）
    pub batch_interval_ms: u64,
    /// 同时保留的输出资源上限
    pub max_open_outputs: usize,
    /// 单个任务超时（秒），None 表示不限时
    pub task_timeout_secs: Option<u64>,
    /// 计算同学排名时的并发查询数
    pub cohort_concurrency: usize,
    /// 排名时是否将 0 分视为未作答
    pub exclude_zero_scores_from_rank: bool,
    /// 数据集 TOML 文件
    pub dataset_path: String,
    /// 报告输出目录
    pub output_dir: String,
    /// 要导出的阶段（任意写法）
    pub phases: Vec<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 3,
            worker_count: 0,
            task_start_interval_ms: 300,
            batch_interval_ms: 1500,
            max_open_outputs: 10,
            task_timeout_secs: None,
            cohort_concurrency: 4,
            exclude_zero_scores_from_rank: false,
            dataset_path: "dataset.toml".to_string(),
            output_dir: "reports".to_string(),
            phases: vec!["Fase I".to_string(), "Fase II".to_string(), "Fase III".to_string()],
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            batch_size: env_parse("BATCH_SIZE").unwrap_or(default.batch_size),
            worker_count: env_parse("WORKER_COUNT").unwrap_or(default.worker_count),
            task_start_interval_ms: env_parse("TASK_START_INTERVAL_MS")
                .unwrap_or(default.task_start_interval_ms),
            batch_interval_ms: env_parse("BATCH_INTERVAL_MS").unwrap_or(default.batch_interval_ms),
            max_open_outputs: env_parse("MAX_OPEN_OUTPUTS").unwrap_or(default.max_open_outputs),
            task_timeout_secs: env_parse("TASK_TIMEOUT_SECS").or(default.task_timeout_secs),
            cohort_concurrency: env_parse("COHORT_CONCURRENCY")
                .unwrap_or(default.cohort_concurrency),
            exclude_zero_scores_from_rank: env_parse("EXCLUDE_ZERO_SCORES_FROM_RANK")
                .unwrap_or(default.exclude_zero_scores_from_rank),
            dataset_path: std::env::var("DATASET_PATH").unwrap_or(default.dataset_path),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            phases: std::env::var("PHASES")
                .map(|v| {
                    v.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(default.phases),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    /// 从 TOML 文件加载配置，缺省字段取默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.max_open_outputs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_open_outputs".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.cohort_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cohort_concurrency".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 解析要导出的阶段，无法识别的写法报错
    pub fn selected_phases(&self) -> Result<Vec<Phase>, ConfigError> {
        self.phases
            .iter()
            .map(|label| {
                Phase::parse(label).ok_or_else(|| ConfigError::InvalidValue {
                    field: "phases".to_string(),
                    reason: format!("无法识别的阶段: {}", label),
                })
            })
            .collect()
    }

    /// 调度器参数
    pub fn scheduler(&self) -> SchedulerOptions {
        SchedulerOptions {
            batch_size: self.batch_size.max(1),
            worker_count: if self.worker_count == 0 {
                self.batch_size.max(1)
            } else {
                self.worker_count
            },
            task_start_interval: Duration::from_millis(self.task_start_interval_ms),
            batch_interval: Duration::from_millis(self.batch_interval_ms),
            max_open_outputs: self.max_open_outputs.max(1),
            task_timeout: self.task_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// 批量导出调度参数
#[derive(Clone, Debug)]
pub struct SchedulerOptions {
    pub batch_size: usize,
    pub worker_count: usize,
    pub task_start_interval: Duration,
    pub batch_interval: Duration,
    pub max_open_outputs: usize,
    pub task_timeout: Option<Duration>,
}

impl SchedulerOptions {
    /// 无任何间隔的参数（测试与离线导出使用）
    pub fn unpaced(batch_size: usize) -> Self {
        Self {
            batch_size,
            worker_count: batch_size,
            task_start_interval: Duration::ZERO,
            batch_interval: Duration::ZERO,
            max_open_outputs: 10,
            task_timeout: None,
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Config::default().scheduler()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
