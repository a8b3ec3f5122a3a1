use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 外部记录存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 导出任务错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 外部记录存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 查询失败
    #[error("查询 {operation} 失败: {message}")]
    QueryFailed { operation: String, message: String },
    /// 学生不存在
    #[error("学生不存在: {student_id}")]
    StudentNotFound { student_id: String },
    /// 机构不存在
    #[error("机构不存在: {institution_id}")]
    InstitutionNotFound { institution_id: String },
    /// 所有阶段拼写都查询失败
    #[error("学生 {student_id} 的阶段 {phase} 所有拼写均查询失败 ({attempts} 次)")]
    AllVariantsFailed {
        student_id: String,
        phase: String,
        attempts: usize,
    },
}

/// 导出任务错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 未选择学生
    #[error("未选择任何学生")]
    NoStudentsSelected,
    /// 未选择阶段
    #[error("未选择任何阶段")]
    NoPhasesSelected,
    /// 已有批次正在运行
    #[error("已有导出批次正在运行")]
    AlreadyRunning,
    /// 没有任何已完成的科目，无法生成报告
    #[error("学生 {student_id} 在 {phase} 没有任何已完成的科目")]
    NoEvaluations { student_id: String, phase: String },
    /// 报告组装失败
    #[error("报告组装失败 ({student_id}): {message}")]
    AssemblyFailed { student_id: String, message: String },
    /// 任务超时
    #[error("任务超时 ({label}), 超过 {seconds} 秒")]
    TimedOut { label: String, seconds: u64 },
    /// 工作线程异常退出
    #[error("工作线程异常退出: {0}")]
    WorkerFailed(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置项取值非法
    #[error("配置项 {field} 非法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件操作错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }

    /// 创建报告组装失败错误
    pub fn assembly_failed(student_id: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Export(ExportError::AssemblyFailed {
            student_id: student_id.into(),
            message: message.into(),
        })
    }
}

impl StoreError {
    /// 创建查询失败错误
    pub fn query_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::QueryFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 存储层结果类型
pub type StoreResult<T> = Result<T, StoreError>;
