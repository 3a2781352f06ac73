use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 本地存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 远端写入错误
    #[error("远端错误: {0}")]
    Remote(#[from] RemoteError),
    /// 提交数据校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取文档失败
    #[error("读取文档失败 ({key}): {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文档失败
    #[error("写入文档失败 ({key}): {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 删除文档失败
    #[error("删除文档失败 ({key}): {source}")]
    DeleteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("序列化文档失败 ({key}): {source}")]
    EncodeFailed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// 存储锁已中毒
    #[error("存储锁已中毒: {0}")]
    Poisoned(String),
}

/// 远端写入错误
///
/// 只描述"远端说了什么"，如何归类交给 `FailureClassifier`
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// 请求未到达远端（断网、DNS、超时等）
    #[error("网络请求失败: {message}")]
    Transport { message: String },
    /// 远端返回了非 2xx 响应
    #[error("远端拒绝写入 (status={status}, code={code:?}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        RemoteError::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        RemoteError::Rejected {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Rejected { status, .. } => Some(*status),
            RemoteError::Transport { .. } => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::Rejected { code, .. } => code.as_deref(),
            RemoteError::Transport { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RemoteError::Rejected { message, .. } | RemoteError::Transport { message } => message,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::transport(err.to_string())
    }
}

/// 提交数据校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 学生姓名为空
    #[error("学生姓名不能为空")]
    EmptyStudentName,
    /// 班级ID为空
    #[error("班级ID不能为空")]
    EmptySectionId,
    /// 测验ID为空
    #[error("测验ID不能为空")]
    EmptyQuizId,
    /// 成绩不是有限数值（NaN / 无穷大无法写入 JSON）
    #[error("成绩必须是有限数值，实际为 {value}")]
    InvalidScore { value: String },
    /// 条目所属测验与提交不一致
    #[error("条目测验ID {found} 与提交测验ID {expected} 不一致")]
    QuizIdMismatch { expected: String, found: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必填配置缺失
    #[error("缺少必填配置 {var_name}")]
    Missing { var_name: String },
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
