use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 持久化键的命名空间，文档键为 `<namespace>.pendingSubmissions.v1`
    pub namespace: String,
    /// 本地存储目录
    pub storage_dir: String,
    /// 待入队的答题文件目录
    pub inbox_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 远端存储配置 ---
    pub remote_base_url: String,
    pub remote_anon_key: String,
    pub token_file: String,
    pub performance_table: String,
    pub responses_table: String,
    pub request_timeout_secs: u64,
    // --- 同步策略 ---
    /// 连通性探测间隔
    pub probe_interval_secs: u64,
    /// 单次探测的连接超时
    pub probe_timeout_secs: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// 达到该失败次数后进入死信，0（默认）表示一直重试
    pub max_attempts: u32,
    pub dead_letter_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "quizapp".to_string(),
            storage_dir: "outbox_data".to_string(),
            inbox_folder: "inbox".to_string(),
            verbose_logging: false,
            remote_base_url: "http://localhost:54321".to_string(),
            remote_anon_key: String::new(),
            token_file: "session_token.txt".to_string(),
            performance_table: "quiz_performance".to_string(),
            responses_table: "quiz_responses".to_string(),
            request_timeout_secs: 30,
            probe_interval_secs: 15,
            probe_timeout_secs: 3,
            backoff_base_ms: 2_000,
            backoff_max_ms: 300_000,
            max_attempts: 0,
            dead_letter_file: "dead_letter.jsonl".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Self {
            namespace: std::env::var("SYNC_NAMESPACE").unwrap_or(default.namespace),
            storage_dir: std::env::var("STORAGE_DIR").unwrap_or(default.storage_dir),
            inbox_folder: std::env::var("INBOX_FOLDER").unwrap_or(default.inbox_folder),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging)?,
            remote_base_url: std::env::var("REMOTE_BASE_URL").unwrap_or(default.remote_base_url),
            remote_anon_key: std::env::var("REMOTE_ANON_KEY").unwrap_or(default.remote_anon_key),
            token_file: std::env::var("TOKEN_FILE").unwrap_or(default.token_file),
            performance_table: std::env::var("PERFORMANCE_TABLE").unwrap_or(default.performance_table),
            responses_table: std::env::var("RESPONSES_TABLE").unwrap_or(default.responses_table),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", default.request_timeout_secs)?,
            probe_interval_secs: env_or("PROBE_INTERVAL_SECS", default.probe_interval_secs)?,
            probe_timeout_secs: env_or("PROBE_TIMEOUT_SECS", default.probe_timeout_secs)?,
            backoff_base_ms: env_or("BACKOFF_BASE_MS", default.backoff_base_ms)?,
            backoff_max_ms: env_or("BACKOFF_MAX_MS", default.backoff_max_ms)?,
            max_attempts: env_or("MAX_ATTEMPTS", default.max_attempts)?,
            dead_letter_file: std::env::var("DEAD_LETTER_FILE").unwrap_or(default.dead_letter_file),
        };
        config.validate()?;
        Ok(config)
    }

    /// 检查必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "REMOTE_BASE_URL".to_string(),
            });
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "SYNC_NAMESPACE".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    /// 探测超时，不超过探测间隔
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1)).min(self.probe_interval())
    }
}

/// 读取环境变量并解析，不存在时使用默认值
fn env_or<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(default),
    }
}
