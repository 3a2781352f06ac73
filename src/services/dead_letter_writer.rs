//! 死信写入服务 - 业务能力层
//!
//! 只负责"把放弃投递的提交写进诊断文件"，不关心流程

use std::fs::OpenOptions;
use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::models::SubmissionRecord;

/// 死信文件中的一行
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeadLetterLine<'a> {
    dead_lettered_at: chrono::DateTime<Utc>,
    attempts: u32,
    last_error: &'a str,
    record: &'a SubmissionRecord,
}

/// 死信写入服务
///
/// 每条记录一行 JSON，追加写入
pub struct DeadLetterWriter {
    file_path: String,
}

impl DeadLetterWriter {
    pub fn new() -> Self {
        Self {
            file_path: "dead_letter.jsonl".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.file_path
    }

    /// 写入一条死信
    ///
    /// # 参数
    /// - `record`: 放弃投递的提交
    /// - `attempts`: 累计失败次数
    /// - `last_error`: 最后一次失败信息
    pub fn write(&self, record: &SubmissionRecord, attempts: u32, last_error: &str) -> Result<()> {
        debug!("写入死信: {} | 失败 {} 次", record.id(), attempts);

        let line = DeadLetterLine {
            dead_lettered_at: Utc::now(),
            attempts,
            last_error,
            record,
        };
        let mut json = serde_json::to_string(&line)?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}

impl Default for DeadLetterWriter {
    fn default() -> Self {
        Self::new()
    }
}
