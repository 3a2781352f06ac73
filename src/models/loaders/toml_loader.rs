//! 答题文件加载
//!
//! 收件箱中的每个 `*.toml` 文件描述一次完成的答题，格式与 `SubmissionDraft` 一致：
//!
//! ```toml
//! quizId = "quiz-1"
//!
//! [performanceEntry]
//! quiz_id = "quiz-1"
//! score = 8
//! student_name = "Jane Doe"
//! section_id = "S1"
//!
//! [[responseEntries]]
//! quiz_id = "quiz-1"
//! question_id = "q1"
//! section_id = "S1"
//! answered_at = "2026-10-16T08:00:00Z"
//! time_spent_seconds = 12
//! is_correct = true
//! selected_option = "B"
//! ```
//!
//! `answered_at` 必须写成带引号的 RFC 3339 字符串。

use crate::models::submission::SubmissionDraft;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 已加载的答题文件
#[derive(Debug, Clone)]
pub struct AttemptFile {
    pub path: PathBuf,
    pub draft: SubmissionDraft,
}

/// 从 TOML 文件加载一次答题
pub async fn load_attempt_file(toml_file_path: &Path) -> Result<AttemptFile> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取答题文件: {}", toml_file_path.display()))?;

    let draft: SubmissionDraft = toml::from_str(&content)
        .with_context(|| format!("无法解析答题文件: {}", toml_file_path.display()))?;

    draft
        .validate()
        .with_context(|| format!("答题文件内容无效: {}", toml_file_path.display()))?;

    Ok(AttemptFile {
        path: toml_file_path.to_path_buf(),
        draft,
    })
}

/// 加载收件箱中的所有答题文件（按文件名排序，保证入队顺序稳定）
///
/// 目录不存在时返回空列表；单个文件加载失败只记录警告
pub async fn load_all_attempt_files(folder_path: &str) -> Result<Vec<AttemptFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        tracing::debug!("收件箱不存在: {}", folder_path);
        return Ok(Vec::new());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取收件箱: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut attempts = Vec::with_capacity(toml_files.len());
    for path in toml_files {
        match load_attempt_file(&path).await {
            Ok(attempt) => {
                tracing::info!(
                    "已加载答题文件: {} ({} 道题)",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    attempt.draft.response_entries.len()
                );
                attempts.push(attempt);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
quizId = "quiz-1"

[performanceEntry]
quiz_id = "quiz-1"
score = 8.0
completion_time_seconds = 300
student_name = "Jane Doe"
section_id = "S1"

[[responseEntries]]
quiz_id = "quiz-1"
question_id = "q1"
section_id = "S1"
answered_at = "2026-10-16T08:00:00Z"
time_spent_seconds = 12
is_correct = true
selected_option = "B"
"#;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quiz-inbox-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn loads_valid_files_and_skips_broken_ones() {
        let dir = scratch_dir();
        std::fs::write(dir.join("a.toml"), SAMPLE).unwrap();
        std::fs::write(dir.join("b.toml"), "quizId = ").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let attempts = load_all_attempt_files(dir.to_str().unwrap()).await.unwrap();

        assert_eq!(attempts.len(), 1);
        let draft = &attempts[0].draft;
        assert_eq!(draft.performance_entry.student_name, "Jane Doe");
        assert_eq!(draft.response_entries.len(), 1);
        assert_eq!(draft.response_entries[0].selected_option, "B");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn nan_score_file_is_rejected() {
        let dir = scratch_dir();
        let path = dir.join("nan.toml");
        std::fs::write(&path, SAMPLE.replace("score = 8.0", "score = nan")).unwrap();

        let err = load_attempt_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("答题文件内容无效"));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn missing_inbox_is_empty() {
        let attempts = load_all_attempt_files("/definitely/not/here").await.unwrap();
        assert!(attempts.is_empty());
    }
}
