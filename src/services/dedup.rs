//! 入队去重 - 业务能力层
//!
//! 签名是粗粒度内容指纹，只用来挡住界面重试、重复事件造成的重复入队，
//! 不是通用幂等键。

use std::fmt;

use crate::models::{SubmissionDraft, SubmissionRecord};

/// 提交签名：`quizId|sectionId|studentName|score|responseCount`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    fn from_parts(
        quiz_id: &str,
        section_id: &str,
        student_name: &str,
        score: f64,
        response_count: usize,
    ) -> Self {
        Signature(format!(
            "{}|{}|{}|{}|{}",
            quiz_id, section_id, student_name, score, response_count
        ))
    }

    pub fn of_draft(draft: &SubmissionDraft) -> Self {
        let perf = &draft.performance_entry;
        Self::from_parts(
            &draft.quiz_id,
            &perf.section_id,
            &perf.student_name,
            perf.score,
            draft.response_entries.len(),
        )
    }

    pub fn of_record(record: &SubmissionRecord) -> Self {
        let perf = record.performance_entry();
        Self::from_parts(
            record.quiz_id(),
            &perf.section_id,
            &perf.student_name,
            perf.score,
            record.response_entries().len(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 去重器
#[derive(Debug, Default, Clone, Copy)]
pub struct Deduplicator;

impl Deduplicator {
    /// 队列中已有相同签名时返回 false
    pub fn admit(&self, draft: &SubmissionDraft, existing: &[SubmissionRecord]) -> bool {
        let candidate = Signature::of_draft(draft);
        !existing
            .iter()
            .any(|record| Signature::of_record(record) == candidate)
    }
}
