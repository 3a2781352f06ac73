//! 提交记录数据模型
//!
//! 一次完成的答题 = 一行成绩汇总 + 若干行逐题作答。
//! `SubmissionDraft` 由答题完成事件产生，入队时由队列分配 id 变为 `SubmissionRecord`。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::ValidationError;

/// 记录类型（目前只有测验提交一种）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    #[default]
    QuizSubmission,
}

/// 成绩汇总行，按远端表结构原样发送
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub quiz_id: String,
    pub score: f64,
    #[serde(default)]
    pub completion_time_seconds: Option<u32>,
    pub student_name: String,
    pub section_id: String,
}

/// 逐题作答行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub quiz_id: String,
    pub question_id: String,
    pub section_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    pub answered_at: DateTime<Utc>,
    pub time_spent_seconds: u32,
    pub is_correct: bool,
    /// 选项内容对本模块不透明
    #[serde(default)]
    pub selected_option: JsonValue,
    #[serde(default)]
    pub text_answer: Option<String>,
}

/// 尚未入队的提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDraft {
    pub quiz_id: String,
    pub performance_entry: PerformanceEntry,
    #[serde(default)]
    pub response_entries: Vec<ResponseEntry>,
}

impl SubmissionDraft {
    /// 创建并校验提交
    pub fn new(
        performance_entry: PerformanceEntry,
        response_entries: Vec<ResponseEntry>,
    ) -> Result<Self, ValidationError> {
        let draft = Self {
            quiz_id: performance_entry.quiz_id.clone(),
            performance_entry,
            response_entries,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// 校验必填字段和测验ID一致性
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quiz_id.trim().is_empty() {
            return Err(ValidationError::EmptyQuizId);
        }
        let perf = &self.performance_entry;
        if perf.student_name.trim().is_empty() {
            return Err(ValidationError::EmptyStudentName);
        }
        if perf.section_id.trim().is_empty() {
            return Err(ValidationError::EmptySectionId);
        }
        if !perf.score.is_finite() {
            return Err(ValidationError::InvalidScore {
                value: perf.score.to_string(),
            });
        }

        let entry_ids = std::iter::once(&perf.quiz_id)
            .chain(self.response_entries.iter().map(|r| &r.quiz_id));
        for found in entry_ids {
            if found != &self.quiz_id {
                return Err(ValidationError::QuizIdMismatch {
                    expected: self.quiz_id.clone(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }
}

/// 已入队的提交记录，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    id: Uuid,
    kind: SubmissionKind,
    quiz_id: String,
    performance_entry: PerformanceEntry,
    response_entries: Vec<ResponseEntry>,
    created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    /// 只在入队时调用：分配新的本地 id
    pub(crate) fn from_draft(draft: SubmissionDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: SubmissionKind::QuizSubmission,
            quiz_id: draft.quiz_id,
            performance_entry: draft.performance_entry,
            response_entries: draft.response_entries,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SubmissionKind {
        self.kind
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn performance_entry(&self) -> &PerformanceEntry {
        &self.performance_entry
    }

    pub fn response_entries(&self) -> &[ResponseEntry] {
        &self.response_entries
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 构造一个测试用提交
    pub fn draft(section: &str, student: &str, score: f64, responses: usize) -> SubmissionDraft {
        let quiz_id = "quiz-1".to_string();
        let performance = PerformanceEntry {
            quiz_id: quiz_id.clone(),
            score,
            completion_time_seconds: Some(120),
            student_name: student.to_string(),
            section_id: section.to_string(),
        };
        let rows = (0..responses)
            .map(|i| ResponseEntry {
                quiz_id: quiz_id.clone(),
                question_id: format!("q{}", i + 1),
                section_id: section.to_string(),
                student_name: Some(student.to_string()),
                answered_at: Utc::now(),
                time_spent_seconds: 10,
                is_correct: i % 2 == 0,
                selected_option: JsonValue::String("A".to_string()),
                text_answer: None,
            })
            .collect();
        SubmissionDraft::new(performance, rows).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_requires_student_and_section() {
        let mut perf = fixtures::draft("S1", "Jane Doe", 8.0, 0).performance_entry;
        perf.student_name = "  ".to_string();
        assert_eq!(
            SubmissionDraft::new(perf.clone(), vec![]),
            Err(ValidationError::EmptyStudentName)
        );

        perf.student_name = "Jane Doe".to_string();
        perf.section_id = String::new();
        assert_eq!(
            SubmissionDraft::new(perf, vec![]),
            Err(ValidationError::EmptySectionId)
        );
    }

    #[test]
    fn draft_rejects_non_finite_score() {
        let perf = fixtures::draft("S1", "Jane Doe", 8.0, 0).performance_entry;
        for score in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let entry = PerformanceEntry { score, ..perf.clone() };
            assert!(matches!(
                SubmissionDraft::new(entry, vec![]),
                Err(ValidationError::InvalidScore { .. })
            ));
        }
    }

    #[test]
    fn draft_rejects_foreign_response_rows() {
        let mut draft = fixtures::draft("S1", "Jane Doe", 8.0, 2);
        draft.response_entries[1].quiz_id = "quiz-2".to_string();
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::QuizIdMismatch { found, .. }) if found == "quiz-2"
        ));
    }

    #[test]
    fn record_uses_camel_case_document_keys() {
        let record = SubmissionRecord::from_draft(fixtures::draft("S1", "Jane Doe", 8.0, 1), Utc::now());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["kind"], "quiz_submission");
        assert_eq!(json["quizId"], "quiz-1");
        assert_eq!(json["performanceEntry"]["student_name"], "Jane Doe");
        assert_eq!(json["responseEntries"][0]["question_id"], "q1");
    }

    #[test]
    fn every_record_gets_a_fresh_id() {
        let draft = fixtures::draft("S1", "Jane Doe", 8.0, 1);
        let a = SubmissionRecord::from_draft(draft.clone(), Utc::now());
        let b = SubmissionRecord::from_draft(draft, Utc::now());
        assert_ne!(a.id(), b.id());
    }
}
