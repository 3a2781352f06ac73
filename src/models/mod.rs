pub mod loaders;
pub mod submission;

pub use loaders::{load_all_attempt_files, load_attempt_file, AttemptFile};
pub use submission::{
    PerformanceEntry, ResponseEntry, SubmissionDraft, SubmissionKind, SubmissionRecord,
};
