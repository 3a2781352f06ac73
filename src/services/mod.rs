pub mod backoff;
pub mod classifier;
pub mod dead_letter_writer;
pub mod dedup;

pub use backoff::BackoffPolicy;
pub use classifier::{FailureClassifier, FailureKind};
pub use dead_letter_writer::DeadLetterWriter;
pub use dedup::{Deduplicator, Signature};
