pub mod sync_worker;
pub mod trigger;

pub use sync_worker::{FlushReport, HaltReason, RetryPolicy, SyncWorker};
pub use trigger::{trigger_channel, Trigger, TriggerReceiver, TriggerSender};
