//! 存储层
//!
//! 队列是持久化边界：尚未投递成功的提交在重启后必须还在。

pub mod kv;
pub mod ledger;
pub mod outbox;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use ledger::{DeliveryAttempts, DeliveryLedger};
pub use outbox::{EnqueueOutcome, Outbox};
