//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App（初始化、收件箱、信号接线）
//!     ↓
//! workflow::SyncWorker（一轮同步：顺序投递、分类、中止）
//!     ↓
//! services（去重 / 分类 / 退避 / 死信）   clients（远端存储 / 会话）
//!     ↓
//! storage（队列 / 台账 / 键值存储）   infrastructure（网络探测）
//! ```
//!
//! 编排层只做接线和统计，不做投递判断。

pub mod app;

pub use app::{App, IngestStats};
