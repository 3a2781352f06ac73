//! # Quiz Submit Sync
//!
//! 离线答题提交的本地队列与同步引擎
//!
//! 学生在断网时完成测验，提交先持久化到本地队列；网络恢复、应用回到前台或重新启动时，
//! 队列按入队顺序投递到远端，每条提交最终只会被确认一次。
//!
//! ## 架构设计
//!
//! ### ① 存储层（Storage）
//! - `storage/` - 可替换的键值存储、FIFO 队列、投递台账
//!
//! ### ② 业务能力层（Services）
//! - `Deduplicator` - 按内容签名拒绝重复入队
//! - `FailureClassifier` - 把失败归为冲突 / 授权 / 网络 / 未分类
//! - `BackoffPolicy` - 跨轮次指数退避
//! - `DeadLetterWriter` - 写死信诊断文件
//!
//! ### ③ 外部协作（Clients / Infrastructure）
//! - `RemoteStore` / `Authenticator` - 远端存储与登录态接口，`PostgrestClient` / `TokenSession` 为默认实现
//! - `ConnectivityMonitor` - 网络探测，离线 → 在线时发出信号
//!
//! ### ④ 流程层（Workflow）
//! - `SyncWorker` - 一轮同步的状态机，单飞保护
//! - `Trigger` - 启动 / 网络恢复 / 获得焦点三种信号
//!
//! ### ⑤ 编排层（Orchestration）
//! - `App` - 初始化、收件箱入队、信号接线
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, RemoteError};
pub use models::{PerformanceEntry, ResponseEntry, SubmissionDraft, SubmissionRecord};
pub use orchestrator::App;
pub use storage::{EnqueueOutcome, Outbox};
pub use workflow::{FlushReport, HaltReason, SyncWorker, Trigger};
