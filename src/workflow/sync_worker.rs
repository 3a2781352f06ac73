//! 同步流程 - 流程层
//!
//! 核心职责：把队列中的提交按顺序投递到远端，每条提交的结局只有三种：
//! 删除（成功或远端已存在）、留在队列并中止本轮、或进入死信。
//!
//! 单轮流程：
//! 1. 设备离线 → 直接结束，不发任何请求
//! 2. 按入队顺序逐条：先插成绩行，再插作答行（前者失败则不插后者）
//! 3. 成功 → 删除，`sent + 1`
//! 4. 失败时分类：
//!    - 远端冲突 → 删除，继续下一条
//!    - 授权过期 → 清除会话后重试一次；重试成功/冲突 → 删除，网络问题 → 中止，其他 → 留下并中止
//!    - 网络不可用 → 中止
//!    - 未分类 → 留下并中止
//!
//! 一旦中止，本条及之后所有提交原样留在队列中，下次触发再试。

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::clients::{Authenticator, RemoteStore};
use crate::error::RemoteError;
use crate::infrastructure::ConnectivityProbe;
use crate::models::SubmissionRecord;
use crate::services::{BackoffPolicy, DeadLetterWriter, FailureClassifier, FailureKind};
use crate::storage::{DeliveryLedger, Outbox};
use crate::utils::logging::{log_flush_report, short_id};
use crate::workflow::trigger::{Trigger, TriggerReceiver};

/// 本轮中止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// 开始时设备已离线
    Offline,
    /// 投递过程中网络不可用
    NetworkUnavailable,
    /// 重新登录后仍然失败
    AuthorizationFailed,
    /// 无法识别的失败
    Unclassified,
    /// 队首提交仍在退避窗口内
    BackingOff,
    /// 本地队列写入失败
    StorageFailure,
}

/// 一轮同步的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// 本轮成功写入远端的提交数
    pub sent: usize,
    /// 本轮结束后队列长度
    pub remaining: usize,
    /// 因远端已存在而删除的提交数
    pub conflicts: usize,
    /// 进入死信的提交数
    pub dead_lettered: usize,
    pub halt: Option<HaltReason>,
    /// 已有一轮在进行，本次调用直接返回
    pub coalesced: bool,
}

/// 失败重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub backoff: BackoffPolicy,
    /// 累计失败达到该次数后进入死信，0 表示不限
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let config = crate::config::Config::default();
        Self {
            backoff: BackoffPolicy::from_config(&config),
            max_attempts: config.max_attempts,
        }
    }
}

/// 单条提交的处理结果
enum ItemOutcome {
    Delivered,
    Conflict,
    /// 不计入失败次数的中止
    Blocked(HaltReason),
    /// 计入失败次数的中止
    Failed(HaltReason, RemoteError),
}

/// 同步流程
///
/// - 只有一个入口 `flush`，重入时直接返回
/// - 不向调用方返回错误，所有失败只记日志
pub struct SyncWorker {
    outbox: Arc<Outbox>,
    ledger: Arc<DeliveryLedger>,
    remote: Arc<dyn RemoteStore>,
    auth: Arc<dyn Authenticator>,
    connectivity: Arc<dyn ConnectivityProbe>,
    classifier: FailureClassifier,
    policy: RetryPolicy,
    dead_letters: DeadLetterWriter,
    in_flight: Mutex<()>,
}

impl SyncWorker {
    pub fn new(
        outbox: Arc<Outbox>,
        ledger: Arc<DeliveryLedger>,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn Authenticator>,
        connectivity: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            outbox,
            ledger,
            remote,
            auth,
            connectivity,
            classifier: FailureClassifier,
            policy: RetryPolicy::default(),
            dead_letters: DeadLetterWriter::new(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_dead_letter_writer(mut self, writer: DeadLetterWriter) -> Self {
        self.dead_letters = writer;
        self
    }

    /// 消费触发信号，每个信号跑一轮；积压的信号合并成一轮
    ///
    /// 所有发送端关闭后返回
    pub async fn run(&self, mut triggers: TriggerReceiver) {
        while let Some(trigger) = triggers.recv().await {
            let mut merged = 0usize;
            while triggers.try_recv().is_ok() {
                merged += 1;
            }
            if merged > 0 {
                debug!("合并了 {} 个积压信号", merged);
            }

            let report = self.flush().await;
            log_flush_report(trigger, &report);
        }
        debug!("触发 channel 已关闭，同步循环退出");
    }

    /// 处理单个信号（不经过 channel 时使用）
    pub async fn on_trigger(&self, trigger: Trigger) -> FlushReport {
        let report = self.flush().await;
        log_flush_report(trigger, &report);
        report
    }

    /// 跑一轮同步
    pub async fn flush(&self) -> FlushReport {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("已有同步在进行，本次跳过");
            return FlushReport {
                remaining: self.outbox.len(),
                coalesced: true,
                ..Default::default()
            };
        };

        let mut report = FlushReport::default();

        if !self.connectivity.is_online() {
            report.halt = Some(HaltReason::Offline);
            report.remaining = self.outbox.len();
            return report;
        }

        let snapshot = self.outbox.list();
        if snapshot.is_empty() {
            return report;
        }
        info!("📤 开始同步，队列中有 {} 条提交", snapshot.len());

        for record in &snapshot {
            let tag = short_id(record.id());

            let attempts = self.ledger.get(record.id());
            if !self
                .policy
                .backoff
                .is_ready(record.id(), attempts.as_ref(), Utc::now())
            {
                debug!("[提交 {}] 仍在退避窗口内，本轮结束", tag);
                report.halt = Some(HaltReason::BackingOff);
                break;
            }

            let halt = match self.process(record).await {
                ItemOutcome::Delivered => {
                    info!("[提交 {}] ✓ 投递成功", tag);
                    report.sent += 1;
                    self.discard(record).err()
                }
                ItemOutcome::Conflict => {
                    if !record.response_entries().is_empty() {
                        warn!(
                            "[提交 {}] ⚠️ 远端已存在成绩行，按已投递处理；{} 条作答行不会再发送",
                            tag,
                            record.response_entries().len()
                        );
                    } else {
                        info!("[提交 {}] 远端已存在，按已投递处理", tag);
                    }
                    report.conflicts += 1;
                    self.discard(record).err()
                }
                ItemOutcome::Blocked(reason) => {
                    warn!("[提交 {}] ⏸ 本轮中止: {:?}", tag, reason);
                    Some(reason)
                }
                ItemOutcome::Failed(reason, err) => {
                    warn!("[提交 {}] ⚠️ 投递失败，本轮中止: {}", tag, err);
                    if self.note_failure(record, &err) {
                        report.dead_lettered += 1;
                    }
                    Some(reason)
                }
            };

            if let Some(reason) = halt {
                report.halt = Some(reason);
                break;
            }
        }

        report.remaining = self.outbox.len();
        report
    }

    /// 投递一条提交，必要时重新登录后再试一次
    async fn process(&self, record: &SubmissionRecord) -> ItemOutcome {
        let err = match self.deliver(record).await {
            Ok(()) => return ItemOutcome::Delivered,
            Err(err) => err,
        };

        match self.classify(&err) {
            FailureKind::RemoteConflict => ItemOutcome::Conflict,
            FailureKind::NetworkUnavailable => ItemOutcome::Blocked(HaltReason::NetworkUnavailable),
            FailureKind::Unclassified => ItemOutcome::Failed(HaltReason::Unclassified, err),
            FailureKind::AuthorizationExpired => {
                info!("[提交 {}] 🔑 授权过期，清除会话后重试", short_id(record.id()));
                self.auth.sign_out().await;

                let retry_err = match self.deliver(record).await {
                    Ok(()) => return ItemOutcome::Delivered,
                    Err(err) => err,
                };
                match self.classify(&retry_err) {
                    FailureKind::RemoteConflict => ItemOutcome::Conflict,
                    FailureKind::NetworkUnavailable => {
                        ItemOutcome::Blocked(HaltReason::NetworkUnavailable)
                    }
                    FailureKind::AuthorizationExpired | FailureKind::Unclassified => {
                        ItemOutcome::Failed(HaltReason::AuthorizationFailed, retry_err)
                    }
                }
            }
        }
    }

    /// 两段写入：成绩行 → 作答行
    async fn deliver(&self, record: &SubmissionRecord) -> Result<(), RemoteError> {
        self.remote
            .insert_performance(record.performance_entry())
            .await?;

        let responses = record.response_entries();
        if !responses.is_empty() {
            self.remote.insert_responses(responses).await?;
        }
        Ok(())
    }

    fn classify(&self, err: &RemoteError) -> FailureKind {
        let kind = self.classifier.classify(err, self.connectivity.is_online());
        debug!("失败归类为 {}: {}", kind, err);
        kind
    }

    /// 从队列和台账中移除；失败返回应中止的原因
    fn discard(&self, record: &SubmissionRecord) -> Result<(), HaltReason> {
        if let Err(e) = self.outbox.remove(record.id()) {
            error!("[提交 {}] ❌ 从队列删除失败: {}", short_id(record.id()), e);
            return Err(HaltReason::StorageFailure);
        }
        if let Err(e) = self.ledger.clear(record.id()) {
            warn!("[提交 {}] 清理投递台账失败: {}", short_id(record.id()), e);
        }
        Ok(())
    }

    /// 记一次失败；达到上限时写入死信并移出队列，返回是否进入死信
    fn note_failure(&self, record: &SubmissionRecord, err: &RemoteError) -> bool {
        let tag = short_id(record.id());
        let attempts = match self.ledger.record_failure(record.id(), &err.to_string(), Utc::now()) {
            Ok(attempts) => attempts,
            Err(e) => {
                warn!("[提交 {}] 记录失败次数失败: {}", tag, e);
                return false;
            }
        };

        if self.policy.max_attempts == 0 || attempts < self.policy.max_attempts {
            debug!("[提交 {}] 已失败 {} 次", tag, attempts);
            return false;
        }

        if let Err(e) = self.dead_letters.write(record, attempts, &err.to_string()) {
            error!("[提交 {}] ❌ 写入死信失败，保留在队列中: {}", tag, e);
            return false;
        }
        if self.discard(record).is_err() {
            return false;
        }
        error!(
            "[提交 {}] ☠️ 已失败 {} 次，移入死信文件 {}",
            tag,
            attempts,
            self.dead_letters.path()
        );
        true
    }
}
