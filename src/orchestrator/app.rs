//! 应用编排 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开本地存储、创建远端客户端、首次探测网络
//! 2. **收件箱入队**：把收件箱中的答题文件写入队列，成功后删除文件
//! 3. **触发接线**：启动信号、网络恢复信号、焦点信号（stdin 每读到一行算一次）
//! 4. **同步循环**：把信号交给 `SyncWorker::run`，直到 Ctrl-C

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::clients::{PostgrestClient, TokenSession};
use crate::config::Config;
use crate::infrastructure::connectivity::{self, ConnectivityMonitor};
use crate::models::load_all_attempt_files;
use crate::services::{BackoffPolicy, DeadLetterWriter};
use crate::storage::{DeliveryLedger, EnqueueOutcome, FileStore, Outbox};
use crate::utils::logging::log_startup;
use crate::workflow::{trigger_channel, RetryPolicy, SyncWorker, Trigger, TriggerSender};

/// 触发 channel 容量：一个正在排队的信号就够了
const TRIGGER_CAPACITY: usize = 1;

/// 收件箱入队统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub admitted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    outbox: Arc<Outbox>,
    monitor: Arc<ConnectivityMonitor>,
    worker: Arc<SyncWorker>,
    probe_address: String,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let store = Arc::new(
            FileStore::open(&config.storage_dir)
                .with_context(|| format!("无法打开本地存储: {}", config.storage_dir))?,
        );
        let outbox = Arc::new(Outbox::new(store.clone(), &config.namespace));
        let ledger = Arc::new(DeliveryLedger::new(store, &config.namespace));

        let session = Arc::new(TokenSession::new(&config.token_file, config.remote_anon_key.clone()));
        let remote = Arc::new(
            PostgrestClient::new(&config, session.clone()).context("无法创建远端客户端")?,
        );

        let probe_address = connectivity::probe_address(&config.remote_base_url)?;
        let online = connectivity::probe_once(&probe_address, config.probe_timeout()).await;
        let monitor = Arc::new(ConnectivityMonitor::new(online));
        if online {
            info!("🌐 初始网络状态: 在线");
        } else {
            warn!("📴 初始网络状态: 离线，提交将在网络恢复后同步");
        }

        let policy = RetryPolicy {
            backoff: BackoffPolicy::from_config(&config),
            max_attempts: config.max_attempts,
        };
        let worker = SyncWorker::new(outbox.clone(), ledger, remote, session, monitor.clone())
            .with_policy(policy)
            .with_dead_letter_writer(DeadLetterWriter::with_path(config.dead_letter_file.clone()));

        Ok(Self {
            config,
            outbox,
            monitor,
            worker: Arc::new(worker),
            probe_address,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let stats = self.ingest_inbox().await?;
        if stats != IngestStats::default() {
            info!(
                "📥 收件箱: 入队 {} | 重复 {} | 失败 {}",
                stats.admitted, stats.duplicates, stats.failed
            );
        }
        info!("📋 当前队列中有 {} 条待同步提交", self.outbox.len());

        let (triggers, receiver) = trigger_channel(TRIGGER_CAPACITY);

        let watcher = connectivity::spawn_watcher(
            self.monitor.clone(),
            self.probe_address.clone(),
            self.config.probe_interval(),
            self.config.probe_timeout(),
            triggers.clone(),
        );
        spawn_focus_reader(triggers.clone());

        triggers.fire(Trigger::Startup);
        drop(triggers);

        tokio::select! {
            _ = self.worker.run(receiver) => {
                info!("同步循环已结束");
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("监听 Ctrl-C 失败: {}", e);
                }
                info!("🛑 收到退出信号，剩余 {} 条提交将在下次启动时同步", self.outbox.len());
            }
        }

        watcher.abort();
        Ok(())
    }

    /// 把收件箱中的答题文件写入队列
    pub async fn ingest_inbox(&self) -> Result<IngestStats> {
        let attempts = load_all_attempt_files(&self.config.inbox_folder).await?;
        let mut stats = IngestStats::default();

        for attempt in attempts {
            match self.outbox.enqueue(attempt.draft) {
                Ok(EnqueueOutcome::Admitted(record)) => {
                    info!("✓ 已入队: {} ({})", attempt.path.display(), record.id());
                    stats.admitted += 1;
                }
                Ok(EnqueueOutcome::Duplicate { signature }) => {
                    warn!("⚠️ 重复提交，已跳过: {} ({})", attempt.path.display(), signature);
                    stats.duplicates += 1;
                }
                Err(e) => {
                    error!("❌ 入队失败，保留文件 {}: {}", attempt.path.display(), e);
                    stats.failed += 1;
                    continue;
                }
            }
            cleanup_file(&attempt.path).await;
        }

        Ok(stats)
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}

/// stdin 每读到一行，视为用户回到应用
///
/// 阻塞读放在独立线程，避免退出时 runtime 等待 stdin
fn spawn_focus_reader(triggers: TriggerSender) {
    let spawned = std::thread::Builder::new()
        .name("focus-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                if let Err(e) = line {
                    warn!("读取 stdin 失败: {}", e);
                    break;
                }
                triggers.fire(Trigger::FocusGained);
            }
        });
    if let Err(e) = spawned {
        warn!("无法启动焦点信号线程: {}", e);
    }
}

/// 删除已入队的答题文件
async fn cleanup_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("删除答题文件失败 {}: {}", path.display(), e);
    }
}
