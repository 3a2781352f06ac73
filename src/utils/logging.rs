//! 日志工具模块
//!
//! 提供日志初始化和输出格式化的辅助函数
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::Config;
use crate::workflow::sync_worker::{FlushReport, HaltReason};
use crate::workflow::trigger::Trigger;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 提交同步程序启动");
    info!("🗄  本地存储: {} (命名空间 {})", config.storage_dir, config.namespace);
    info!("🌐 远端地址: {}", config.remote_base_url);
    if config.max_attempts == 0 {
        info!("🔁 失败重试: 不限次数");
    } else {
        info!("🔁 失败重试: 最多 {} 次后进入死信", config.max_attempts);
    }
    info!("{}", "=".repeat(60));
}

/// 记录一轮同步的结果
pub fn log_flush_report(trigger: Trigger, report: &FlushReport) {
    if report.coalesced {
        debug!("[{}] 已有同步在进行，已合并", trigger);
        return;
    }

    match report.halt {
        Some(HaltReason::Offline) => {
            info!("[{}] 📴 设备离线，{} 条提交等待网络", trigger, report.remaining);
        }
        None if report.sent == 0 && report.conflicts == 0 && report.remaining == 0 => {
            debug!("[{}] 队列为空", trigger);
        }
        None => {
            info!(
                "[{}] ✅ 同步完成: 发送 {} | 已存在 {} | 剩余 {}",
                trigger, report.sent, report.conflicts, report.remaining
            );
        }
        Some(reason) => {
            warn!(
                "[{}] ⏸ 同步中止 ({:?}): 发送 {} | 已存在 {} | 死信 {} | 剩余 {}",
                trigger, reason, report.sent, report.conflicts, report.dead_lettered, report.remaining
            );
        }
    }
}

/// 日志中显示的短 id
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}
