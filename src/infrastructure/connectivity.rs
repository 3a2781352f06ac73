//! 连通性探测 - 基础设施层
//!
//! `ConnectivityMonitor` 保存"设备当前是否联网"的判断，
//! 后台探测任务定期尝试 TCP 连接远端主机，离线 → 在线时发出 `ConnectivityRegained`。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::workflow::trigger::{Trigger, TriggerSender};

/// 设备联网状态
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: AtomicBool,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
        }
    }

    /// 更新状态，返回旧值
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }
}

impl ConnectivityProbe for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// 从远端地址解析出 `host:port`
pub fn probe_address(base_url: &str) -> Result<String> {
    let url = reqwest::Url::parse(base_url).with_context(|| format!("无效的远端地址: {}", base_url))?;
    let host = url
        .host_str()
        .with_context(|| format!("远端地址缺少主机名: {}", base_url))?;
    let port = url
        .port_or_known_default()
        .with_context(|| format!("无法确定远端端口: {}", base_url))?;
    Ok(format!("{host}:{port}"))
}

/// 尝试建立一次 TCP 连接
pub async fn probe_once(address: &str, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect(address)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("探测 {} 失败: {}", address, e);
            false
        }
        Err(_) => {
            debug!("探测 {} 超时", address);
            false
        }
    }
}

/// 把一次探测结果写入状态，离线 → 在线时发出信号
pub fn apply_probe_result(monitor: &ConnectivityMonitor, reachable: bool, triggers: &TriggerSender) {
    let was_online = monitor.set_online(reachable);
    match (was_online, reachable) {
        (false, true) => {
            info!("🌐 网络已恢复");
            triggers.fire(Trigger::ConnectivityRegained);
        }
        (true, false) => warn!("📴 网络已断开"),
        _ => {}
    }
}

/// 启动后台探测任务
pub fn spawn_watcher(
    monitor: Arc<ConnectivityMonitor>,
    address: String,
    interval: Duration,
    limit: Duration,
    triggers: TriggerSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            let reachable = probe_once(&address, limit).await;
            apply_probe_result(&monitor, reachable, &triggers);
        }
    })
}
