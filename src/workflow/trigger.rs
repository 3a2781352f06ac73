//! 同步触发信号
//!
//! 启动、网络恢复、重新获得焦点三种信号都只做一件事：请求一次同步。
//! 信号通过 channel 发给 `SyncWorker::run`，不携带任何数据。

use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// 应用启动
    Startup,
    /// 网络恢复
    ConnectivityRegained,
    /// 应用重新获得焦点
    FocusGained,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Startup => "启动",
            Trigger::ConnectivityRegained => "网络恢复",
            Trigger::FocusGained => "获得焦点",
        };
        f.write_str(name)
    }
}

/// 触发信号发送端，可以随意 clone
#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: mpsc::Sender<Trigger>,
}

pub type TriggerReceiver = mpsc::Receiver<Trigger>;

/// 创建触发 channel
pub fn trigger_channel(capacity: usize) -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (TriggerSender { tx }, rx)
}

impl TriggerSender {
    /// 发出信号，不等待
    ///
    /// channel 已满说明已有同步在排队，本次信号直接丢弃；返回是否送达
    pub fn fire(&self, trigger: Trigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("同步已在排队，忽略信号: {}", trigger);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("同步循环已退出，忽略信号: {}", trigger);
                false
            }
        }
    }
}
