//! 外部协作方接口
//!
//! 同步流程只通过这两个 trait 接触远端和登录态，测试中用假实现替换。

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{PerformanceEntry, ResponseEntry};

/// 远端存储：两个互相独立的插入入口
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 插入一行成绩汇总，重复时应返回冲突类错误
    async fn insert_performance(&self, entry: &PerformanceEntry) -> Result<(), RemoteError>;

    /// 批量插入逐题作答
    async fn insert_responses(&self, entries: &[ResponseEntry]) -> Result<(), RemoteError>;
}

/// 登录态
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// 忘记当前会话，之后的请求依赖外部机制重新登录
    async fn sign_out(&self);
}
