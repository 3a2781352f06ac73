//! 令牌会话
//!
//! 访问令牌从令牌文件读取并缓存；`sign_out` 只清缓存，
//! 下次请求重新读文件。令牌文件由外部登录流程负责刷新。

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clients::remote::Authenticator;

pub struct TokenSession {
    token_file: PathBuf,
    anon_key: String,
    cached: RwLock<Option<String>>,
}

impl TokenSession {
    pub fn new(token_file: impl Into<PathBuf>, anon_key: impl Into<String>) -> Self {
        Self {
            token_file: token_file.into(),
            anon_key: anon_key.into(),
            cached: RwLock::new(None),
        }
    }

    /// 当前 Bearer 令牌，没有登录时退回匿名 key
    pub async fn bearer(&self) -> String {
        if let Some(token) = self.cached.read().await.as_ref() {
            return token.clone();
        }

        let mut cached = self.cached.write().await;
        if let Some(token) = cached.as_ref() {
            return token.clone();
        }

        match tokio::fs::read_to_string(&self.token_file).await {
            Ok(content) if !content.trim().is_empty() => {
                let token = content.trim().to_string();
                debug!("已从 {} 载入会话令牌", self.token_file.display());
                *cached = Some(token.clone());
                token
            }
            Ok(_) => self.anon_key.clone(),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("读取令牌文件失败 {}: {}", self.token_file.display(), e);
                }
                self.anon_key.clone()
            }
        }
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }
}

#[async_trait]
impl Authenticator for TokenSession {
    async fn sign_out(&self) {
        self.cached.write().await.take();
        info!("🔑 已清除本地会话，等待重新登录");
    }
}
