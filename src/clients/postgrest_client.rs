//! PostgREST 远端客户端
//!
//! 封装两张表的插入调用，把 HTTP 结果翻译成 `RemoteError`
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::remote::RemoteStore;
use crate::clients::session::TokenSession;
use crate::config::Config;
use crate::error::RemoteError;
use crate::models::{PerformanceEntry, ResponseEntry};

/// PostgREST 错误响应体
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    // GoTrue 风格
    #[serde(default)]
    error_description: Option<String>,
}

pub struct PostgrestClient {
    http: Client,
    base_url: String,
    performance_table: String,
    responses_table: String,
    session: Arc<TokenSession>,
}

impl PostgrestClient {
    /// 创建新的远端客户端
    pub fn new(config: &Config, session: Arc<TokenSession>) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            http,
            base_url: config.remote_base_url.trim_end_matches('/').to_string(),
            performance_table: config.performance_table.clone(),
            responses_table: config.responses_table.clone(),
            session,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// 发送一次插入请求
    async fn insert<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<(), RemoteError> {
        let url = self.table_url(table);
        let token = self.session.bearer().await;

        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("apikey", self.session.anon_key())
            .bearer_auth(token)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        debug!("{} 返回 {}: {}", url, status, body);
        Err(rejection(status, &body))
    }
}

#[async_trait]
impl RemoteStore for PostgrestClient {
    async fn insert_performance(&self, entry: &PerformanceEntry) -> Result<(), RemoteError> {
        self.insert(&self.performance_table, entry).await
    }

    async fn insert_responses(&self, entries: &[ResponseEntry]) -> Result<(), RemoteError> {
        self.insert(&self.responses_table, entries).await
    }
}

/// 把非 2xx 响应转换为错误
fn rejection(status: StatusCode, body: &str) -> RemoteError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let message = parsed
        .message
        .or(parsed.error_description)
        .map(|m| match &parsed.details {
            Some(details) if !details.is_empty() => format!("{m} ({details})"),
            _ => m,
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

    RemoteError::rejected(status.as_u16(), parsed.code.as_deref(), message)
}
