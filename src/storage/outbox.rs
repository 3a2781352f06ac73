//! 待同步提交队列（outbox）
//!
//! 整个队列序列化为一份 JSON 文档，存放在 `<namespace>.pendingSubmissions.v1` 键下，
//! 每次变更都整体读出、整体写回。文档缺失或损坏时按空队列处理。

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppResult, StoreError};
use crate::models::{SubmissionDraft, SubmissionRecord};
use crate::services::dedup::{Deduplicator, Signature};
use crate::storage::kv::KeyValueStore;

/// 入队结果
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// 已写入队列
    Admitted(SubmissionRecord),
    /// 队列中已有相同签名的提交
    Duplicate { signature: Signature },
}

/// 持久化 FIFO 队列
pub struct Outbox {
    store: Arc<dyn KeyValueStore>,
    key: String,
    dedup: Deduplicator,
    /// 串行化"读-改-写"
    write_lock: Mutex<()>,
}

impl Outbox {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            key: Self::document_key(namespace),
            dedup: Deduplicator,
            write_lock: Mutex::new(()),
        }
    }

    /// 队列文档键
    pub fn document_key(namespace: &str) -> String {
        format!("{namespace}.pendingSubmissions.v1")
    }

    /// 校验、去重后追加到队尾并落盘
    pub fn enqueue(&self, draft: SubmissionDraft) -> AppResult<EnqueueOutcome> {
        draft.validate()?;

        let _guard = self.lock()?;
        let mut items = self.load_for_write()?;

        if !self.dedup.admit(&draft, &items) {
            let signature = Signature::of_draft(&draft);
            debug!("重复提交，已忽略: {}", signature);
            return Ok(EnqueueOutcome::Duplicate { signature });
        }

        let record = SubmissionRecord::from_draft(draft, Utc::now());
        items.push(record.clone());
        self.save(&items)?;

        debug!("已入队 {} (队列长度 {})", record.id(), items.len());
        Ok(EnqueueOutcome::Admitted(record))
    }

    /// 当前队列（按入队顺序）
    pub fn list(&self) -> Vec<SubmissionRecord> {
        self.load()
    }

    /// 删除一条记录，返回是否存在
    pub fn remove(&self, id: Uuid) -> AppResult<bool> {
        let _guard = self.lock()?;
        let mut items = self.load_for_write()?;
        let before = items.len();
        items.retain(|record| record.id() != id);

        if items.len() == before {
            return Ok(false);
        }
        self.save(&items)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    /// 只读路径：任何读取问题都按空队列处理
    fn load(&self) -> Vec<SubmissionRecord> {
        match self.store.get(&self.key) {
            Ok(Some(raw)) => Self::parse(&raw).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("⚠️ 读取队列失败，按空队列处理: {}", e);
                Vec::new()
            }
        }
    }

    /// 读-改-写路径：读取失败必须上抛，否则写回会覆盖掉未读到的提交
    ///
    /// 文档损坏时先把原文备份到 `<key>.corrupt`，再按空队列继续
    fn load_for_write(&self) -> Result<Vec<SubmissionRecord>, StoreError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };
        if let Some(items) = Self::parse(&raw) {
            return Ok(items);
        }

        let backup_key = format!("{}.corrupt", self.key);
        self.store.set(&backup_key, &raw)?;
        warn!("⚠️ 损坏的队列文档已备份到 {}", backup_key);
        Ok(Vec::new())
    }

    fn parse(raw: &str) -> Option<Vec<SubmissionRecord>> {
        match serde_json::from_str(raw) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("⚠️ 队列文档已损坏，按空队列处理: {}", e);
                None
            }
        }
    }

    fn save(&self, items: &[SubmissionRecord]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items).map_err(|source| StoreError::EncodeFailed {
            key: self.key.clone(),
            source,
        })?;
        self.store.set(&self.key, &raw)
    }
}
