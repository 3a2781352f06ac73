//! 投递尝试台账
//!
//! 记录每条提交连续失败的次数，供退避和死信判断使用。
//! 提交记录本身不可变，所以失败计数单独存放在 `<namespace>.deliveryAttempts.v1`。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::storage::kv::KeyValueStore;

/// 单条提交的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAttempts {
    pub attempts: u32,
    pub last_failure_at: DateTime<Utc>,
    pub last_error: String,
}

pub struct DeliveryLedger {
    store: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl DeliveryLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            key: format!("{namespace}.deliveryAttempts.v1"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<DeliveryAttempts> {
        self.load().remove(&id)
    }

    /// 记一次失败，返回累计次数
    pub fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        let mut entries = self.load_for_write()?;
        let entry = entries.entry(id).or_insert_with(|| DeliveryAttempts {
            attempts: 0,
            last_failure_at: at,
            last_error: String::new(),
        });
        entry.attempts = entry.attempts.saturating_add(1);
        entry.last_failure_at = at;
        entry.last_error = error.to_string();
        let attempts = entry.attempts;

        self.save(&entries)?;
        Ok(attempts)
    }

    /// 提交离开队列后清除记录
    pub fn clear(&self, id: Uuid) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        let mut entries = self.load_for_write()?;
        if entries.remove(&id).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn load(&self) -> HashMap<Uuid, DeliveryAttempts> {
        self.load_for_write().unwrap_or_else(|e| {
            warn!("⚠️ 读取投递台账失败: {}", e);
            HashMap::new()
        })
    }

    /// 读取失败上抛，避免写回时抹掉其他提交的失败次数
    fn load_for_write(&self) -> Result<HashMap<Uuid, DeliveryAttempts>, StoreError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(HashMap::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("⚠️ 投递台账已损坏，重置: {}", e);
            HashMap::new()
        }))
    }

    fn save(&self, entries: &HashMap<Uuid, DeliveryAttempts>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return self.store.remove(&self.key);
        }
        let raw = serde_json::to_string(entries).map_err(|source| StoreError::EncodeFailed {
            key: self.key.clone(),
            source,
        })?;
        self.store.set(&self.key, &raw)
    }
}
