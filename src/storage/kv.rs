//! 键值存储 - 基础设施层
//!
//! 队列只依赖 `KeyValueStore`，具体落盘方式可替换：
//! - `MemoryStore`：进程内，测试和嵌入场景使用
//! - `FileStore`：一个键一个文件，先写临时文件再 rename

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

/// 按键读写整份文档的存储
pub trait KeyValueStore: Send + Sync {
    /// 读取文档，不存在时返回 `None`
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 整体覆盖写入
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// 删除文档，不存在时视为成功
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let docs = self
            .docs
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(docs.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut docs = self
            .docs
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        docs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut docs = self
            .docs
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        docs.remove(key);
        Ok(())
    }
}

/// 文件存储：`<root>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// 打开（必要时创建）存储目录
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::WriteFailed {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // 键里只保留文件名安全字符
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::ReadFailed {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let write_failed = |source| StoreError::WriteFailed {
            key: key.to_string(),
            source,
        };
        fs::write(&tmp, value).map_err(write_failed)?;
        fs::rename(&tmp, &path).map_err(write_failed)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::DeleteFailed {
                key: key.to_string(),
                source,
            }),
        }
    }
}
