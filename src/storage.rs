//! 持久化键值存储抽象
//!
//! 浏览器中对应 `localStorage`，原生环境和测试中使用内存实现。
//! 读写都是同步的，与浏览器 API 保持一致。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} `{key}` failed: {reason}")]
pub struct StorageError {
    pub operation: &'static str,
    pub key: String,
    pub reason: String,
}

impl StorageError {
    pub fn write(key: &str, reason: impl Into<String>) -> Self {
        Self {
            operation: "write",
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn remove(key: &str, reason: impl Into<String>) -> Self {
        Self {
            operation: "remove",
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub trait SessionStorage {
    /// 读取字符串值，不存在或读取失败时返回 None
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

// =========================================================
// 实现层: 内存存储
// =========================================================

/// 内存键值存储
///
/// 克隆出的实例共享同一份数据，可以模拟"页面重新加载后读取同一个 localStorage"。
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
