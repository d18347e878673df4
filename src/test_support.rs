//! 测试共用的数据构造函数

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use fittrack_shared::UserProfile;
use serde_json::{Value, json};

use crate::storage::{MemoryStorage, SessionStorage, StorageError};

pub const BASE: &str = "/api";

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

pub fn sample_user(name: &str) -> UserProfile {
    UserProfile {
        id: 1,
        username: name.to_string(),
        email: format!("{name}@example.com"),
        age: Some(28),
        gender: None,
        height: Some(170.0),
        weight: Some(65.0),
        fitness_goal: Some("保持健康".to_string()),
        avatar: None,
        created_at: None,
        updated_at: None,
    }
}

/// 成功的响应信封
pub fn ok_envelope(data: Value) -> Value {
    json!({ "success": true, "message": "ok", "data": data })
}

pub fn fail_envelope(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

pub fn user_json(name: &str) -> Value {
    serde_json::to_value(sample_user(name)).unwrap_or(Value::Null)
}

/// 可按需注入失败的存储，底层数据与 `inner` 共享
pub struct FailingStorage {
    inner: MemoryStorage,
    failing_writes: RefCell<HashSet<String>>,
    failing_removes: Cell<bool>,
}

impl FailingStorage {
    pub fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            failing_writes: RefCell::new(HashSet::new()),
            failing_removes: Cell::new(false),
        }
    }

    pub fn fail_writes_to(&self, key: &str) {
        self.failing_writes.borrow_mut().insert(key.to_string());
    }

    pub fn fail_removes(&self) {
        self.failing_removes.set(true);
    }
}

impl SessionStorage for FailingStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing_writes.borrow().contains(key) {
            return Err(StorageError::write(key, "quota exceeded"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.failing_removes.get() {
            return Err(StorageError::remove(key, "storage unavailable"));
        }
        self.inner.remove(key)
    }
}
