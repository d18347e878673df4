//! localStorage 封装模块
//!
//! 直接使用 `web_sys::Storage`，为核心库的 `SessionStorage` 提供浏览器实现。

use fittrack::{SessionStorage, StorageError};

/// 浏览器 localStorage
///
/// 无状态，每次操作时重新获取 `window.localStorage`。
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl SessionStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage =
            Self::storage().ok_or_else(|| StorageError::write(key, "localStorage 不可用"))?;
        // 配额已满或隐私模式下 setItem 会抛出异常
        storage
            .set_item(key, value)
            .map_err(|e| StorageError::write(key, format!("{e:?}")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let storage =
            Self::storage().ok_or_else(|| StorageError::remove(key, "localStorage 不可用"))?;
        storage
            .remove_item(key)
            .map_err(|e| StorageError::remove(key, format!("{e:?}")))
    }
}
