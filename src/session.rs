//! 会话状态
//!
//! `SessionStore` 是认证状态的唯一来源，并把状态镜像到持久化存储，
//! 页面重新加载后可以恢复上一次的会话。
//!
//! 写入顺序：先写存储，全部成功后才提交内存状态；
//! 存储写到一半失败时，已写入的键恢复为原值，内存保持不变。

use std::cell::RefCell;
use std::rc::Rc;

use fittrack_shared::{
    SESSION_STORAGE_KEYS, STORAGE_ACCESS_TOKEN_KEY, STORAGE_REFRESH_TOKEN_KEY, STORAGE_USER_KEY,
    UserProfile,
};
use tracing::{debug, warn};

use crate::storage::{SessionStorage, StorageError};

/// 会话快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    /// 当且仅当访问令牌与用户资料同时存在
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }
}

type Listener = Rc<dyn Fn(&Session)>;

pub struct SessionStore<S: SessionStorage> {
    storage: S,
    state: RefCell<Session>,
    listeners: RefCell<Vec<Listener>>,
}

impl<S: SessionStorage> SessionStore<S> {
    /// 从持久化存储恢复会话
    ///
    /// 用户资料缺失或 JSON 损坏时视为未认证，但保留令牌，
    /// 由 `initialize` 决定是否重新拉取用户资料。
    pub fn restore(storage: S) -> Self {
        // 空值等同于不存在，见 `clear`
        let read = |key: &str| storage.get(key).filter(|value| !value.is_empty());
        let access_token = read(STORAGE_ACCESS_TOKEN_KEY);
        let refresh_token = read(STORAGE_REFRESH_TOKEN_KEY);
        let user = read(STORAGE_USER_KEY).and_then(|raw| {
            match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "stored user profile is corrupt, ignoring");
                    None
                }
            }
        });

        let session = Session {
            access_token,
            refresh_token,
            user,
        };
        debug!(
            has_token = session.access_token.is_some(),
            has_user = session.user.is_some(),
            "session restored from storage"
        );

        Self {
            storage,
            state: RefCell::new(session),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 注册会话变化监听器，每次状态提交后调用
    pub fn subscribe(&self, listener: impl Fn(&Session) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    // --- Mutations ---

    /// 保存完整的认证信息（登录 / 注册成功）
    pub fn save_auth(
        &self,
        access_token: String,
        refresh_token: String,
        user: UserProfile,
    ) -> Result<(), StorageError> {
        let user_json = encode_user(&user)?;
        self.write_all(&[
            (STORAGE_ACCESS_TOKEN_KEY, access_token.as_str()),
            (STORAGE_REFRESH_TOKEN_KEY, refresh_token.as_str()),
            (STORAGE_USER_KEY, user_json.as_str()),
        ])?;

        self.commit(Session {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            user: Some(user),
        });
        Ok(())
    }

    /// 替换访问令牌（刷新成功）
    pub fn set_access_token(&self, access_token: String) -> Result<(), StorageError> {
        self.write_all(&[(STORAGE_ACCESS_TOKEN_KEY, access_token.as_str())])?;

        let mut next = self.snapshot();
        next.access_token = Some(access_token);
        self.commit(next);
        Ok(())
    }

    /// 整体替换用户资料
    pub fn set_user(&self, user: UserProfile) -> Result<(), StorageError> {
        let user_json = encode_user(&user)?;
        self.write_all(&[(STORAGE_USER_KEY, user_json.as_str())])?;

        let mut next = self.snapshot();
        next.user = Some(user);
        self.commit(next);
        Ok(())
    }

    /// 清除内存与存储中的全部会话数据
    ///
    /// 内存状态无条件清空。某个键删除失败时改写为空值，
    /// 保证重新加载后不会恢复出已清除的会话。
    pub fn clear(&self) {
        for key in SESSION_STORAGE_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(error = %e, "failed to remove session key, blanking it");
                if let Err(e) = self.storage.set(key, "") {
                    warn!(error = %e, "failed to blank session key");
                }
            }
        }
        self.commit(Session::default());
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());

        for &(key, value) in entries {
            let previous = self.storage.get(key);
            if let Err(e) = self.storage.set(key, value) {
                warn!(error = %e, "session write failed, rolling back");
                self.rollback(&written);
                return Err(e);
            }
            written.push((key, previous));
        }
        Ok(())
    }

    fn rollback(&self, written: &[(&str, Option<String>)]) {
        for (key, previous) in written.iter().rev() {
            let restored = match previous {
                Some(value) => self.storage.set(key, value),
                None => self.storage.remove(key),
            };
            if let Err(e) = restored {
                warn!(error = %e, "rollback of session key failed");
            }
        }
    }

    fn commit(&self, next: Session) {
        *self.state.borrow_mut() = next;

        // 先释放借用再回调，监听器可以安全地读取 store
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        let snapshot = self.snapshot();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

fn encode_user(user: &UserProfile) -> Result<String, StorageError> {
    serde_json::to_string(user).map_err(|e| StorageError::write(STORAGE_USER_KEY, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::test_support::{FailingStorage, sample_user};
    use std::cell::Cell;

    #[test]
    fn test_save_auth_mirrors_storage() {
        let storage = MemoryStorage::new();
        let store = SessionStore::restore(storage.clone());

        store
            .save_auth("a1".into(), "r1".into(), sample_user("alice"))
            .unwrap();

        assert!(store.is_authenticated());
        assert_eq!(storage.get(STORAGE_ACCESS_TOKEN_KEY).as_deref(), Some("a1"));
        assert_eq!(storage.get(STORAGE_REFRESH_TOKEN_KEY).as_deref(), Some("r1"));

        // 重新加载：从同一份存储恢复出相同的会话
        let reloaded = SessionStore::restore(storage);
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn test_restore_with_corrupt_user_is_unauthenticated() {
        let storage = MemoryStorage::new();
        storage.set(STORAGE_ACCESS_TOKEN_KEY, "a1").unwrap();
        storage.set(STORAGE_USER_KEY, "{not json").unwrap();

        let store = SessionStore::restore(storage);
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert!(store.user().is_none());
    }

    #[test]
    fn test_clear_removes_every_key() {
        let storage = MemoryStorage::new();
        let store = SessionStore::restore(storage.clone());
        store
            .save_auth("a1".into(), "r1".into(), sample_user("alice"))
            .unwrap();

        store.clear();

        assert!(!store.is_authenticated());
        assert_eq!(store.snapshot(), Session::default());
        for key in SESSION_STORAGE_KEYS {
            assert!(!storage.contains(key), "{key} should be removed");
        }
    }

    #[test]
    fn test_clear_with_failing_remove_does_not_resurrect_session() {
        let inner = MemoryStorage::new();
        let store = SessionStore::restore(FailingStorage::new(inner.clone()));
        store
            .save_auth("a1".into(), "r1".into(), sample_user("alice"))
            .unwrap();

        store.storage().fail_removes();
        store.clear();

        assert_eq!(store.snapshot(), Session::default());
        let reloaded = SessionStore::restore(inner);
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert!(!reloaded.is_authenticated());
    }

    #[test]
    fn test_restore_treats_empty_values_as_absent() {
        let storage = MemoryStorage::new();
        for key in SESSION_STORAGE_KEYS {
            storage.set(key, "").unwrap();
        }

        let store = SessionStore::restore(storage);
        assert_eq!(store.snapshot(), Session::default());
    }

    #[test]
    fn test_failed_write_rolls_back_and_keeps_memory() {
        let inner = MemoryStorage::new();
        let store = SessionStore::restore(FailingStorage::new(inner.clone()));
        store
            .save_auth("old-a".into(), "old-r".into(), sample_user("alice"))
            .unwrap();
        let before = store.snapshot();

        store.storage().fail_writes_to(STORAGE_USER_KEY);
        let result = store.save_auth("new-a".into(), "new-r".into(), sample_user("bob"));

        assert!(result.is_err());
        assert_eq!(store.snapshot(), before);
        assert_eq!(inner.get(STORAGE_ACCESS_TOKEN_KEY).as_deref(), Some("old-a"));
        assert_eq!(inner.get(STORAGE_REFRESH_TOKEN_KEY).as_deref(), Some("old-r"));
    }

    #[test]
    fn test_listeners_observe_each_commit() {
        let store = SessionStore::restore(MemoryStorage::new());
        let seen = Rc::new(Cell::new(0));
        let last_auth = Rc::new(Cell::new(false));

        let (seen_c, last_c) = (seen.clone(), last_auth.clone());
        store.subscribe(move |s| {
            seen_c.set(seen_c.get() + 1);
            last_c.set(s.is_authenticated());
        });

        store
            .save_auth("a1".into(), "r1".into(), sample_user("alice"))
            .unwrap();
        assert!(last_auth.get());

        store.set_access_token("a2".into()).unwrap();
        store.clear();

        assert_eq!(seen.get(), 3);
        assert!(!last_auth.get());
    }
}
