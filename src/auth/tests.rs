use super::*;
use crate::config::ClientConfig;
use crate::request::mock::MockHttpClient;
use crate::request::{HttpError, HttpMethod, HttpRequest, HttpResponse};
use crate::session::SessionStore;
use crate::storage::MemoryStorage;
use crate::test_support::{
    BASE, FailingStorage, fail_envelope, ok_envelope, sample_user, url, user_json,
};
use fittrack_shared::{SESSION_STORAGE_KEYS, STORAGE_USER_KEY};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::rc::Rc;

type TestSession = AuthSession<MockHttpClient, MemoryStorage>;

// =========================================================
// Helpers
// =========================================================

fn anonymous() -> (TestSession, MemoryStorage) {
    let storage = MemoryStorage::new();
    let session = AuthSession::new(
        MockHttpClient::new(),
        storage.clone(),
        ClientConfig::new(BASE),
    );
    (session, storage)
}

fn logged_in() -> (TestSession, MemoryStorage) {
    let (session, storage) = anonymous();
    session
        .store()
        .save_auth("access-1".into(), "refresh-1".into(), sample_user("alice"))
        .unwrap();
    (session, storage)
}

fn tokens_envelope(name: &str) -> Value {
    ok_envelope(json!({
        "access_token": format!("{name}-access"),
        "refresh_token": format!("{name}-refresh"),
        "user": user_json(name),
    }))
}

// =========================================================
// Login / Register
// =========================================================

#[tokio::test]
async fn test_login_persists_session_and_survives_reload() {
    let (session, storage) = anonymous();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/login"),
        200,
        tokens_envelope("alice"),
    );

    session
        .login(&LoginRequest::new("alice", "secret"))
        .await
        .unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.user().unwrap().username, "alice");
    assert_eq!(session.last_error(), None);
    assert_eq!(storage.get("access_token").as_deref(), Some("alice-access"));
    assert_eq!(storage.get("refresh_token").as_deref(), Some("alice-refresh"));

    // 模拟刷新页面：同一份存储重新恢复
    let reloaded = SessionStore::restore(storage.clone());
    assert!(reloaded.is_authenticated());
    assert_eq!(reloaded.snapshot(), session.session());
}

#[tokio::test]
async fn test_login_rejected_in_envelope_records_server_message() {
    let (session, storage) = anonymous();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/login"),
        200,
        fail_envelope("密码错误"),
    );

    let err = session
        .login(&LoginRequest::new("alice", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials("密码错误".into()));
    assert_eq!(session.last_error().as_deref(), Some("密码错误"));
    assert!(!session.is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_login_401_does_not_trigger_refresh() {
    let (session, _) = logged_in();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/login"),
        401,
        json!({ "error": "用户名或密码错误" }),
    );

    let err = session
        .login(&LoginRequest::new("bob", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials("用户名或密码错误".into()));
    assert_eq!(session.http.calls_to(&url("/auth/refresh")), 0);
    // 失败的登录保留原有会话
    assert!(session.is_authenticated());
    assert_eq!(session.user().unwrap().username, "alice");
}

#[tokio::test]
async fn test_login_network_failure_keeps_network_error() {
    let (session, _) = anonymous();
    session
        .http
        .mock_network_error(HttpMethod::Post, &url("/auth/login"));

    let err = session
        .login(&LoginRequest::new("alice", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Network(_)));
    assert!(session.last_error().unwrap().starts_with("网络错误"));
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_loading_flag_set_during_operation_and_reset_after() {
    let (session, _) = anonymous();
    let session = Rc::new(session);
    let seen_loading = Rc::new(std::cell::Cell::new(false));
    {
        let observer = session.clone();
        let seen = seen_loading.clone();
        session.subscribe(move |_| seen.set(observer.is_loading()));
    }
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/login"),
        200,
        tokens_envelope("alice"),
    );

    session
        .login(&LoginRequest::new("alice", "secret"))
        .await
        .unwrap();

    assert!(seen_loading.get());
    assert!(!session.is_loading());
}

/// 在转发给脚本化响应之前，按 URL 让出若干次执行权
struct YieldingClient {
    inner: MockHttpClient,
    yields: HashMap<String, usize>,
}

#[async_trait::async_trait(?Send)]
impl HttpClient for YieldingClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let yields = self.yields.get(&req.url).copied().unwrap_or(0);
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        self.inner.send(req).await
    }
}

#[tokio::test]
async fn test_loading_stays_set_while_overlapping_operation_runs() {
    let client = YieldingClient {
        inner: MockHttpClient::new(),
        yields: HashMap::from([(url("/auth/login"), 1), (url("/auth/profile"), 4)]),
    };
    client.inner.mock_response(
        HttpMethod::Post,
        &url("/auth/login"),
        200,
        tokens_envelope("alice"),
    );
    client.inner.mock_response(
        HttpMethod::Put,
        &url("/auth/profile"),
        200,
        ok_envelope(user_json("alice")),
    );
    let session = AuthSession::new(client, MemoryStorage::new(), ClientConfig::new(BASE));

    let login = async {
        session
            .login(&LoginRequest::new("alice", "secret"))
            .await
            .unwrap();
        session.is_loading()
    };
    let update = ProfileUpdate {
        weight: Some(64.0),
        ..Default::default()
    };
    let (loading_after_login, updated) = tokio::join!(login, session.update_profile(&update));

    // 登录先完成，资料更新仍在进行中
    assert!(loading_after_login);
    updated.unwrap();
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_login_storage_failure_keeps_previous_session() {
    let inner = MemoryStorage::new();
    let session = AuthSession::new(
        MockHttpClient::new(),
        FailingStorage::new(inner.clone()),
        ClientConfig::new(BASE),
    );
    session
        .store()
        .save_auth("access-1".into(), "refresh-1".into(), sample_user("alice"))
        .unwrap();
    let before = session.session();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/login"),
        200,
        tokens_envelope("bob"),
    );

    session.store().storage().fail_writes_to(STORAGE_USER_KEY);
    let err = session
        .login(&LoginRequest::new("bob", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Storage(_)));
    assert_eq!(session.last_error(), Some(err.message()));
    assert_eq!(session.session(), before);
    assert!(!session.is_loading());
    // 存储中同样保持登录前的会话
    assert_eq!(SessionStore::restore(inner).snapshot(), before);
}

#[tokio::test]
async fn test_register_logs_in_new_user() {
    let (session, storage) = anonymous();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/register"),
        201,
        tokens_envelope("carol"),
    );

    let request = RegisterRequest {
        username: "carol".into(),
        email: "carol@example.com".into(),
        password: "secret".into(),
        age: Some(30),
        ..Default::default()
    };
    session.register(&request).await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.user().unwrap().username, "carol");
    assert_eq!(storage.len(), SESSION_STORAGE_KEYS.len());
}

#[tokio::test]
async fn test_register_conflict_records_message() {
    let (session, _) = anonymous();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/register"),
        400,
        json!({ "error": "用户名已存在" }),
    );

    let err = session
        .register(&RegisterRequest::default())
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::Validation("用户名已存在".into()));
    assert_eq!(session.last_error().as_deref(), Some("用户名已存在"));
    assert!(!session.is_authenticated());
}

// =========================================================
// Logout / Refresh
// =========================================================

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let (session, storage) = logged_in();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/logout"),
        500,
        json!({ "error": "internal" }),
    );

    session.logout().await;

    assert!(!session.is_authenticated());
    assert!(storage.is_empty());
    assert_eq!(
        session.http.auth_headers_for(&url("/auth/logout")),
        vec![Some("Bearer access-1".to_string())]
    );
    assert_eq!(session.http.calls_to(&url("/auth/refresh")), 0);
}

#[tokio::test]
async fn test_logout_without_session_skips_network() {
    let (session, _) = anonymous();

    session.logout().await;

    assert!(session.http.requests.borrow().is_empty());
}

#[tokio::test]
async fn test_refresh_without_token_makes_no_request() {
    let (session, _) = anonymous();

    let err = session.refresh_access_token().await.unwrap_err();

    assert_eq!(err, AuthError::NoRefreshToken);
    assert!(session.http.requests.borrow().is_empty());
}

#[tokio::test]
async fn test_refresh_replaces_only_access_token() {
    let (session, storage) = logged_in();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/refresh"),
        200,
        ok_envelope(json!({ "access_token": "access-2" })),
    );

    session.refresh_access_token().await.unwrap();

    let snapshot = session.session();
    assert_eq!(snapshot.access_token.as_deref(), Some("access-2"));
    assert_eq!(snapshot.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(snapshot.user.unwrap().username, "alice");
    assert_eq!(storage.get("refresh_token").as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_refresh_rejected_in_envelope_clears_session() {
    let (session, storage) = logged_in();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/refresh"),
        200,
        fail_envelope("刷新令牌无效"),
    );

    let err = session.refresh_access_token().await.unwrap_err();

    assert_eq!(err, AuthError::Validation("刷新令牌无效".into()));
    assert!(!session.is_authenticated());
    assert!(storage.is_empty());
}

// =========================================================
// Initialize / Profile
// =========================================================

#[tokio::test]
async fn test_initialize_recovers_profile_after_refresh() {
    let storage = MemoryStorage::new();
    storage.set("access_token", "expired").unwrap();
    storage.set("refresh_token", "refresh-1").unwrap();
    let session = AuthSession::new(
        MockHttpClient::new(),
        storage.clone(),
        ClientConfig::new(BASE),
    );

    let me = url("/auth/me");
    session
        .http
        .mock_response(HttpMethod::Get, &me, 401, json!({ "error": "Token has expired" }));
    session
        .http
        .mock_response(HttpMethod::Get, &me, 200, ok_envelope(user_json("alice")));
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/refresh"),
        200,
        ok_envelope(json!({ "access_token": "fresh" })),
    );

    session.initialize().await;

    assert!(session.is_authenticated());
    assert_eq!(session.user().unwrap().username, "alice");
    assert_eq!(session.http.calls_to(&me), 2);
    assert_eq!(storage.get("access_token").as_deref(), Some("fresh"));
    assert!(storage.get("user").is_some());
}

#[tokio::test]
async fn test_initialize_failure_clears_session() {
    let storage = MemoryStorage::new();
    storage.set("access_token", "garbage").unwrap();
    let session = AuthSession::new(
        MockHttpClient::new(),
        storage.clone(),
        ClientConfig::new(BASE),
    );
    session.http.mock_response(
        HttpMethod::Get,
        &url("/auth/me"),
        500,
        json!({ "error": "boom" }),
    );

    session.initialize().await;

    assert!(!session.is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_initialize_with_full_session_makes_no_request() {
    let (session, _) = logged_in();

    session.initialize().await;

    assert!(session.http.requests.borrow().is_empty());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_fetch_user_requires_login() {
    let (session, _) = anonymous();

    let err = session.fetch_user().await.unwrap_err();

    assert_eq!(err, AuthError::NotLoggedIn);
    assert_eq!(session.last_error().as_deref(), Some("未登录"));
    assert!(session.http.requests.borrow().is_empty());
}

#[tokio::test]
async fn test_update_profile_replaces_user() {
    let (session, storage) = logged_in();
    let mut updated = sample_user("alice");
    updated.weight = Some(62.5);
    session.http.mock_response(
        HttpMethod::Put,
        &url("/auth/profile"),
        200,
        ok_envelope(serde_json::to_value(&updated).unwrap()),
    );

    let update = ProfileUpdate {
        weight: Some(62.5),
        ..Default::default()
    };
    session.update_profile(&update).await.unwrap();

    assert_eq!(session.user(), Some(updated.clone()));
    let stored: fittrack_shared::UserProfile =
        serde_json::from_str(&storage.get("user").unwrap()).unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_update_profile_rejection_keeps_user() {
    let (session, _) = logged_in();
    session.http.mock_response(
        HttpMethod::Put,
        &url("/auth/profile"),
        400,
        json!({ "error": "当前密码错误" }),
    );

    let update = ProfileUpdate {
        current_password: Some("wrong".into()),
        new_password: Some("next".into()),
        ..Default::default()
    };
    let err = session.update_profile(&update).await.unwrap_err();

    assert_eq!(err.message(), "当前密码错误");
    assert_eq!(session.user(), Some(sample_user("alice")));
}

#[tokio::test]
async fn test_upload_avatar_updates_stored_user() {
    let (session, _) = logged_in();
    session.http.mock_response(
        HttpMethod::Post,
        &url("/auth/upload-avatar"),
        200,
        ok_envelope(json!({ "avatar": "/uploads/avatars/1.png" })),
    );

    let avatar = session
        .upload_avatar("data:image/png;base64,AAAA")
        .await
        .unwrap();

    assert_eq!(avatar, "/uploads/avatars/1.png");
    assert_eq!(
        session.user().unwrap().avatar.as_deref(),
        Some("/uploads/avatars/1.png")
    );
}
