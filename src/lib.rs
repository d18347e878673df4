//! FitTrack 客户端核心
//!
//! - `session`: 会话状态与持久化镜像
//! - `client`: 统一请求管线（附加令牌、401 刷新后重放一次）
//! - `auth`: 登录、注册、登出、刷新、资料等会话操作
//! - `request` / `storage`: 传输层与存储层抽象，浏览器与原生环境各有实现

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{AuthSession, PendingRequest};
pub use config::ClientConfig;
pub use error::{AuthError, AuthResult};
pub use fittrack_shared as shared;
pub use request::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};
pub use session::{Session, SessionStore};
pub use storage::{MemoryStorage, SessionStorage, StorageError};

#[cfg(not(target_arch = "wasm32"))]
pub use request::ReqwestHttpClient;

/// 原生环境下的默认会话上下文：reqwest 传输 + 指定存储
#[cfg(not(target_arch = "wasm32"))]
pub fn native_session<S: SessionStorage>(
    storage: S,
    config: ClientConfig,
) -> Result<AuthSession<ReqwestHttpClient, S>, HttpError> {
    let http = ReqwestHttpClient::new(config.timeout)?;
    Ok(AuthSession::new(http, storage, config))
}
