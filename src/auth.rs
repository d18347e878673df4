//! 认证操作
//!
//! 登录、注册、资料更新等操作从不把错误抛出边界之外：
//! 它们返回 `AuthResult`，失败消息同时记录在 `last_error` 中供 UI 展示。

use std::cell::Cell;

use fittrack_shared::protocol::{
    ApiRequest, CurrentUserRequest, LoginRequest, LogoutRequest, ProfileUpdate, RefreshRequest,
    RefreshedToken, RegisterRequest, UploadAvatarRequest,
};
use fittrack_shared::{ApiResponse, UserProfile};
use tracing::{debug, info, warn};

use crate::client::{AuthSession, interpret};
use crate::error::{AuthError, AuthResult};
use crate::request::HttpClient;
use crate::storage::SessionStorage;

const MSG_LOGIN_FAILED: &str = "登录失败";
const MSG_REGISTER_FAILED: &str = "注册失败";
const MSG_UPDATE_FAILED: &str = "更新失败";
const MSG_FETCH_USER_FAILED: &str = "获取用户信息失败";
const MSG_UPLOAD_AVATAR_FAILED: &str = "上传头像失败";
const MSG_REFRESH_FAILED: &str = "Token refresh failed";

/// 在作用域内计入一个进行中的操作，离开作用域时减去
struct LoadingGuard<'a>(&'a Cell<u32>);

impl<'a> LoadingGuard<'a> {
    fn start(in_flight: &'a Cell<u32>) -> Self {
        in_flight.set(in_flight.get() + 1);
        Self(in_flight)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// 信封 `success` 为 true 且带有 `data` 时取出数据，否则转换为错误
fn require_data<T>(envelope: ApiResponse<T>, fallback: &str) -> AuthResult<T> {
    if !envelope.success {
        return Err(AuthError::Validation(envelope.failure_message(fallback)));
    }
    envelope
        .data
        .ok_or_else(|| AuthError::Decode(format!("{fallback}: response has no data")))
}

impl<C: HttpClient, S: SessionStorage> AuthSession<C, S> {
    /// 启动时补全会话
    ///
    /// 有令牌但没有用户资料时拉取当前用户；失败则清除会话。
    /// 从不向调用方返回错误。
    pub async fn initialize(&self) {
        let session = self.store.snapshot();
        if session.access_token.is_none() || session.user.is_some() {
            return;
        }

        debug!("token present without profile, fetching current user");
        match self.send(&CurrentUserRequest).await {
            Ok(envelope) => match require_data(envelope, MSG_FETCH_USER_FAILED) {
                Ok(user) => {
                    if let Err(e) = self.store.set_user(user) {
                        warn!(error = %e, "failed to persist profile, clearing session");
                        self.store.clear();
                    }
                }
                Err(e) => {
                    warn!(error = %e, "profile fetch rejected, clearing session");
                    self.store.clear();
                }
            },
            Err(e) => {
                warn!(error = %e, "profile fetch failed, clearing session");
                self.store.clear();
            }
        }
    }

    /// 用户登录
    ///
    /// 失败时保留原有会话，错误消息写入 `last_error`。
    pub async fn login(&self, credentials: &LoginRequest) -> AuthResult<()> {
        let _loading = LoadingGuard::start(&self.in_flight);
        *self.last_error.borrow_mut() = None;

        let result: AuthResult<()> = async {
            let envelope = self
                .send(credentials)
                .await
                .map_err(AuthError::into_credentials_error)?;
            let tokens = require_data(envelope, MSG_LOGIN_FAILED)
                .map_err(AuthError::into_credentials_error)?;
            self.store
                .save_auth(tokens.access_token, tokens.refresh_token, tokens.user)?;
            Ok(())
        }
        .await;

        if result.is_ok() {
            info!(username = %credentials.username, "login succeeded");
        }
        self.record(result)
    }

    /// 用户注册，成功后直接进入已登录状态
    pub async fn register(&self, new_user: &RegisterRequest) -> AuthResult<()> {
        let _loading = LoadingGuard::start(&self.in_flight);
        *self.last_error.borrow_mut() = None;

        let result: AuthResult<()> = async {
            let envelope = self.send(new_user).await?;
            let tokens = require_data(envelope, MSG_REGISTER_FAILED)?;
            self.store
                .save_auth(tokens.access_token, tokens.refresh_token, tokens.user)?;
            Ok(())
        }
        .await;

        if result.is_ok() {
            info!(username = %new_user.username, "registration succeeded");
        }
        self.record(result)
    }

    /// 登出：尽力通知服务端，然后无条件清除本地会话
    pub async fn logout(&self) {
        if self.store.access_token().is_some() {
            if let Err(e) = self.send(&LogoutRequest).await {
                warn!(error = %e, "server-side logout failed, clearing local session anyway");
            }
        }
        self.store.clear();
        *self.last_error.borrow_mut() = None;
        info!("logged out");
    }

    /// 用刷新令牌换取新的访问令牌
    ///
    /// 没有刷新令牌时立即失败且不访问网络；任何失败都会清空会话。
    pub async fn refresh_access_token(&self) -> AuthResult<()> {
        let Some(refresh_token) = self.store.refresh_token() else {
            self.store.clear();
            return Err(AuthError::NoRefreshToken);
        };

        let result: AuthResult<()> = async {
            let request = RefreshRequest {
                refresh_token: refresh_token.clone(),
            };
            // 刷新令牌同时放在请求体和 Bearer 头中
            let response = self.dispatch(&request, Some(&refresh_token)).await?;
            let envelope = interpret::<RefreshedToken>(RefreshRequest::PATH, response)?;
            let refreshed = require_data(envelope, MSG_REFRESH_FAILED)?;
            self.store.set_access_token(refreshed.access_token)?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                debug!("access token refreshed");
                Ok(())
            }
            Err(e) => {
                self.store.clear();
                Err(e)
            }
        }
    }

    /// 从服务端重新拉取用户资料并整体替换
    pub async fn fetch_user(&self) -> AuthResult<()> {
        if self.store.access_token().is_none() {
            return self.record(Err(AuthError::NotLoggedIn));
        }

        let result: AuthResult<()> = async {
            let envelope = self.send(&CurrentUserRequest).await?;
            let user = require_data(envelope, MSG_FETCH_USER_FAILED)?;
            self.store.set_user(user)?;
            Ok(())
        }
        .await;

        self.record(result)
    }

    /// 更新用户资料，服务端返回的完整资料整体替换本地资料
    pub async fn update_profile(&self, update: &ProfileUpdate) -> AuthResult<()> {
        let _loading = LoadingGuard::start(&self.in_flight);
        *self.last_error.borrow_mut() = None;

        let result: AuthResult<()> = async {
            let envelope = self.send(update).await?;
            let user = require_data(envelope, MSG_UPDATE_FAILED)?;
            self.store.set_user(user)?;
            Ok(())
        }
        .await;

        self.record(result)
    }

    /// 上传头像，返回新的头像地址
    pub async fn upload_avatar(&self, avatar: impl Into<String>) -> AuthResult<String> {
        let request = UploadAvatarRequest {
            avatar: avatar.into(),
        };

        let result: AuthResult<String> = async {
            let envelope = self.send(&request).await?;
            let uploaded = require_data(envelope, MSG_UPLOAD_AVATAR_FAILED)?;
            if let Some(user) = self.store.user() {
                self.store.set_user(user.with_avatar(uploaded.avatar.clone()))?;
            }
            Ok(uploaded.avatar)
        }
        .await;

        self.record(result)
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.store.user()
    }

    /// 把失败消息记录到 `last_error`
    fn record<T>(&self, result: AuthResult<T>) -> AuthResult<T> {
        if let Err(e) = &result {
            debug!(error = %e, "auth operation failed");
            self.last_error.replace(Some(e.message()));
        }
        result
    }
}

#[cfg(test)]
mod tests;
