use thiserror::Error;

use crate::request::HttpError;
use crate::storage::StorageError;

// =========================================================
// 核心错误类型
// =========================================================

/// 会话与请求管线的错误分类
///
/// `Display` 输出即面向用户的消息，UI 层可以直接展示。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    /// 登录凭据被拒绝（服务端消息原样保留）
    #[error("{0}")]
    InvalidCredentials(String),

    /// 注册 / 资料更新等请求被服务端拒绝
    #[error("{0}")]
    Validation(String),

    /// 尝试刷新时本地没有刷新令牌
    #[error("No refresh token available")]
    NoRefreshToken,

    /// 需要访问令牌的操作在未登录时被调用
    #[error("未登录")]
    NotLoggedIn,

    /// 网络不可达或请求超时，本地会话保持不变
    #[error("网络错误: {0}")]
    Network(String),

    /// 重试机会已用尽后仍然 401，或刷新接口本身返回 401
    #[error("{0}")]
    Unauthorized(String),

    /// 服务端 5xx
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx 响应体不是合法的响应信封
    #[error("响应解析失败: {0}")]
    Decode(String),

    /// 持久化存储写入失败
    #[error("存储失败: {0}")]
    Storage(String),
}

impl AuthError {
    /// 面向用户的消息
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// 把服务端的拒绝重新归类为凭据错误（登录场景）
    pub(crate) fn into_credentials_error(self) -> Self {
        match self {
            AuthError::Unauthorized(msg) | AuthError::Validation(msg) => {
                AuthError::InvalidCredentials(msg)
            }
            other => other,
        }
    }
}

impl From<HttpError> for AuthError {
    fn from(e: HttpError) -> Self {
        AuthError::Network(e.to_string())
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        AuthError::Storage(e.to_string())
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;
