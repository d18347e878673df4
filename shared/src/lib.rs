use serde::{Deserialize, Serialize};

pub mod date;
pub mod protocol;

pub use chrono;
pub use date::Timestamp;

// =========================================================
// 常量定义 (Constants)
// =========================================================

/// 持久化存储中的访问令牌键
pub const STORAGE_ACCESS_TOKEN_KEY: &str = "access_token";
/// 持久化存储中的刷新令牌键
pub const STORAGE_REFRESH_TOKEN_KEY: &str = "refresh_token";
/// 持久化存储中的用户资料键（JSON 序列化的 `UserProfile`）
pub const STORAGE_USER_KEY: &str = "user";

/// 会话相关的全部存储键，登出时一并清除
pub const SESSION_STORAGE_KEYS: [&str; 3] = [
    STORAGE_ACCESS_TOKEN_KEY,
    STORAGE_REFRESH_TOKEN_KEY,
    STORAGE_USER_KEY,
];

pub const HEADER_AUTHORIZATION: &str = "Authorization";

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// 用户资料
///
/// 由会话独占持有，只会整体替换。未知字段会被忽略，
/// 缺失的可选字段按缺省处理，以兼容旧版本写入的本地缓存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// 身高 (cm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// 体重 (kg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl UserProfile {
    /// 返回替换了头像的新资料
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// 统一响应信封
///
/// 所有接口都返回 `{success, message, data?, error?}`，
/// 调用方必须以 `success` 为准，而不是仅看 HTTP 状态码。
/// 服务端在出错时可能只返回 `{error}`，因此 `success` 与 `message` 都有缺省值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    /// 解析面向用户的错误消息
    ///
    /// 优先级：`message` -> `error` -> `fallback`
    pub fn failure_message(&self, fallback: &str) -> String {
        if !self.message.is_empty() {
            return self.message.clone();
        }
        match self.error.as_deref() {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_tolerates_missing_and_unknown_fields() {
        let json = r#"{
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
            "created_at": "2024-03-01T08:30:00.123456",
            "updated_at": null,
            "is_admin": false
        }"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.age.is_none());
        assert!(user.created_at.is_some());
        assert!(user.updated_at.is_none());
    }

    #[test]
    fn test_envelope_with_only_error_field() {
        let env: ApiResponse<UserProfile> =
            serde_json::from_str(r#"{"error":"用户名或密码错误"}"#).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(env.failure_message("登录失败"), "用户名或密码错误");
    }

    #[test]
    fn test_failure_message_prefers_message_then_fallback() {
        let mut env: ApiResponse<()> = ApiResponse::failure("密码错误");
        env.error = Some("ignored".into());
        assert_eq!(env.failure_message("登录失败"), "密码错误");

        let empty: ApiResponse<()> = ApiResponse::failure("");
        assert_eq!(empty.failure_message("登录失败"), "登录失败");
    }
}
