use crate::{Gender, UserProfile};
use serde::{Deserialize, Serialize, de::DeserializeOwned, de::IgnoredAny};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
///
/// `Response` is the type carried in the `data` field of the response envelope.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path, relative to the API base URL.
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;
    /// Whether the request carries a JSON body.
    const HAS_BODY: bool = true;
    /// Whether a 401 on this endpoint may trigger the refresh-and-retry cycle.
    ///
    /// Credential exchange endpoints set this to false: a 401 there means the
    /// credentials themselves were rejected.
    const REFRESH_ON_UNAUTHORIZED: bool = true;
}

// =========================================================
// Payloads
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarUpload {
    pub avatar: String,
}

// =========================================================
// Request Definitions
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl ApiRequest for LoginRequest {
    type Response = AuthTokens;
    const PATH: &'static str = "/auth/login";
    const METHOD: HttpMethod = HttpMethod::Post;
    const REFRESH_ON_UNAUTHORIZED: bool = false;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_goal: Option<String>,
}

impl ApiRequest for RegisterRequest {
    type Response = AuthTokens;
    const PATH: &'static str = "/auth/register";
    const METHOD: HttpMethod = HttpMethod::Post;
    const REFRESH_ON_UNAUTHORIZED: bool = false;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl ApiRequest for RefreshRequest {
    type Response = RefreshedToken;
    const PATH: &'static str = "/auth/refresh";
    const METHOD: HttpMethod = HttpMethod::Post;
    const REFRESH_ON_UNAUTHORIZED: bool = false;
}

/// Server-side token invalidation. Best effort, never refreshed.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutRequest;

impl ApiRequest for LogoutRequest {
    type Response = IgnoredAny;
    const PATH: &'static str = "/auth/logout";
    const METHOD: HttpMethod = HttpMethod::Post;
    const HAS_BODY: bool = false;
    const REFRESH_ON_UNAUTHORIZED: bool = false;
}

/// Fetch the profile of the current user
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserRequest;

impl ApiRequest for CurrentUserRequest {
    type Response = UserProfile;
    const PATH: &'static str = "/auth/me";
    const METHOD: HttpMethod = HttpMethod::Get;
    const HAS_BODY: bool = false;
}

/// Partial profile update. Absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

impl ApiRequest for ProfileUpdate {
    type Response = UserProfile;
    const PATH: &'static str = "/auth/profile";
    const METHOD: HttpMethod = HttpMethod::Put;
}

/// Upload a base64 encoded avatar image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAvatarRequest {
    pub avatar: String,
}

impl ApiRequest for UploadAvatarRequest {
    type Response = AvatarUpload;
    const PATH: &'static str = "/auth/upload-avatar";
    const METHOD: HttpMethod = HttpMethod::Post;
}
