use std::time::Duration;

// =========================================================
// 运行时配置 (Runtime Configuration)
// =========================================================

/// 这些是默认值，环境变量中没有定义时使用
pub const DEFAULT_API_BASE_URL: &str = "/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE_URL: &str = "FITTRACK_API_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "FITTRACK_API_TIMEOUT_SECS";

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API 基础地址，例如 `/api` 或 `https://fit.example.com/api`
    pub base_url: String,
    /// 单个请求的整体超时
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 从环境变量读取配置，读不到或无法解析时使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意查找函数读取配置（浏览器端传入编译期常量）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(ENV_API_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let timeout_secs = lookup(ENV_TIMEOUT_SECS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url).with_timeout(Duration::from_secs(timeout_secs))
    }

    /// 拼接端点完整地址
    pub fn endpoint_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// 上传文件（头像等静态资源）的基础地址
    ///
    /// 基础地址为绝对 URL 时去掉 `/api` 段；相对地址时静态资源与页面同源，返回空串。
    pub fn upload_base_url(&self) -> String {
        if self.base_url.starts_with("http") {
            self.base_url.replacen("/api", "", 1)
        } else {
            String::new()
        }
    }
}
