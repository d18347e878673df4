//! 路由定义模块 - 领域模型
//!
//! 这是纯粹的业务逻辑层，不依赖于 DOM 或 web_sys。
//! 定义了应用的所有路由、访问属性以及守卫决策。

use std::fmt::Display;

/// 登录页携带原目标地址的查询参数名
pub const REDIRECT_QUERY_KEY: &str = "redirect";

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 首页 (需要认证)
    #[default]
    Home,
    /// 登录页 (仅访客)
    Login,
    /// 注册页 (仅访客)
    Register,
    Diet,
    DietRecord,
    Exercise,
    ExerciseLog,
    AiPlan,
    Profile,
    /// 页面未找到 (公开)
    NotFound,
}

/// 守卫对一次导航的裁决
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// 允许进入目标路由
    Proceed(AppRoute),
    /// 改为跳转到给定路径（可能带查询参数）
    Redirect(String),
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举，忽略查询参数与锚点
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match path {
            "/" => Self::Home,
            "/login" => Self::Login,
            "/register" => Self::Register,
            "/diet" => Self::Diet,
            "/diet/record" => Self::DietRecord,
            "/exercise" => Self::Exercise,
            "/exercise/log" => Self::ExerciseLog,
            "/ai-plan" => Self::AiPlan,
            "/profile" => Self::Profile,
            _ => Self::NotFound,
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Diet => "/diet",
            Self::DietRecord => "/diet/record",
            Self::Exercise => "/exercise",
            Self::ExerciseLog => "/exercise/log",
            Self::AiPlan => "/ai-plan",
            Self::Profile => "/profile",
            Self::NotFound => "/404",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Home => "首页",
            Self::Login => "登录",
            Self::Register => "注册",
            Self::Diet | Self::DietRecord => "饮食记录",
            Self::Exercise => "运动库",
            Self::ExerciseLog => "运动记录",
            Self::AiPlan => "AI 健身方案",
            Self::Profile => "个人中心",
            Self::NotFound => "页面未找到",
        }
    }

    /// **核心守卫逻辑：定义该路由是否需要认证**
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login | Self::Register | Self::NotFound)
    }

    /// 定义已认证用户是否应该离开此路由（登录页、注册页）
    pub fn should_redirect_when_authenticated(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// 获取认证失败时的重定向目标
    pub fn auth_failure_redirect() -> Self {
        Self::Login
    }

    /// 获取认证成功时的重定向目标（从登录页）
    pub fn auth_success_redirect() -> Self {
        Self::Home
    }

    /// 对前往 `path` 的导航做出裁决
    pub fn guard(path: &str, is_authenticated: bool) -> Navigation {
        let target = Self::from_path(path);

        if target.requires_auth() && !is_authenticated {
            return Navigation::Redirect(login_redirect_path(path));
        }
        if target.should_redirect_when_authenticated() && is_authenticated {
            return Navigation::Redirect(Self::auth_success_redirect().to_path().to_string());
        }
        Navigation::Proceed(target)
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// 登录页地址，携带原目标路径
pub fn login_redirect_path(target: &str) -> String {
    let login = AppRoute::auth_failure_redirect().to_path();
    if target.is_empty() || target == "/" {
        return login.to_string();
    }
    format!("{login}?{REDIRECT_QUERY_KEY}={}", urlencoding::encode(target))
}

/// 登录成功后的跳转目标
///
/// 只接受以 `/` 开头的同源路径；`//host` 形式和其它输入回退到首页。
pub fn post_login_target(redirect: Option<&str>) -> String {
    match redirect {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => AppRoute::auth_success_redirect().to_path().to_string(),
    }
}
