//! 认证模块
//!
//! 持有整个应用唯一的 `AuthSession`，并把会话变化同步到响应式信号。
//! 路由服务通过注入的认证信号来检查认证状态，与本模块解耦。

use std::rc::Rc;

use fittrack::config::{ENV_API_BASE_URL, ENV_TIMEOUT_SECS};
use fittrack::{AuthSession, ClientConfig};
use fittrack_shared::UserProfile;
use fittrack_shared::protocol::{LoginRequest, ProfileUpdate, RegisterRequest};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::web::{BrowserStorage, FetchHttpClient};

const MSG_SESSION_EXPIRED: &str = "登录已过期，请重新登录";

pub type ClientSession = AuthSession<FetchHttpClient, BrowserStorage>;

/// 认证状态（UI 可见部分）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
    /// 登录 / 注册请求进行中
    pub is_loading: bool,
    /// 启动时的会话补全是否已完成
    pub is_ready: bool,
    /// 最近一次失败的消息
    pub error: Option<String>,
}

/// 认证上下文
///
/// 包含读写信号与会话本体，通过 Context 在组件间共享。
#[derive(Clone, Copy)]
pub struct AuthContext {
    /// 认证状态（只读）
    pub state: ReadSignal<AuthState>,
    /// 设置认证状态（写入）
    pub set_state: WriteSignal<AuthState>,
    session: StoredValue<Rc<ClientSession>, LocalStorage>,
}

/// 构建期注入的 API 配置，未设置时使用默认值
fn build_config() -> ClientConfig {
    ClientConfig::from_lookup(|key| {
        let value = match key {
            ENV_API_BASE_URL => option_env!("FITTRACK_API_BASE_URL"),
            ENV_TIMEOUT_SECS => option_env!("FITTRACK_API_TIMEOUT_SECS"),
            _ => None,
        };
        value.map(str::to_string)
    })
}

impl AuthContext {
    /// 创建认证上下文，并从 localStorage 恢复上一次的会话
    pub fn new() -> Self {
        let config = build_config();
        let http = FetchHttpClient::new(config.timeout);
        let session = Rc::new(AuthSession::new(http, BrowserStorage, config));

        let restored = session.session();
        let (state, set_state) = signal(AuthState {
            is_authenticated: restored.is_authenticated(),
            user: restored.user,
            ..Default::default()
        });

        // 会话每次提交后同步到信号（登录、刷新、强制清除）
        session.subscribe(move |snapshot| {
            let is_authenticated = snapshot.is_authenticated();
            let user = snapshot.user.clone();
            set_state.update(|state| {
                state.is_authenticated = is_authenticated;
                state.user = user;
            });
        });

        // 会话已被清空，路由服务会在认证信号变化后跳转到登录页
        session.on_session_expired(move || {
            log::warn!("session expired, login required");
            set_state.update(|state| state.error = Some(MSG_SESSION_EXPIRED.to_string()));
        });

        Self {
            state,
            set_state,
            session: StoredValue::new_local(session),
        }
    }

    pub fn session(&self) -> Rc<ClientSession> {
        self.session.get_value()
    }

    /// 获取认证状态信号（用于路由服务注入）
    pub fn is_authenticated_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.get().is_authenticated)
    }

    pub fn is_ready_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.get().is_ready)
    }

    /// 操作开始：清除旧错误并标记加载中
    fn begin(&self) {
        self.set_state.update(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    /// 操作结束：同步会话的加载状态与错误消息
    fn finish(&self, session: &ClientSession) {
        let is_loading = session.is_loading();
        let error = session.last_error();
        self.set_state.update(|state| {
            state.is_loading = is_loading;
            state.error = error;
        });
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

/// 初始化认证状态
///
/// 有令牌但没有用户资料时向服务端补全，完成后才允许路由守卫运行。
pub fn init_auth(ctx: &AuthContext) {
    let ctx = *ctx;
    let session = ctx.session();

    spawn_local(async move {
        session.initialize().await;
        ctx.set_state.update(|state| state.is_ready = true);
    });
}

/// 登录
///
/// # Returns
/// 登录是否成功；失败消息写入 `AuthState::error`
pub async fn login(ctx: AuthContext, username: String, password: String) -> bool {
    let session = ctx.session();
    ctx.begin();

    let result = session.login(&LoginRequest::new(username, password)).await;
    ctx.finish(&session);
    result.is_ok()
}

/// 注册，成功后直接进入已登录状态
pub async fn register(ctx: AuthContext, request: RegisterRequest) -> bool {
    let session = ctx.session();
    ctx.begin();

    let result = session.register(&request).await;
    ctx.finish(&session);
    result.is_ok()
}

/// 更新个人资料，成功后会话中的用户资料被整体替换
pub async fn update_profile(ctx: AuthContext, update: ProfileUpdate) -> bool {
    let session = ctx.session();
    ctx.begin();

    let result = session.update_profile(&update).await;
    ctx.finish(&session);
    result.is_ok()
}

/// 上传头像（data URL），成功后会话中的头像地址随之更新
pub async fn upload_avatar(ctx: AuthContext, data_url: String) -> bool {
    let session = ctx.session();
    ctx.begin();

    let result = session.upload_avatar(data_url).await;
    ctx.finish(&session);
    result.is_ok()
}

/// 头像的完整地址
///
/// 服务端返回的是相对上传目录的路径，需要拼接静态资源的基础地址。
pub fn avatar_url(ctx: &AuthContext, avatar: &str) -> String {
    if avatar.starts_with("http") || avatar.starts_with("data:") {
        return avatar.to_string();
    }
    format!("{}{avatar}", ctx.session().config().upload_base_url())
}

/// 注销并清除状态
///
/// 导航将由路由服务的认证状态监听自动处理。
pub async fn logout(ctx: AuthContext) {
    let session = ctx.session();
    session.logout().await;
    ctx.finish(&session);
}
