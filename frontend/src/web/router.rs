//! 路由服务模块 - 核心引擎
//!
//! 封装了 web_sys 的 History API，实现高内聚：
//! 所有对 window.history 的操作都集中在此模块。
//! 实现了"监听 -> 验证 -> 处理 -> 加载"的导航流程。
//!
//! 会话初始化完成之前不做任何守卫判断，出口组件显示加载状态。

use leptos::prelude::*;
use wasm_bindgen::prelude::*;

use super::route::{AppRoute, Navigation, REDIRECT_QUERY_KEY, post_login_target};

/// 获取当前浏览器路径（含查询参数）
fn current_location() -> String {
    let Some(location) = web_sys::window().map(|w| w.location()) else {
        return "/".to_string();
    };
    let path = location.pathname().unwrap_or_else(|_| "/".to_string());
    let search = location.search().unwrap_or_default();
    format!("{path}{search}")
}

/// 读取当前 URL 中的查询参数
fn current_query_param(key: &str) -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    web_sys::UrlSearchParams::new_with_str(&search).ok()?.get(key)
}

/// 推送或替换 History 状态（内部工具函数）
fn write_history_state(path: &str, use_push: bool) {
    let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
        return;
    };
    let result = if use_push {
        history.push_state_with_url(&JsValue::NULL, "", Some(path))
    } else {
        history.replace_state_with_url(&JsValue::NULL, "", Some(path))
    };
    if let Err(e) = result {
        log::warn!("[Router] history update failed: {e:?}");
    }
}

fn set_document_title(route: AppRoute) {
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        document.set_title(&format!("{} - FitTrack", route.title()));
    }
}

/// 路由器服务
///
/// 封装所有路由操作，通过 Signal 驱动界面更新。
/// 通过注入认证检查信号实现与认证系统的解耦。
#[derive(Clone, Copy)]
pub struct RouterService {
    /// 当前路由，首次守卫完成前为 None
    current_route: ReadSignal<Option<AppRoute>>,
    set_route: WriteSignal<Option<AppRoute>>,
    /// 认证状态检查（注入的信号，实现解耦）
    is_authenticated: Signal<bool>,
    /// 会话初始化是否完成
    is_ready: Signal<bool>,
}

impl RouterService {
    fn new(is_authenticated: Signal<bool>, is_ready: Signal<bool>) -> Self {
        let (current_route, set_route) = signal(None);

        Self {
            current_route,
            set_route,
            is_authenticated,
            is_ready,
        }
    }

    /// 获取当前路由信号
    pub fn current_route(&self) -> ReadSignal<Option<AppRoute>> {
        self.current_route
    }

    /// **核心方法：导航与守卫**
    ///
    /// 流程：请求 -> 验证(Guard) -> 处理 -> 加载
    pub fn navigate(&self, path: &str) {
        self.navigate_to_path(path, true);
    }

    /// 导航到指定路径
    ///
    /// # Arguments
    /// * `path` - 目标路径，可以带查询参数
    /// * `use_push` - true 使用 pushState, false 使用 replaceState
    fn navigate_to_path(&self, path: &str, use_push: bool) {
        if !self.is_ready.get_untracked() {
            log::debug!("[Router] session not ready, deferring navigation to {path}");
            write_history_state(path, use_push);
            return;
        }

        let is_auth = self.is_authenticated.get_untracked();
        let (location, route) = match AppRoute::guard(path, is_auth) {
            Navigation::Proceed(route) => (path.to_string(), route),
            Navigation::Redirect(target) => {
                log::info!("[Router] {path} not accessible, redirecting to {target}");
                let route = AppRoute::from_path(&target);
                (target, route)
            }
        };

        write_history_state(&location, use_push);
        set_document_title(route);
        self.set_route.set(Some(route));
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let router = *self;

        let closure = Closure::<dyn Fn()>::new(move || {
            // popstate 时也执行守卫逻辑，地址栏已经变化，只做替换
            router.navigate_to_path(&current_location(), false);
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 初始化完成及认证状态变化时重新执行守卫
    fn setup_auth_redirect(&self) {
        let router = *self;

        Effect::new(move |_| {
            let ready = router.is_ready.get();
            let is_auth = router.is_authenticated.get();
            if !ready {
                return;
            }

            let on_guest_page = router
                .current_route
                .get_untracked()
                .unwrap_or_else(|| AppRoute::from_path(&current_location()))
                .should_redirect_when_authenticated();

            if is_auth && on_guest_page {
                // 刚登录：回到登录前想去的页面
                let target = post_login_target(current_query_param(REDIRECT_QUERY_KEY).as_deref());
                log::info!("[Router] logged in, redirecting to {target}");
                router.navigate_to_path(&target, true);
            } else {
                // 首次守卫，或登出 / 会话过期后离开受保护页面
                router.navigate_to_path(&current_location(), false);
            }
        });
    }
}

/// 提供路由服务到 Context 并初始化
fn provide_router(is_authenticated: Signal<bool>, is_ready: Signal<bool>) -> RouterService {
    let router = RouterService::new(is_authenticated, is_ready);

    // 初始化监听器
    router.init_popstate_listener();
    router.setup_auth_redirect();

    provide_context(router);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
///
/// 提供路由上下文，应在 App 根部使用。
#[component]
pub fn Router(
    /// 认证状态信号
    is_authenticated: Signal<bool>,
    /// 会话初始化完成信号
    is_ready: Signal<bool>,
    /// 子组件
    children: Children,
) -> impl IntoView {
    provide_router(is_authenticated, is_ready);

    children()
}

/// 路由出口组件
///
/// 根据当前路由状态渲染对应的组件。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前路由，返回对应视图
    matcher: fn(AppRoute) -> AnyView,
) -> impl IntoView {
    let router = use_router();

    move || match router.current_route().get() {
        Some(route) => matcher(route),
        None => view! {
            <div class="flex items-center justify-center min-h-screen">
                <span class="loading loading-spinner loading-lg text-primary"></span>
            </div>
        }
        .into_any(),
    }
}

/// 站内链接，点击时走路由守卫而不是整页跳转
#[component]
pub fn Link(
    /// 目标路径
    #[prop(into)]
    to: String,
    #[prop(into, optional)] class: String,
    children: Children,
) -> impl IntoView {
    let router = use_router();

    let target = to.clone();
    let on_click = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate(&target);
    };

    view! {
        <a href=to class=class on:click=on_click>
            {children()}
        </a>
    }
}
