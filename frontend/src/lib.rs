//! FitTrack 前端应用
//!
//! 采用 Context-Driven 的高内聚低耦合架构：
//! - `web::route`: 路由定义与守卫决策（领域模型）
//! - `web::router`: 路由服务（核心引擎）
//! - `web`: fetch / localStorage 适配器，接入核心库的会话管线
//! - `auth`: 认证上下文
//! - `components`: UI 组件层

mod auth;
mod components {
    pub mod home;
    pub mod login;
    pub mod profile;
    pub mod register;
}
mod web;

use crate::auth::{AuthContext, init_auth};
use crate::components::home::{HomePage, SectionPage};
use crate::components::login::LoginPage;
use crate::components::profile::ProfilePage;
use crate::components::register::RegisterPage;

use leptos::prelude::*;

use web::route::AppRoute;
use web::router::{Link, Router, RouterOutlet};

/// 路由匹配函数
///
/// 根据 AppRoute 枚举返回对应的视图组件。
fn route_matcher(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Home => view! { <HomePage /> }.into_any(),
        AppRoute::Login => view! { <LoginPage /> }.into_any(),
        AppRoute::Register => view! { <RegisterPage /> }.into_any(),
        AppRoute::Profile => view! { <ProfilePage /> }.into_any(),
        AppRoute::Diet
        | AppRoute::DietRecord
        | AppRoute::Exercise
        | AppRoute::ExerciseLog
        | AppRoute::AiPlan => view! { <SectionPage route=route /> }.into_any(),
        AppRoute::NotFound => view! {
            <div class="flex items-center justify-center min-h-screen bg-base-200">
                <div class="text-center">
                    <h1 class="text-6xl font-bold text-error">"404"</h1>
                    <p class="text-xl mt-4">"页面未找到"</p>
                    <Link to=AppRoute::Home.to_path() class="btn btn-primary mt-6">"返回首页"</Link>
                </div>
            </div>
        }
        .into_any(),
    }
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 创建认证上下文（从 localStorage 恢复会话）
    let auth_ctx = AuthContext::new();
    provide_context(auth_ctx);

    // 2. 补全会话（有令牌无用户资料时拉取 /auth/me）
    init_auth(&auth_ctx);

    // 3. 获取认证状态信号，用于注入路由服务
    let is_authenticated = auth_ctx.is_authenticated_signal();
    let is_ready = auth_ctx.is_ready_signal();

    view! {
        // 4. 路由器组件：初始化完成后才执行守卫
        <Router is_authenticated=is_authenticated is_ready=is_ready>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
}
