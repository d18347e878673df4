use crate::auth::{logout, use_auth};
use crate::web::route::AppRoute;
use crate::web::router::Link;
use leptos::prelude::*;
use leptos::task::spawn_local;

const NAV_ROUTES: [AppRoute; 6] = [
    AppRoute::Home,
    AppRoute::Diet,
    AppRoute::Exercise,
    AppRoute::ExerciseLog,
    AppRoute::AiPlan,
    AppRoute::Profile,
];

/// 顶部导航栏，显示当前用户与登出按钮
#[component]
pub fn NavBar() -> impl IntoView {
    let auth = use_auth();

    let username = move || {
        auth.state
            .get()
            .user
            .map(|u| u.username)
            .unwrap_or_default()
    };

    let on_logout = move |_| {
        spawn_local(async move {
            logout(auth).await;
        });
    };

    view! {
        <div class="navbar bg-base-100 shadow">
            <div class="flex-1 gap-2">
                <span class="text-xl font-bold px-2">"FitTrack"</span>
                {NAV_ROUTES
                    .iter()
                    .map(|route| view! {
                        <Link to=route.to_path() class="btn btn-ghost btn-sm">{route.title()}</Link>
                    })
                    .collect_view()}
            </div>
            <div class="flex-none gap-2">
                <span class="text-sm">{username}</span>
                <button class="btn btn-outline btn-sm" on:click=on_logout>"退出登录"</button>
            </div>
        </div>
    }
}

#[component]
pub fn HomePage() -> impl IntoView {
    let auth = use_auth();

    let greeting = move || {
        auth.state
            .get()
            .user
            .map(|u| format!("欢迎回来，{}", u.username))
            .unwrap_or_default()
    };
    let goal = move || {
        auth.state
            .get()
            .user
            .and_then(|u| u.fitness_goal)
            .unwrap_or_else(|| "尚未设置健身目标".to_string())
    };

    view! {
        <NavBar />
        <main class="container mx-auto p-6">
            <h1 class="text-2xl font-bold">{greeting}</h1>
            <p class="mt-2 text-base-content/70">{goal}</p>
        </main>
    }
}

/// 尚未实现具体内容的功能页
#[component]
pub fn SectionPage(route: AppRoute) -> impl IntoView {
    view! {
        <NavBar />
        <main class="container mx-auto p-6">
            <h1 class="text-2xl font-bold">{route.title()}</h1>
        </main>
    }
}
