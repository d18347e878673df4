use crate::auth::{register, use_auth};
use crate::components::login::ErrorAlert;
use crate::web::route::AppRoute;
use crate::web::router::Link;
use fittrack_shared::protocol::RegisterRequest;
use leptos::prelude::*;
use leptos::task::spawn_local;

const FITNESS_GOALS: [&str; 5] = ["减脂塑形", "增肌增重", "保持健康", "提升体能", "康复训练"];

const MIN_PASSWORD_LEN: usize = 6;

/// 注册表单的本地校验，返回第一个错误
fn validate(username: &str, email: &str, password: &str, confirm: &str) -> Option<&'static str> {
    if username.trim().is_empty() || email.trim().is_empty() {
        return Some("请填写用户名和邮箱");
    }
    if !email.contains('@') {
        return Some("邮箱格式不正确");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Some("密码至少 6 位");
    }
    if password != confirm {
        return Some("两次输入的密码不一致");
    }
    None
}

#[component]
pub fn RegisterPage() -> impl IntoView {
    let auth = use_auth();

    let (username, set_username) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (confirm, set_confirm) = signal(String::new());
    let (goal, set_goal) = signal(String::new());
    let (form_error, set_form_error) = signal(Option::<String>::None);

    let is_submitting = move || auth.state.get().is_loading;
    let error_msg = Signal::derive(move || form_error.get().or_else(|| auth.state.get().error));

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if let Some(msg) = validate(&username.get(), &email.get(), &password.get(), &confirm.get())
        {
            set_form_error.set(Some(msg.to_string()));
            return;
        }
        set_form_error.set(None);

        let request = RegisterRequest {
            username: username.get().trim().to_string(),
            email: email.get().trim().to_string(),
            password: password.get(),
            fitness_goal: Some(goal.get()).filter(|g| !g.is_empty()),
            ..Default::default()
        };
        spawn_local(async move {
            register(auth, request).await;
        });
    };

    let text_input = move |id: &'static str,
                           label: &'static str,
                           kind: &'static str,
                           value: ReadSignal<String>,
                           set: WriteSignal<String>| {
        view! {
            <div class="form-control">
                <label class="label" for=id>
                    <span class="label-text">{label}</span>
                </label>
                <input
                    id=id
                    type=kind
                    on:input=move |ev| set.set(event_target_value(&ev))
                    prop:value=value
                    class="input input-bordered"
                    required
                />
            </div>
        }
    };

    view! {
        <div class="hero min-h-screen bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <div class="text-center mb-4">
                    <h1 class="text-3xl font-bold">"创建账号"</h1>
                    <p class="text-base-content/70">"开始记录你的饮食与训练"</p>
                </div>

                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <form class="card-body" on:submit=on_submit>
                        <ErrorAlert message=error_msg />

                        {text_input("username", "用户名", "text", username, set_username)}
                        {text_input("email", "邮箱", "email", email, set_email)}
                        {text_input("password", "密码", "password", password, set_password)}
                        {text_input("confirm", "确认密码", "password", confirm, set_confirm)}

                        <div class="form-control">
                            <label class="label" for="goal">
                                <span class="label-text">"健身目标"</span>
                            </label>
                            <select
                                id="goal"
                                class="select select-bordered"
                                on:change=move |ev| set_goal.set(event_target_value(&ev))
                            >
                                <option value="">"暂不选择"</option>
                                {FITNESS_GOALS
                                    .iter()
                                    .map(|g| view! { <option value=*g>{*g}</option> })
                                    .collect_view()}
                            </select>
                        </div>

                        <div class="form-control mt-6">
                            <button class="btn btn-primary" disabled=is_submitting>
                                {move || if is_submitting() {
                                    view! { <span class="loading loading-spinner"></span> "注册中..." }.into_any()
                                } else {
                                    "注册".into_any()
                                }}
                            </button>
                        </div>
                        <p class="text-center text-sm mt-2">
                            "已有账号？"
                            <Link to=AppRoute::Login.to_path() class="link link-primary">"去登录"</Link>
                        </p>
                    </form>
                </div>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_register_form() {
        assert_eq!(validate("", "a@b.c", "secret1", "secret1"), Some("请填写用户名和邮箱"));
        assert_eq!(validate("bob", "bob", "secret1", "secret1"), Some("邮箱格式不正确"));
        assert_eq!(validate("bob", "b@x.io", "123", "123"), Some("密码至少 6 位"));
        assert_eq!(
            validate("bob", "b@x.io", "secret1", "secret2"),
            Some("两次输入的密码不一致")
        );
        assert_eq!(validate("bob", "b@x.io", "secret1", "secret1"), None);
    }
}
