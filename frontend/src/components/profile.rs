use crate::auth::{avatar_url, update_profile, upload_avatar, use_auth};
use crate::components::home::NavBar;
use crate::components::login::ErrorAlert;
use crate::web::file::{read_as_data_url, selected_file};
use fittrack_shared::protocol::ProfileUpdate;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 把输入框文本解析为可选数值，空串视为未填写
fn parse_optional<T: std::str::FromStr>(raw: &str) -> Result<Option<T>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(|_| ())
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[component]
pub fn ProfilePage() -> impl IntoView {
    let auth = use_auth();
    let user = auth.state.get_untracked().user;

    let (age, set_age) = signal(display(user.as_ref().and_then(|u| u.age)));
    let (height, set_height) = signal(display(user.as_ref().and_then(|u| u.height)));
    let (weight, set_weight) = signal(display(user.as_ref().and_then(|u| u.weight)));
    let (goal, set_goal) = signal(display(user.as_ref().and_then(|u| u.fitness_goal.clone())));
    let (form_error, set_form_error) = signal(Option::<String>::None);
    let (saved, set_saved) = signal(false);

    let is_submitting = move || auth.state.get().is_loading;
    let error_msg = Signal::derive(move || form_error.get().or_else(|| auth.state.get().error));

    let avatar = move || {
        auth.state
            .get()
            .user
            .and_then(|u| u.avatar)
            .map(|a| avatar_url(&auth, &a))
    };

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        set_saved.set(false);

        let parsed = (
            parse_optional::<u32>(&age.get()),
            parse_optional::<f64>(&height.get()),
            parse_optional::<f64>(&weight.get()),
        );
        let (Ok(age), Ok(height), Ok(weight)) = parsed else {
            set_form_error.set(Some("请输入有效的数字".to_string()));
            return;
        };
        set_form_error.set(None);

        let update = ProfileUpdate {
            age,
            height,
            weight,
            fitness_goal: Some(goal.get()).filter(|g| !g.trim().is_empty()),
            ..Default::default()
        };
        spawn_local(async move {
            if update_profile(auth, update).await {
                set_saved.set(true);
            }
        });
    };

    let on_avatar_selected = move |ev: leptos::ev::Event| {
        let Some(file) = selected_file(&ev) else {
            return;
        };
        set_saved.set(false);

        let started = read_as_data_url(&file, move |data_url| {
            spawn_local(async move {
                if upload_avatar(auth, data_url).await {
                    set_saved.set(true);
                }
            });
        });
        if let Err(e) = started {
            log::warn!("[Profile] avatar read failed: {e:?}");
            set_form_error.set(Some("无法读取图片文件".to_string()));
        }
    };

    view! {
        <NavBar />
        <main class="container mx-auto p-6 max-w-lg">
            <div class="flex items-center gap-4 mb-6">
                {move || avatar().map(|src| view! {
                    <div class="avatar"><div class="w-16 rounded-full"><img src=src /></div></div>
                })}
                <h1 class="text-2xl font-bold">"个人中心"</h1>
            </div>

            <label class="form-control mb-6">
                <span class="label-text">"更换头像"</span>
                <input type="file" accept="image/*" class="file-input file-input-bordered"
                    disabled=is_submitting on:change=on_avatar_selected />
            </label>

            <form class="card bg-base-100 shadow card-body" on:submit=on_submit>
                <ErrorAlert message=error_msg />
                <Show when=move || saved.get()>
                    <div role="status" class="alert alert-success text-sm py-2">"资料已更新"</div>
                </Show>

                <label class="form-control">
                    <span class="label-text">"年龄"</span>
                    <input class="input input-bordered" inputmode="numeric"
                        on:input=move |ev| set_age.set(event_target_value(&ev)) prop:value=age />
                </label>
                <label class="form-control">
                    <span class="label-text">"身高 (cm)"</span>
                    <input class="input input-bordered" inputmode="decimal"
                        on:input=move |ev| set_height.set(event_target_value(&ev)) prop:value=height />
                </label>
                <label class="form-control">
                    <span class="label-text">"体重 (kg)"</span>
                    <input class="input input-bordered" inputmode="decimal"
                        on:input=move |ev| set_weight.set(event_target_value(&ev)) prop:value=weight />
                </label>
                <label class="form-control">
                    <span class="label-text">"健身目标"</span>
                    <input class="input input-bordered"
                        on:input=move |ev| set_goal.set(event_target_value(&ev)) prop:value=goal />
                </label>

                <button class="btn btn-primary mt-4" disabled=is_submitting>"保存"</button>
            </form>
        </main>
    }
}
