//! 请求管线
//!
//! 每个请求的状态机：附加令牌 -> 发送 -> 2xx 解析信封；
//! 首次 401 时刷新一次访问令牌并重放原请求，重放的结果原样返回。
//! 刷新失败则清空会话并通知 `on_session_expired` 监听器。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fittrack_shared::protocol::ApiRequest;
use fittrack_shared::{ApiResponse, HEADER_AUTHORIZATION};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{AuthError, AuthResult};
use crate::request::{HttpClient, HttpRequest, HttpResponse};
use crate::session::{Session, SessionStore};
use crate::storage::SessionStorage;

const STATUS_UNAUTHORIZED: u16 = 401;

/// 会话上下文
///
/// 应用启动时创建一次，注入到所有需要认证的组件中。
/// 持有传输层、会话存储以及 UI 可观察的加载 / 错误状态。
pub struct AuthSession<C: HttpClient, S: SessionStorage> {
    pub(crate) http: C,
    pub(crate) config: ClientConfig,
    pub(crate) store: SessionStore<S>,
    /// 进行中的登录 / 注册 / 资料更新数量
    pub(crate) in_flight: Cell<u32>,
    pub(crate) last_error: RefCell<Option<String>>,
    on_expired: RefCell<Vec<Rc<dyn Fn()>>>,
}

/// 正在处理中的请求及其一次性重试标记
#[derive(Debug)]
pub struct PendingRequest<'a, R> {
    pub request: &'a R,
    pub attempted_refresh: bool,
}

impl<'a, R: ApiRequest> PendingRequest<'a, R> {
    pub fn new(request: &'a R) -> Self {
        Self {
            request,
            attempted_refresh: !R::REFRESH_ON_UNAUTHORIZED,
        }
    }
}

impl<C: HttpClient, S: SessionStorage> AuthSession<C, S> {
    /// 创建会话上下文，并立即从存储中恢复上一次的会话
    pub fn new(http: C, storage: S, config: ClientConfig) -> Self {
        Self {
            http,
            config,
            store: SessionStore::restore(storage),
            in_flight: Cell::new(0),
            last_error: RefCell::new(None),
            on_expired: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.get() > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// 会话变化监听（登录、刷新、强制清除等）
    pub fn subscribe(&self, listener: impl Fn(&Session) + 'static) {
        self.store.subscribe(listener);
    }

    /// 刷新失败、会话被强制清除后调用，应用在此跳转到登录页
    pub fn on_session_expired(&self, callback: impl Fn() + 'static) {
        self.on_expired.borrow_mut().push(Rc::new(callback));
    }

    // =========================================================
    // 管线
    // =========================================================

    /// 发送请求并返回完整的响应信封
    ///
    /// 信封中的 `success` 由调用方判断；非 2xx 状态转换为 `AuthError`。
    pub async fn send<R: ApiRequest>(&self, request: &R) -> AuthResult<ApiResponse<R::Response>> {
        let mut pending = PendingRequest::new(request);

        loop {
            let bearer = self.store.access_token();
            let response = self.dispatch(pending.request, bearer.as_deref()).await?;

            if response.status == STATUS_UNAUTHORIZED && !pending.attempted_refresh {
                pending.attempted_refresh = true;
                debug!(path = R::PATH, "received 401, refreshing access token");

                if let Err(e) = self.refresh_access_token().await {
                    warn!(path = R::PATH, error = %e, "token refresh failed, session expired");
                    self.expire_session();
                    return Err(e);
                }
                continue;
            }

            return interpret::<R::Response>(R::PATH, response);
        }
    }

    /// 附加凭据并发送一次
    pub(crate) async fn dispatch<R: ApiRequest>(
        &self,
        request: &R,
        bearer: Option<&str>,
    ) -> AuthResult<HttpResponse> {
        let url = self.config.endpoint_url(R::PATH);
        let mut req = HttpRequest::new(&url, R::METHOD);

        if let Some(token) = bearer {
            req = req.with_header(HEADER_AUTHORIZATION, &format!("Bearer {token}"));
        }
        if R::HAS_BODY {
            req = req.with_json(request)?;
        }

        let response = self.http.send(req).await?;
        debug!(
            method = R::METHOD.as_str(),
            path = R::PATH,
            status = response.status,
            "request completed"
        );
        Ok(response)
    }

    /// 清除本地会话（不通知服务端）
    pub fn clear(&self) {
        self.store.clear();
    }

    fn expire_session(&self) {
        self.store.clear();
        info!("session expired, redirecting to login");

        let callbacks: Vec<Rc<dyn Fn()>> = self.on_expired.borrow().clone();
        for callback in callbacks {
            callback();
        }
    }
}

/// 把 HTTP 响应转换为信封或错误
pub(crate) fn interpret<T: serde::de::DeserializeOwned>(
    path: &str,
    response: HttpResponse,
) -> AuthResult<ApiResponse<T>> {
    if response.is_success() {
        return response
            .json::<ApiResponse<T>>()
            .map_err(|e| AuthError::Decode(e.to_string()));
    }

    let message = rejection_message(&response);
    debug!(path, status = response.status, "request rejected");

    Err(match response.status {
        STATUS_UNAUTHORIZED => AuthError::Unauthorized(message),
        status if status >= 500 => AuthError::Server { status, message },
        _ => AuthError::Validation(message),
    })
}

/// 从错误响应体中提取消息，无法解析时回退到状态码描述
fn rejection_message(response: &HttpResponse) -> String {
    let fallback = format!("请求失败 (HTTP {})", response.status);
    response
        .json::<ApiResponse<serde::de::IgnoredAny>>()
        .map(|env| env.failure_message(&fallback))
        .unwrap_or(fallback)
}
