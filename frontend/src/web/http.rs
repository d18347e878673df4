//! HTTP 请求封装模块
//!
//! 使用 `web_sys::fetch` 实现核心库的 `HttpClient`，
//! 超时通过 `AbortController` + `setTimeout` 实现。

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use fittrack::{HttpClient, HttpError, HttpRequest, HttpResponse};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, AbortSignal, Headers, Request, RequestInit, Response};

use super::timer::Timeout;

/// 基于 `window.fetch` 的 HTTP 客户端
pub struct FetchHttpClient {
    timeout: Duration,
}

impl FetchHttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn timeout_millis(&self) -> u32 {
        u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX)
    }
}

fn build_request(req: &HttpRequest, signal: &AbortSignal) -> Result<Request, HttpError> {
    let headers = Headers::new()
        .map_err(|e| HttpError::RequestBuildFailed(format!("创建 Headers 失败: {e:?}")))?;

    for (key, value) in &req.headers {
        headers
            .set(key, value)
            .map_err(|e| HttpError::RequestBuildFailed(format!("设置 Header 失败: {e:?}")))?;
    }

    let opts = RequestInit::new();
    opts.set_method(req.method.as_str());
    opts.set_headers(&headers.into());
    opts.set_signal(Some(signal));

    if let Some(body) = &req.body {
        opts.set_body(&JsValue::from_str(body));
    }

    Request::new_with_str_and_init(&req.url, &opts)
        .map_err(|e| HttpError::RequestBuildFailed(format!("{e:?}")))
}

async fn read_text(response: &Response) -> Result<String, JsValue> {
    let text = JsFuture::from(response.text()?).await?;
    Ok(text.as_string().unwrap_or_default())
}

#[async_trait(?Send)]
impl HttpClient for FetchHttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let controller = AbortController::new()
            .map_err(|e| HttpError::RequestBuildFailed(format!("{e:?}")))?;
        let request = build_request(&req, &controller.signal())?;

        let window = web_sys::window()
            .ok_or_else(|| HttpError::Network("无法获取 window 对象".to_string()))?;

        let timed_out = Rc::new(Cell::new(false));
        // 离开作用域时清除定时器
        let _timer = {
            let timed_out = timed_out.clone();
            let controller = controller.clone();
            Timeout::new(self.timeout_millis(), move || {
                timed_out.set(true);
                controller.abort();
            })
        };

        let failure = |e: JsValue| {
            if timed_out.get() {
                HttpError::Timeout(self.timeout)
            } else {
                HttpError::Network(format!("fetch 失败: {e:?}"))
            }
        };

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(&failure)?;

        let response: Response = resp_value.dyn_into().map_err(|e| {
            HttpError::ResponseParseFailed(format!("Response 类型转换失败: {e:?}"))
        })?;

        // 读取响应体期间同样受超时约束
        let body = read_text(&response).await.map_err(&failure)?;

        Ok(HttpResponse {
            status: response.status(),
            body,
        })
    }
}
