//! 原生 Web API 封装模块
//!
//! 此模块提供对浏览器原生 API 的轻量级封装，为核心库的
//! `HttpClient` 与 `SessionStorage` 提供浏览器实现。

pub mod file;
mod http;
pub mod route;
pub mod router;
mod storage;
mod timer;

pub use http::FetchHttpClient;
pub use storage::BrowserStorage;
