//! 文件读取封装模块
//!
//! 使用原生 `FileReader` 把用户选择的文件读成 data URL。

use wasm_bindgen::prelude::*;

/// 取出 `<input type="file">` 当前选中的第一个文件
pub fn selected_file(ev: &web_sys::Event) -> Option<web_sys::File> {
    let input: web_sys::HtmlInputElement = ev.target()?.dyn_into().ok()?;
    input.files()?.get(0)
}

/// 异步读取文件为 data URL，读取完成后调用一次 `on_loaded`
pub fn read_as_data_url<F>(file: &web_sys::File, on_loaded: F) -> Result<(), JsValue>
where
    F: FnOnce(String) + 'static,
{
    let reader = web_sys::FileReader::new()?;

    let source = reader.clone();
    let onload = Closure::once_into_js(move || match source.result() {
        Ok(value) => match value.as_string() {
            Some(data_url) => on_loaded(data_url),
            None => log::warn!("[File] reader result is not a string"),
        },
        Err(e) => log::warn!("[File] read failed: {e:?}"),
    });

    reader.set_onload(Some(onload.unchecked_ref()));
    reader.read_as_data_url(file)
}
