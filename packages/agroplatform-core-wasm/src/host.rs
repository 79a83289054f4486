use wasm_bindgen::prelude::*;

// Effects provided by the host app on the global `wasmJsHelpers` object.
// Every function returns a Promise.
#[wasm_bindgen]
extern "C" {
    // Resolves to {status: number, body: string}; rejects only on network failure
    #[wasm_bindgen(js_namespace = wasmJsHelpers, catch)]
    pub fn request(
        method: &str,
        url: &str,
        headers_json: &str,
        body: Option<String>,
        timeout_ms: u32,
    ) -> Result<js_sys::Promise, JsValue>;

    // Resolves to "granted" or "denied"
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = requestForegroundPermission, catch)]
    pub fn request_foreground_permission() -> Result<js_sys::Promise, JsValue>;

    // Resolves to {latitude, longitude}
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = getCurrentPosition, catch)]
    pub fn get_current_position() -> Result<js_sys::Promise, JsValue>;

    // Resolves to the stored string or null
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = secureGet, catch)]
    pub fn secure_get(key: &str) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = secureSet, catch)]
    pub fn secure_set(key: &str, value: &str) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = secureDelete, catch)]
    pub fn secure_delete(key: &str) -> Result<js_sys::Promise, JsValue>;
}
