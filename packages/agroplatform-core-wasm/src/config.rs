// Client configuration passed in from the host app
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
pub const DEFAULT_CREDENTIAL_KEY: &str = "access_token";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 15_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Backend root, e.g. "http://192.168.1.10:8000/"
    pub base_url: String,
    pub request_timeout_ms: u32,
    // Secure-storage key holding the access token
    pub credential_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
        }
    }
}

impl ClientConfig {
    // Read from a JS object; undefined/null yields the defaults
    pub fn from_js(value: JsValue) -> Result<Self, JsValue> {
        if value.is_undefined() || value.is_null() {
            return Ok(ClientConfig::default());
        }
        Ok(serde_wasm_bindgen::from_value(value)?)
    }

    /// Join an API path onto the base URL with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
