use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiErrorKind};
use crate::host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request over the wire.
///
/// Implementations only fail for transport problems; any HTTP status,
/// including errors, comes back as an `HttpResponse`.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

// Transport backed by the host's fetch helper
#[derive(Debug, Clone, Copy, Default)]
pub struct JsFetchTransport;

fn network_error(err: JsValue) -> ApiError {
    let detail = err
        .as_string()
        .unwrap_or_else(|| "request failed".to_string());
    ApiError::network(format!("Could not reach the server: {}", detail))
}

impl HttpTransport for JsFetchTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let headers_json = serde_json::to_string(&request.headers)
            .map_err(|e| ApiError::decode(format!("Failed to encode headers: {}", e)))?;
        let promise = host::request(
            request.method.as_str(),
            &request.url,
            &headers_json,
            request.body,
            request.timeout_ms,
        )
        .map_err(network_error)?;
        let result = JsFuture::from(promise).await.map_err(network_error)?;
        serde_wasm_bindgen::from_value(result)
            .map_err(|e| ApiError::decode(format!("Invalid response from fetch helper: {}", e)))
    }
}

/// The one HTTP client every backend service goes through.
///
/// Adds the JSON content type and the bearer token, normalizes every failure
/// into an `ApiError`, and drops the credentials when the backend answers 401.
pub struct ApiClient<T, S> {
    config: ClientConfig,
    transport: T,
    credentials: S,
    token: RefCell<Option<String>>,
}

impl<T: HttpTransport, S: CredentialStore> ApiClient<T, S> {
    pub fn new(config: ClientConfig, transport: T, credentials: S) -> Self {
        ApiClient {
            config,
            transport,
            credentials,
            token: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &S {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.borrow_mut() = token;
    }

    fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(token) = self.token.borrow().as_ref() {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }

    // Send a request and map every non-2xx answer to an ApiError
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        fallback: &str,
    ) -> Result<HttpResponse, ApiError> {
        let request = HttpRequest {
            method,
            url: self.config.url(path),
            headers: self.headers(),
            body,
            timeout_ms: self.config.request_timeout_ms,
        };
        log::debug!("{} {}", method.as_str(), request.url);

        let response = self.transport.send(request).await.map_err(|err| {
            log::warn!("{} {} failed: {}", method.as_str(), path, err);
            err
        })?;

        if response.status == 401 {
            self.handle_unauthorized().await;
        }
        if !response.is_success() {
            let err = ApiError::from_response(response.status, &response.body, fallback);
            log::warn!(
                "{} {} returned {}: {}",
                method.as_str(),
                path,
                response.status,
                err.message
            );
            return Err(err);
        }
        Ok(response)
    }

    // Expired or rejected token: forget it everywhere
    async fn handle_unauthorized(&self) {
        log::warn!("Token expired or unauthorized, clearing stored credentials");
        self.set_token(None);
        if let Err(err) = self.credentials.delete(&self.config.credential_key).await {
            log::error!("Failed to delete stored credentials: {}", err);
        }
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<R, ApiError> {
        let response = self.send(Method::Get, path, None, fallback).await?;
        decode_body(&response)
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<R, ApiError> {
        let response = self
            .send(Method::Post, path, Some(encode_body(body)?), fallback)
            .await?;
        decode_body(&response)
    }

    pub async fn put<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<R, ApiError> {
        let response = self
            .send(Method::Put, path, Some(encode_body(body)?), fallback)
            .await?;
        decode_body(&response)
    }

    pub async fn delete(&self, path: &str, fallback: &str) -> Result<(), ApiError> {
        self.send(Method::Delete, path, None, fallback).await?;
        Ok(())
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body)
        .map_err(|e| ApiError::new(ApiErrorKind::Decode, format!("Failed to encode request: {}", e)))
}

fn decode_body<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    serde_json::from_str(&response.body)
        .map_err(|e| ApiError::decode(format!("Unexpected response from server: {}", e)))
}
