// Persisted credential storage
use std::cell::RefCell;
use std::collections::HashMap;

use wasm_bindgen_futures::JsFuture;

use crate::error::ApiError;
use crate::host;

/// Key/value storage for the access token.
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    async fn load(&self, key: &str) -> Result<Option<String>, ApiError>;
    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError>;
    async fn delete(&self, key: &str) -> Result<(), ApiError>;
}

// Host secure storage (expo-secure-store on device)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsSecureStore;

fn storage_error(err: wasm_bindgen::JsValue) -> ApiError {
    ApiError::storage(
        err.as_string()
            .unwrap_or_else(|| "Secure storage is unavailable".to_string()),
    )
}

impl CredentialStore for JsSecureStore {
    async fn load(&self, key: &str) -> Result<Option<String>, ApiError> {
        let promise = host::secure_get(key).map_err(storage_error)?;
        let value = JsFuture::from(promise).await.map_err(storage_error)?;
        Ok(value.as_string())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let promise = host::secure_set(key, value).map_err(storage_error)?;
        JsFuture::from(promise).await.map_err(storage_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        let promise = host::secure_delete(key).map_err(storage_error)?;
        JsFuture::from(promise).await.map_err(storage_error)?;
        Ok(())
    }
}

/// In-memory store for native callers and tests. Nothing survives a restart;
/// the wasm client always persists through `JsSecureStore`.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        block_on(async {
            assert_eq!(store.load("access_token").await.unwrap(), None);
            store.save("access_token", "abc").await.unwrap();
            assert_eq!(store.load("access_token").await.unwrap().as_deref(), Some("abc"));
            store.delete("access_token").await.unwrap();
            assert_eq!(store.load("access_token").await.unwrap(), None);
        });
    }
}
