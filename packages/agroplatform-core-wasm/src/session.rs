// Process-wide session: the single owner of the signed-in user and token
use std::cell::RefCell;
use std::rc::Rc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::http_client::{ApiClient, HttpTransport};
use crate::models::{AuthToken, SignInRequest, SignUpRequest, User};

// Claims the backend puts in its access tokens
#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    user_id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Derive the user from a JWT payload. The signature is not checked here;
/// the backend does that on every request.
pub fn decode_user(token: &str) -> Result<User, ApiError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ApiError::decode("Access token is not a JWT"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ApiError::decode(format!("Invalid access token encoding: {}", e)))?;
    let claims: TokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::decode(format!("Invalid access token claims: {}", e)))?;

    Ok(User {
        id: claims.user_id,
        email: claims.sub,
        username: claims.username,
        expires_at: claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
    })
}

pub struct SessionStore<T, S> {
    client: Rc<ApiClient<T, S>>,
    user: RefCell<Option<User>>,
}

impl<T: HttpTransport, S: CredentialStore> SessionStore<T, S> {
    pub fn new(client: Rc<ApiClient<T, S>>) -> Self {
        SessionStore {
            client,
            user: RefCell::new(None),
        }
    }

    pub fn client(&self) -> &Rc<ApiClient<T, S>> {
        &self.client
    }

    pub fn current_token(&self) -> Option<String> {
        self.client.token()
    }

    // The client drops its token on a 401, which ends the session too
    pub fn current_user(&self) -> Option<User> {
        self.client.token()?;
        self.user.borrow().clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = SignInRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let auth: AuthToken = self
            .client
            .post("/auth/login", &request, "Invalid credentials or network error")
            .await?;
        let user = self.establish(auth.token).await?;
        log::info!("Signed in as {}", user.email);
        Ok(user)
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<User, ApiError> {
        let auth: AuthToken = self
            .client
            .post("/auth/register", request, "Could not create the account")
            .await?;
        let user = self.establish(auth.token).await?;
        log::info!("Registered {}", user.email);
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), ApiError> {
        self.clear();
        self.client
            .credentials()
            .delete(&self.client.config().credential_key)
            .await?;
        log::info!("Signed out");
        Ok(())
    }

    /// Restore the session from the persisted credential.
    pub async fn refresh(&self) -> Result<Option<User>, ApiError> {
        self.refresh_at(Utc::now()).await
    }

    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Option<User>, ApiError> {
        let key = &self.client.config().credential_key;
        let Some(token) = self.client.credentials().load(key).await? else {
            self.clear();
            return Ok(None);
        };

        let user = match decode_user(&token) {
            Ok(user) if user.expires_at.map_or(true, |exp| exp > now) => user,
            Ok(_) => {
                log::info!("Stored access token has expired");
                self.sign_out().await?;
                return Ok(None);
            }
            Err(err) => {
                log::warn!("Discarding stored access token: {}", err);
                self.sign_out().await?;
                return Ok(None);
            }
        };

        self.client.set_token(Some(token));
        *self.user.borrow_mut() = Some(user.clone());
        Ok(Some(user))
    }

    async fn establish(&self, token: String) -> Result<User, ApiError> {
        let user = decode_user(&token)?;
        self.client
            .credentials()
            .save(&self.client.config().credential_key, &token)
            .await?;
        self.client.set_token(Some(token));
        *self.user.borrow_mut() = Some(user.clone());
        Ok(user)
    }

    fn clear(&self) {
        self.client.set_token(None);
        *self.user.borrow_mut() = None;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::token_for;
    use super::*;
    use crate::config::ClientConfig;
    use crate::credentials::MemoryCredentialStore;
    use crate::error::ApiErrorKind;
    use crate::http_client::testing::FakeTransport;
    use futures::executor::block_on;

    // 2100-01-01
    const FAR_FUTURE: i64 = 4_102_444_800;

    fn session(store: MemoryCredentialStore) -> SessionStore<FakeTransport, MemoryCredentialStore> {
        let client = ApiClient::new(ClientConfig::default(), FakeTransport::new(), store);
        SessionStore::new(Rc::new(client))
    }

    #[test]
    fn decodes_claims_into_user() {
        let user = decode_user(&token_for(3, "ana@example.com", FAR_FUTURE)).unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.username.as_deref(), Some("Ana"));
        assert_eq!(user.expires_at.map(|t| t.timestamp()), Some(FAR_FUTURE));
    }

    #[test]
    fn rejects_non_jwt_tokens() {
        let err = decode_user("opaque-token").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Decode);
    }

    #[test]
    fn sign_in_persists_token_under_single_key() {
        let session = session(MemoryCredentialStore::new());
        let token = token_for(1, "ana@example.com", FAR_FUTURE);
        session
            .client()
            .transport()
            .respond(200, &format!(r#"{{"token":"{}","token_type":"bearer"}}"#, token));

        let user = block_on(session.sign_in(" ana@example.com ", "secret")).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(session.current_token().as_deref(), Some(token.as_str()));
        assert_eq!(session.current_user(), Some(user));
        assert_eq!(
            session.client().credentials().get("access_token").as_deref(),
            Some(token.as_str())
        );

        let request = session.client().transport().last_request();
        assert!(request.url.ends_with("/auth/login"));
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "ana@example.com");
    }

    #[test]
    fn failed_sign_in_surfaces_server_detail() {
        let session = session(MemoryCredentialStore::new());
        session
            .client()
            .transport()
            .respond(401, r#"{"detail":"Incorrect email or password"}"#);

        let err = block_on(session.sign_in("ana@example.com", "nope")).unwrap_err();
        assert_eq!(err.message, "Incorrect email or password");
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn sign_up_posts_registration() {
        let session = session(MemoryCredentialStore::new());
        let token = token_for(9, "new@example.com", FAR_FUTURE);
        session
            .client()
            .transport()
            .respond(201, &format!(r#"{{"token":"{}"}}"#, token));

        let request = SignUpRequest {
            email: "new@example.com".to_string(),
            password: "secret".to_string(),
            full_name: "New User".to_string(),
            avatar: None,
        };
        let user = block_on(session.sign_up(&request)).unwrap();
        assert_eq!(user.id, 9);
        assert!(session.client().transport().last_request().url.ends_with("/auth/register"));
    }

    #[test]
    fn refresh_restores_valid_token() {
        let token = token_for(4, "ana@example.com", FAR_FUTURE);
        let session = session(MemoryCredentialStore::with_entry("access_token", &token));

        let user = block_on(session.refresh()).unwrap();
        assert_eq!(user.map(|u| u.id), Some(4));
        assert_eq!(session.current_token(), Some(token));
    }

    #[test]
    fn refresh_drops_expired_token() {
        let token = token_for(4, "ana@example.com", 1_000);
        let session = session(MemoryCredentialStore::with_entry("access_token", &token));

        let user = block_on(session.refresh()).unwrap();
        assert_eq!(user, None);
        assert_eq!(session.current_token(), None);
        assert_eq!(session.client().credentials().get("access_token"), None);
    }

    #[test]
    fn refresh_without_stored_token_is_signed_out() {
        let session = session(MemoryCredentialStore::new());
        assert_eq!(block_on(session.refresh()).unwrap(), None);
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn sign_out_clears_everything() {
        let token = token_for(4, "ana@example.com", FAR_FUTURE);
        let session = session(MemoryCredentialStore::with_entry("access_token", &token));
        block_on(session.refresh()).unwrap();

        block_on(session.sign_out()).unwrap();
        assert_eq!(session.current_user(), None);
        assert_eq!(session.client().credentials().get("access_token"), None);
    }

    #[test]
    fn unauthorized_response_ends_session() {
        let token = token_for(4, "ana@example.com", FAR_FUTURE);
        let session = session(MemoryCredentialStore::with_entry("access_token", &token));
        block_on(session.refresh()).unwrap();
        session.client().transport().respond(401, "{}");

        let _ = block_on(session.client().get::<serde_json::Value>("/parcels/", "x"));
        assert_eq!(session.current_user(), None);
    }
}
