//! Authentication service
//!
//! Login, registration, logout, and explicit session refresh against the
//! app's own API. Token persistence goes through the secure key-value
//! store; the request pipeline picks the tokens up from there.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::{KindredError, Result};
use crate::storage::{self, KeyValueStore, TokenPair, ACCESS_TOKEN_KEY};
use crate::types::AuthSession;

/// Explicitly constructed auth service
pub struct AuthService {
    api: Arc<ApiClient>,
    tokens: Arc<dyn KeyValueStore>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    data: Option<AuthSession>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>, tokens: Arc<dyn KeyValueStore>) -> Self {
        Self { api, tokens }
    }

    /// Log in with email/password; persists the token pair on success
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response: AuthResponse = self
            .api
            .post(
                "/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        self.install_session(response).await
    }

    /// Register a new account; persists the token pair on success
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthSession> {
        let response: AuthResponse = self
            .api
            .post(
                "/auth/register",
                serde_json::json!({ "email": email, "password": password, "name": name }),
            )
            .await?;
        self.install_session(response).await
    }

    /// Clear both tokens. Idempotent; never fails on missing keys.
    pub async fn logout(&self) -> Result<()> {
        storage::clear_tokens(self.tokens.as_ref()).await?;
        tracing::info!("Logged out, tokens cleared");
        Ok(())
    }

    /// Explicitly refresh the session, replacing the access token.
    /// On failure the user is logged out.
    pub async fn refresh_session(&self, session: &AuthSession) -> Result<AuthSession> {
        let response: std::result::Result<AuthResponse, KindredError> = self
            .api
            .post(
                "/auth/refresh",
                serde_json::json!({ "refreshToken": session.refresh_token }),
            )
            .await;

        match response {
            Ok(AuthResponse {
                success: true,
                data: Some(refreshed),
            }) => {
                // expiry must only move forward
                let expires_at = refreshed.expires_at.max(session.expires_at);
                let refreshed = AuthSession {
                    expires_at,
                    ..refreshed
                };
                self.tokens
                    .set(ACCESS_TOKEN_KEY, &refreshed.access_token)
                    .await?;
                Ok(refreshed)
            }
            Ok(_) => {
                self.logout().await?;
                Err(KindredError::AuthExpired)
            }
            Err(e) => {
                self.logout().await?;
                Err(e)
            }
        }
    }

    /// Whether a full token pair is currently stored
    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(storage::load_tokens(self.tokens.as_ref()).await?.is_some())
    }

    async fn install_session(&self, response: AuthResponse) -> Result<AuthSession> {
        let session = match response {
            AuthResponse {
                success: true,
                data: Some(session),
            } => session,
            _ => {
                return Err(KindredError::Unknown(
                    "Authentication response missing session data".to_string(),
                ))
            }
        };

        if session.access_token.is_empty() {
            return Err(KindredError::Unknown(
                "Authentication response carried an empty access token".to_string(),
            ));
        }

        storage::store_tokens(
            self.tokens.as_ref(),
            &TokenPair {
                access: session.access_token.clone(),
                refresh: session.refresh_token.clone(),
            },
        )
        .await?;

        tracing::info!(user_id = %session.user.id, "Session installed");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use crate::types::AuthUser;

    fn session(access: &str) -> AuthSession {
        AuthSession {
            user: AuthUser {
                id: "u1".into(),
                email: "a@b.c".into(),
                name: None,
                email_verified: true,
                created_at: Utc::now(),
            },
            access_token: access.into(),
            refresh_token: "ref".into(),
            expires_at: Utc::now(),
        }
    }

    fn service(tokens: Arc<MemoryStore>) -> AuthService {
        let api = Arc::new(ApiClient::new("https://api.example.com", tokens.clone()).unwrap());
        AuthService::new(api, tokens)
    }

    #[tokio::test]
    async fn install_session_persists_tokens() {
        let tokens = Arc::new(MemoryStore::new());
        let auth = service(tokens.clone());

        let installed = auth
            .install_session(AuthResponse {
                success: true,
                data: Some(session("acc-1")),
            })
            .await
            .unwrap();

        assert_eq!(installed.access_token, "acc-1");
        assert!(auth.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn empty_access_token_rejected() {
        let tokens = Arc::new(MemoryStore::new());
        let auth = service(tokens.clone());

        let result = auth
            .install_session(AuthResponse {
                success: true,
                data: Some(session("")),
            })
            .await;

        assert!(result.is_err());
        assert!(!auth.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let tokens = Arc::new(MemoryStore::new());
        let auth = service(tokens.clone());

        auth.install_session(AuthResponse {
            success: true,
            data: Some(session("acc-1")),
        })
        .await
        .unwrap();

        auth.logout().await.unwrap();
        auth.logout().await.unwrap();
        assert!(!auth.is_authenticated().await.unwrap());
    }
}
