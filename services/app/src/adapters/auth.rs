//! services/app/src/adapters/auth.rs
//!
//! The auth adapter: implements the `AuthGateway` port on top of the users and
//! auth_sessions tables. One `PgAuthClient` is created per connected client and
//! tracks that client's current session, broadcasting every change to its
//! subscribers.

use crate::adapters::db::DbAdapter;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use raffle_core::domain::{AuthUser, Credentials, Session};
use raffle_core::ports::{AuthGateway, PortError, PortResult, SessionChanges};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

//=========================================================================================
// Password Hashing
//=========================================================================================

pub fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

pub fn verify_password(password: &str, hashed_password: &str) -> PortResult<bool> {
    let parsed_hash = PasswordHash::new(hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        PortError::Unexpected("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct PgAuthClient {
    db: Arc<DbAdapter>,
    session_ttl: Duration,
    current: watch::Sender<Option<Session>>,
}

impl PgAuthClient {
    /// A client with no session.
    pub fn new(db: Arc<DbAdapter>, session_ttl: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            db,
            session_ttl,
            current,
        }
    }

    /// A client resuming the session identified by `access_token`, if it is still valid.
    pub async fn restore(
        db: Arc<DbAdapter>,
        session_ttl: Duration,
        access_token: Option<&str>,
    ) -> Self {
        let client = Self::new(db, session_ttl);
        if let Some(token) = access_token {
            match client.db.find_auth_session(token).await {
                Ok(session) => {
                    debug!("Restored auth session for {}", session.user.email);
                    client.current.send_replace(Some(session));
                }
                Err(e) => debug!("Could not restore auth session: {}", e),
            }
        }
        client
    }

    /// Registers a new account. Its role field is left empty.
    pub async fn sign_up(&self, credentials: &Credentials) -> PortResult<AuthUser> {
        let hashed = hash_password(&credentials.password)?;
        let user = self
            .db
            .create_user_with_email(&credentials.email, &hashed)
            .await?;
        info!("Registered user {}", user.email);
        Ok(user)
    }

    fn clear(&self) {
        self.current.send_if_modified(|current| current.take().is_some());
    }
}

//=========================================================================================
// `AuthGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthGateway for PgAuthClient {
    async fn sign_in(&self, credentials: &Credentials) -> PortResult<Session> {
        // Unknown email and wrong password look the same to the caller.
        let user_creds = match self.db.get_user_by_email(&credentials.email).await {
            Ok(creds) => creds,
            Err(PortError::NotFound(_)) => {
                return Err(PortError::InvalidCredentials(INVALID_CREDENTIALS.to_string()))
            }
            Err(e) => return Err(e),
        };
        if !verify_password(&credentials.password, &user_creds.hashed_password)? {
            return Err(PortError::InvalidCredentials(INVALID_CREDENTIALS.to_string()));
        }

        // A replaced session must not stay usable as a bearer token.
        let replaced = self
            .current
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone());
        if let Some(token) = replaced {
            self.db.delete_auth_session(&token).await?;
        }

        let access_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        self.db
            .create_auth_session(&access_token, user_creds.user_id, expires_at)
            .await?;

        let session = Session {
            access_token,
            user: AuthUser {
                user_id: user_creds.user_id,
                email: user_creds.email,
            },
            expires_at,
        };
        self.current.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> PortResult<()> {
        let token = self
            .current
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone());
        if let Some(token) = token {
            self.db.delete_auth_session(&token).await?;
            self.clear();
        }
        Ok(())
    }

    /// Re-validates the held session against the store. A session that expired
    /// or was deleted elsewhere is dropped and subscribers are told.
    async fn current_session(&self) -> PortResult<Option<Session>> {
        let held = self.current.borrow().clone();
        let Some(session) = held else {
            return Ok(None);
        };
        if session.is_expired_at(Utc::now()) {
            info!("Session for {} expired", session.user.email);
            self.clear();
            return Ok(None);
        }
        match self.db.find_auth_session(&session.access_token).await {
            Ok(session) => Ok(Some(session)),
            Err(PortError::NotFound(_)) => {
                info!("Session for {} was invalidated", session.user.email);
                self.clear();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> SessionChanges {
        let mut rx = self.current.subscribe();
        Box::pin(async_stream::stream! {
            while rx.changed().await.is_ok() {
                let session = rx.borrow_and_update().clone();
                yield session;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original_password() {
        let hashed = hash_password("correct horse").unwrap();
        assert_ne!(hashed, "correct horse");
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
