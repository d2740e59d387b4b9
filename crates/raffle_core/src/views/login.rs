//! crates/raffle_core/src/views/login.rs
//!
//! The login form: submits credentials to the auth gateway and keeps the
//! failure message around for the next attempt.

use crate::domain::{Credentials, Session};
use crate::ports::{AuthGateway, PortError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// Bad email/password combination.
    #[error("{0}")]
    AuthenticationFailure(String),
    #[error("Sign-in is unavailable: {0}")]
    Unavailable(String),
    /// A session is already held; it has to be signed out first.
    #[error("Already signed in; sign out first")]
    AlreadySignedIn,
}

impl From<PortError> for LoginError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::InvalidCredentials(message) => LoginError::AuthenticationFailure(message),
            PortError::Unauthorized | PortError::NotFound(_) => {
                LoginError::AuthenticationFailure("Invalid email or password".to_string())
            }
            other => LoginError::Unavailable(other.to_string()),
        }
    }
}

/// State of the login form between submissions. The password is never kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    email: String,
    error: Option<String>,
}

impl LoginForm {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Signs in through the gateway.
    ///
    /// On failure the message is stored on the form, which stays in place for
    /// a retry. On success the session is handed back; routing away from the
    /// form is driven by the gateway's session-change notification.
    pub async fn submit(
        &mut self,
        auth: &dyn AuthGateway,
        credentials: Credentials,
    ) -> Result<Session, LoginError> {
        self.email = credentials.email.clone();
        match auth.sign_in(&credentials).await {
            Ok(session) => {
                info!("User {} signed in", session.user.email);
                self.error = None;
                Ok(session)
            }
            Err(e) => {
                let err = LoginError::from(e);
                warn!("Sign-in for {} failed: {}", credentials.email, err);
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
