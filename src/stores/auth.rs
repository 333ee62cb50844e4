//! Auth session state machine.
//!
//! Owns the current authenticated identity. Sessions are mediated entirely
//! by the identity backend; this store only tracks which of the three states
//! the app is in and surfaces transition outcomes as notices.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{DomainError, IdentityBackend};
use crate::models::user::User;
use crate::notify::Notifier;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(User),
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct AuthState {
    session: Session,
    error: Option<String>,
}

pub struct AuthStore {
    backend: Arc<dyn IdentityBackend>,
    state: RwLock<AuthState>,
    notifier: Notifier,
}

impl AuthStore {
    pub fn new(backend: Arc<dyn IdentityBackend>, notifier: Notifier) -> Self {
        Self {
            backend,
            state: RwLock::new(AuthState::default()),
            notifier,
        }
    }

    pub async fn session(&self) -> Session {
        self.state.read().await.session.clone()
    }

    /// By-value copy of the signed-in user, if any. Other stores read the
    /// identity through this, never through a shared reference.
    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.session.user().cloned()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), DomainError> {
        {
            let mut state = self.state.write().await;
            state.session = Session::Authenticating;
            state.error = None;
        }

        tracing::info!("Login attempt for {}", email);
        match self.backend.sign_in(email, password).await {
            Ok(user) => {
                self.state.write().await.session = Session::Authenticated(user);
                self.notifier.success("Successfully logged in!");
                Ok(())
            }
            Err(e) => {
                let message = failure_message(&e);
                let mut state = self.state.write().await;
                state.session = Session::Anonymous;
                state.error = Some(message.clone());
                drop(state);
                tracing::warn!("Login failed for {}: {}", email, message);
                self.notifier.error(message);
                Err(e)
            }
        }
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<(), DomainError> {
        {
            let mut state = self.state.write().await;
            state.session = Session::Authenticating;
            state.error = None;
        }

        match self.backend.sign_up(email, password, username).await {
            Ok(user) => {
                self.state.write().await.session = Session::Authenticated(user);
                self.notifier.success("Account created successfully!");
                Ok(())
            }
            Err(e) => {
                let message = failure_message(&e);
                let mut state = self.state.write().await;
                state.session = Session::Anonymous;
                state.error = Some(message.clone());
                drop(state);
                self.notifier.error(message);
                Err(e)
            }
        }
    }

    /// A failed logout keeps the session: better to still be signed in than
    /// to believe you are signed out while the backend disagrees.
    pub async fn logout(&self) -> Result<(), DomainError> {
        let previous = {
            let mut state = self.state.write().await;
            let previous = state.session.clone();
            state.session = Session::Authenticating;
            state.error = None;
            previous
        };

        match self.backend.sign_out().await {
            Ok(()) => {
                self.state.write().await.session = Session::Anonymous;
                self.notifier.success("Logged out successfully");
                Ok(())
            }
            Err(e) => {
                let message = failure_message(&e);
                let mut state = self.state.write().await;
                state.session = previous;
                state.error = Some(message.clone());
                drop(state);
                self.notifier.error(message);
                Err(e)
            }
        }
    }

    /// Ask the backend whether a valid session exists and settle into the
    /// matching state. Safe to call repeatedly; a missing session is not an
    /// error, so this is how state survives a restart.
    pub async fn check_session(&self) -> Session {
        {
            let mut state = self.state.write().await;
            state.session = Session::Authenticating;
        }

        let resolved = match self.backend.current_user().await {
            Ok(Some(user)) => Session::Authenticated(user),
            Ok(None) => Session::Anonymous,
            Err(e) => {
                self.state.write().await.error = Some(failure_message(&e));
                Session::Anonymous
            }
        };

        self.state.write().await.session = resolved.clone();
        resolved
    }
}

/// Surface the backend's own message for auth failures, a generic rendering
/// otherwise.
fn failure_message(error: &DomainError) -> String {
    match error {
        DomainError::AuthFailed(message) => message.clone(),
        other => other.to_string(),
    }
}
