use std::fmt;
use std::sync::Arc;

use driverqueue_auth::{AuthenticatorTrait, TokenIssuer};
use driverqueue_service::QueueService;

/// The single administrator allowed to operate the queue.
#[derive(Clone)]
pub struct AdminAccount {
    pub username: String,
    password_hash: String,
}

impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AdminAccount {
    /// `password_hash` must be an Argon2 PHC string.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        // Hash even on a username mismatch so both failures take the same time.
        let password_ok = driverqueue_auth::verify_password(password, &self.password_hash).is_ok();
        password_ok && username == self.username
    }
}

/// Session minting plus the credentials it is guarded by.
#[derive(Debug, Clone)]
pub struct Sessions {
    pub issuer: TokenIssuer,
    pub admin: AdminAccount,
}

/// Shared application state passed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub queue: QueueService,
    authenticator: Arc<dyn AuthenticatorTrait>,
    sessions: Option<Sessions>,
}

impl AppState {
    pub fn new(queue: QueueService, authenticator: Arc<dyn AuthenticatorTrait>) -> Self {
        Self {
            queue,
            authenticator,
            sessions: None,
        }
    }

    /// Enable `/auth/login`. Without it only pre-issued tokens are accepted.
    pub fn with_sessions(mut self, issuer: TokenIssuer, admin: AdminAccount) -> Self {
        self.sessions = Some(Sessions { issuer, admin });
        self
    }

    #[inline]
    pub fn authenticator(&self) -> &dyn AuthenticatorTrait {
        self.authenticator.as_ref()
    }

    #[inline]
    pub fn sessions(&self) -> Option<&Sessions> {
        self.sessions.as_ref()
    }
}
