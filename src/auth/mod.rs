//! Identity collaborators of the account workflow.
//!
//! [`CredentialStore`] owns user records, password hashes, security stamps and
//! the tokens bound to them. [`SessionManager`] turns a verified identity into
//! a signed session cookie and reads the cookies back. The workflow in
//! `crate::account` only ever talks to these two traits.

pub mod extractors;
pub mod middleware;
pub mod password;
pub mod session;
pub mod store;
pub mod token;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ExternalLogin, User};

pub use extractors::{CurrentPrincipal, SessionContext};
pub use middleware::RequireSession;
pub use password::{hash_password, verify_password};
pub use session::CookieSessionManager;
pub use store::InMemoryCredentialStore;
pub use token::TokenService;

pub const ADMIN_ROLE: &str = "Admin";

/// A single failure reported by the credential store, e.g. a weak password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityError {
    pub code: &'static str,
    pub description: String,
}

impl IdentityError {
    pub fn new(code: &'static str, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    pub fn invalid_token() -> Self {
        Self::new("InvalidToken", "Invalid token.")
    }
}

/// Result of a credential store mutation. Empty `errors` means success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityResult {
    pub errors: Vec<IdentityError>,
}

impl IdentityResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failed(errors: Vec<IdentityError>) -> Self {
        Self { errors }
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The identity an external provider vouched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLoginInfo {
    pub provider: String,
    pub provider_key: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ExternalLoginInfo {
    pub fn to_login(&self) -> ExternalLogin {
        ExternalLogin {
            provider: self.provider.clone(),
            provider_key: self.provider_key.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// The signed-in user as carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// A freshly issued session cookie value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub token: String,
    /// Persistent tickets survive a browser restart ("remember me").
    pub persistent: bool,
    /// Only send the cookie over https.
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResult {
    Succeeded(SessionTicket),
    /// Credentials were fine but the account may not sign in yet (unconfirmed email).
    NotAllowed,
    Failed,
}

/// An external provider the login page can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalScheme {
    pub name: String,
    pub display_name: String,
}

/// Opaque `state` carried through the provider round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeState {
    pub provider: String,
    pub redirect_url: String,
}

/// Redirect to an external provider's authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub provider: String,
    pub location: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stores a new user, hashing `password` when one is given.
    async fn create(&self, user: User, password: Option<&str>) -> Result<IdentityResult, AppError>;

    /// Looks a user up by id. Ids that do not parse simply find nothing.
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_login(&self, provider: &str, provider_key: &str)
        -> Result<Option<User>, AppError>;

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, AppError>;

    async fn generate_email_confirmation_token(&self, user: &User) -> Result<String, AppError>;

    async fn confirm_email(&self, user: &User, token: &str) -> Result<IdentityResult, AppError>;

    async fn generate_password_reset_token(&self, user: &User) -> Result<String, AppError>;

    async fn reset_password(
        &self,
        user: &User,
        token: &str,
        new_password: &str,
    ) -> Result<IdentityResult, AppError>;

    async fn add_login(&self, user: &User, login: ExternalLogin) -> Result<IdentityResult, AppError>;

    async fn add_to_role(&self, user: &User, role: &str) -> Result<IdentityResult, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Checks the password and, if the account may sign in, issues a session.
    async fn password_sign_in(
        &self,
        email: &str,
        password: &str,
        persistent: bool,
    ) -> Result<SignInResult, AppError>;

    /// Signs in the user linked to the given external login, if any.
    async fn external_login_sign_in(
        &self,
        provider: &str,
        provider_key: &str,
        persistent: bool,
    ) -> Result<SignInResult, AppError>;

    /// Issues a session for an already verified user.
    fn sign_in(&self, user: &User, persistent: bool) -> Result<SessionTicket, AppError>;

    fn external_schemes(&self) -> Vec<ExternalScheme>;

    /// Builds the provider redirect; `redirect_url` travels inside the opaque state.
    fn configure_external_challenge(
        &self,
        provider: &str,
        redirect_url: &str,
    ) -> Result<Challenge, AppError>;

    /// Decodes the `state` a provider hands back, if this app signed it.
    fn challenge_state(&self, state: &str) -> Option<ChallengeState>;

    fn external_login_info(&self, ctx: &SessionContext) -> Option<ExternalLoginInfo>;

    fn principal(&self, ctx: &SessionContext) -> Option<Principal>;
}
