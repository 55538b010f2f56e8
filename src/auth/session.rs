use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::auth::token::{TokenService, EXTERNAL_CHALLENGE, EXTERNAL_IDENTITY, SESSION};
use crate::auth::{
    Challenge, ChallengeState, CredentialStore, ExternalLoginInfo, ExternalScheme, Principal,
    SessionContext, SessionManager, SessionTicket, SignInResult,
};
use crate::config::ExternalProviderConfig;
use crate::error::AppError;
use crate::models::User;

pub const SESSION_COOKIE: &str = "EmployeeManagement.Session";
pub const EXTERNAL_COOKIE: &str = "EmployeeManagement.External";

/// Lifetime of a session, and the max-age of a persistent session cookie.
pub const SESSION_LIFETIME_DAYS: i64 = 14;
const EXTERNAL_IDENTITY_LIFETIME_MINUTES: i64 = 5;
const CHALLENGE_LIFETIME_MINUTES: i64 = 15;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    email: String,
    roles: Vec<String>,
    stamp: String,
}

/// Session manager backed by signed JWT cookies.
pub struct CookieSessionManager {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    providers: Vec<ExternalProviderConfig>,
    public_base_url: String,
    secure_cookies: bool,
}

impl CookieSessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: TokenService,
        providers: Vec<ExternalProviderConfig>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let public_base_url = public_base_url.into();
        Self {
            store,
            tokens,
            providers,
            secure_cookies: public_base_url.starts_with("https://"),
            public_base_url,
        }
    }

    fn ticket(&self, user: &User, persistent: bool) -> Result<SessionTicket, AppError> {
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            stamp: user.security_stamp.clone(),
        };
        let token = self
            .tokens
            .issue(SESSION, claims, chrono::Duration::days(SESSION_LIFETIME_DAYS))?;
        Ok(SessionTicket {
            token,
            persistent,
            secure: self.secure_cookies,
        })
    }

    fn sign_in_checked(&self, user: Option<User>, persistent: bool) -> Result<SignInResult, AppError> {
        match user {
            None => Ok(SignInResult::Failed),
            Some(user) if !user.email_confirmed => {
                log::info!("Sign-in not allowed for unconfirmed user {}", user.id);
                Ok(SignInResult::NotAllowed)
            }
            Some(user) => {
                log::info!("User {} signed in", user.id);
                Ok(SignInResult::Succeeded(self.ticket(&user, persistent)?))
            }
        }
    }

    /// Value for the external-identity cookie, set once a provider handshake completes.
    pub fn issue_external_identity(&self, info: &ExternalLoginInfo) -> Result<String, AppError> {
        self.tokens.issue(
            EXTERNAL_IDENTITY,
            info.clone(),
            chrono::Duration::minutes(EXTERNAL_IDENTITY_LIFETIME_MINUTES),
        )
    }
}

#[async_trait]
impl SessionManager for CookieSessionManager {
    async fn password_sign_in(
        &self,
        email: &str,
        password: &str,
        persistent: bool,
    ) -> Result<SignInResult, AppError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(SignInResult::Failed);
        };
        if !user.email_confirmed {
            return self.sign_in_checked(Some(user), persistent);
        }
        if !self.store.check_password(&user, password).await? {
            log::info!("Failed password sign-in for user {}", user.id);
            return Ok(SignInResult::Failed);
        }
        self.sign_in_checked(Some(user), persistent)
    }

    async fn external_login_sign_in(
        &self,
        provider: &str,
        provider_key: &str,
        persistent: bool,
    ) -> Result<SignInResult, AppError> {
        let user = self.store.find_by_login(provider, provider_key).await?;
        self.sign_in_checked(user, persistent)
    }

    fn sign_in(&self, user: &User, persistent: bool) -> Result<SessionTicket, AppError> {
        log::info!("User {} signed in", user.id);
        self.ticket(user, persistent)
    }

    fn external_schemes(&self) -> Vec<ExternalScheme> {
        self.providers
            .iter()
            .map(|p| ExternalScheme {
                name: p.name.clone(),
                display_name: p.name.clone(),
            })
            .collect()
    }

    fn configure_external_challenge(
        &self,
        provider: &str,
        redirect_url: &str,
    ) -> Result<Challenge, AppError> {
        let config = self
            .providers
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(provider))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown external provider '{}'", provider)))?;

        let state = self.tokens.issue(
            EXTERNAL_CHALLENGE,
            ChallengeState {
                provider: config.name.clone(),
                redirect_url: redirect_url.to_string(),
            },
            chrono::Duration::minutes(CHALLENGE_LIFETIME_MINUTES),
        )?;

        let callback = format!(
            "{}/signin-{}",
            self.public_base_url.trim_end_matches('/'),
            config.name.to_lowercase()
        );
        let mut location = Url::parse(&config.authorize_url)
            .map_err(|e| AppError::InternalServerError(format!("Bad authorize URL: {}", e)))?;
        location
            .query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("redirect_uri", &callback)
            .append_pair("state", &state);

        Ok(Challenge {
            provider: config.name.clone(),
            location: location.into(),
        })
    }

    fn challenge_state(&self, state: &str) -> Option<ChallengeState> {
        self.tokens.verify(EXTERNAL_CHALLENGE, state).ok()
    }

    fn external_login_info(&self, ctx: &SessionContext) -> Option<ExternalLoginInfo> {
        let cookie = ctx.external_cookie.as_deref()?;
        self.tokens.verify(EXTERNAL_IDENTITY, cookie).ok()
    }

    fn principal(&self, ctx: &SessionContext) -> Option<Principal> {
        let cookie = ctx.session_cookie.as_deref()?;
        let claims: SessionClaims = self.tokens.verify(SESSION, cookie).ok()?;
        Some(Principal {
            user_id: claims.sub,
            email: claims.email,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryCredentialStore;
    use crate::config::PasswordPolicy;

    const TEST_HASH_COST: u32 = 4;
    const PASSWORD: &str = "Str0ng#Password";

    fn fixture() -> (Arc<InMemoryCredentialStore>, CookieSessionManager) {
        let tokens = TokenService::new("session-test-secret");
        let store = Arc::new(
            InMemoryCredentialStore::new(
                PasswordPolicy::default(),
                tokens.clone(),
                chrono::Duration::hours(24),
            )
            .with_hash_cost(TEST_HASH_COST),
        );
        let session = CookieSessionManager::new(
            store.clone(),
            tokens,
            vec![ExternalProviderConfig::google("client-1".into())],
            "http://localhost:8080/",
        );
        (store, session)
    }

    async fn user(store: &InMemoryCredentialStore, email: &str, confirmed: bool) -> User {
        store.create(User::new(email, None), Some(PASSWORD)).await.unwrap();
        let user = store.find_by_email(email).await.unwrap().unwrap();
        if confirmed {
            let token = store.generate_email_confirmation_token(&user).await.unwrap();
            store.confirm_email(&user, &token).await.unwrap();
        }
        store.find_by_email(email).await.unwrap().unwrap()
    }

    #[actix_rt::test]
    async fn test_password_sign_in_outcomes() {
        let (store, session) = fixture();
        user(&store, "confirmed@example.com", true).await;
        user(&store, "pending@example.com", false).await;

        let result = session
            .password_sign_in("confirmed@example.com", PASSWORD, true)
            .await
            .unwrap();
        let SignInResult::Succeeded(ticket) = result else {
            panic!("expected success, got {:?}", result);
        };
        assert!(ticket.persistent);
        assert!(!ticket.secure);

        let ctx = SessionContext {
            session_cookie: Some(ticket.token),
            external_cookie: None,
        };
        assert_eq!(session.principal(&ctx).unwrap().email, "confirmed@example.com");

        assert_eq!(
            session
                .password_sign_in("confirmed@example.com", "Wrong#Pass123", false)
                .await
                .unwrap(),
            SignInResult::Failed
        );
        assert_eq!(
            session
                .password_sign_in("pending@example.com", PASSWORD, false)
                .await
                .unwrap(),
            SignInResult::NotAllowed
        );
        assert_eq!(
            session
                .password_sign_in("nobody@example.com", PASSWORD, false)
                .await
                .unwrap(),
            SignInResult::Failed
        );
    }

    #[actix_rt::test]
    async fn test_https_base_url_issues_secure_tickets() {
        let (store, _) = fixture();
        let user = user(&store, "mary@example.com", true).await;
        let session = CookieSessionManager::new(
            store,
            TokenService::new("session-test-secret"),
            Vec::new(),
            "https://staff.example.com",
        );
        assert!(session.sign_in(&user, false).unwrap().secure);
    }

    #[actix_rt::test]
    async fn test_external_sign_in_requires_link() {
        let (store, session) = fixture();
        let user = user(&store, "linked@example.com", true).await;

        let result = session.external_login_sign_in("Google", "g-1", false).await.unwrap();
        assert_eq!(result, SignInResult::Failed);

        let info = ExternalLoginInfo {
            provider: "Google".into(),
            provider_key: "g-1".into(),
            email: Some("linked@example.com".into()),
            display_name: None,
        };
        store.add_login(&user, info.to_login()).await.unwrap();
        let result = session.external_login_sign_in("Google", "g-1", false).await.unwrap();
        assert!(matches!(result, SignInResult::Succeeded(_)));
    }

    #[actix_rt::test]
    async fn test_challenge_carries_redirect_in_state() {
        let (_, session) = fixture();
        let challenge = session
            .configure_external_challenge("google", "/Account/ExternalLoginCallback?returnUrl=%2F")
            .unwrap();
        assert_eq!(challenge.provider, "Google");

        let location = Url::parse(&challenge.location).unwrap();
        assert_eq!(location.host_str(), Some("accounts.google.com"));
        let pairs: std::collections::HashMap<_, _> = location.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "client-1");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8080/signin-google");

        let state = session.challenge_state(&pairs["state"]).unwrap();
        assert_eq!(state.redirect_url, "/Account/ExternalLoginCallback?returnUrl=%2F");

        assert!(matches!(
            session.configure_external_challenge("Facebook", "/"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[actix_rt::test]
    async fn test_external_identity_cookie_round_trip() {
        let (_, session) = fixture();
        let info = ExternalLoginInfo {
            provider: "Google".into(),
            provider_key: "g-7".into(),
            email: None,
            display_name: Some("Sam".into()),
        };
        let ctx = SessionContext {
            session_cookie: None,
            external_cookie: Some(session.issue_external_identity(&info).unwrap()),
        };
        assert_eq!(session.external_login_info(&ctx), Some(info));
        // An external identity is not a session.
        assert!(session.principal(&ctx).is_none());
    }
}
