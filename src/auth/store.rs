use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::token::{TokenService, EMAIL_CONFIRMATION, RESET_PASSWORD};
use crate::auth::{
    hash_password, verify_password, CredentialStore, IdentityError, IdentityResult, ADMIN_ROLE,
};
use crate::config::PasswordPolicy;
use crate::error::AppError;
use crate::models::user::{new_security_stamp, normalize_email};
use crate::models::{ExternalLogin, User};

/// Claims of an email-confirmation or password-reset token.
#[derive(Debug, Serialize, Deserialize)]
struct UserTokenClaims {
    sub: Uuid,
    stamp: String,
}

/// Credential store that keeps users in process memory.
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<Uuid, User>>,
    policy: PasswordPolicy,
    tokens: TokenService,
    token_lifetime: chrono::Duration,
    hash_cost: u32,
    /// Normalized emails that are created in the Admin role.
    admin_emails: Vec<String>,
}

impl InMemoryCredentialStore {
    pub fn new(policy: PasswordPolicy, tokens: TokenService, token_lifetime: chrono::Duration) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            policy,
            tokens,
            token_lifetime,
            hash_cost: bcrypt::DEFAULT_COST,
            admin_emails: Vec::new(),
        }
    }

    /// Accounts created for these emails start out in the Admin role.
    pub fn with_admin_emails(mut self, emails: &[String]) -> Self {
        self.admin_emails = emails.iter().map(|email| normalize_email(email)).collect();
        self
    }

    /// Overrides the bcrypt cost. Tests use the bcrypt minimum of 4 to stay fast.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    fn issue_user_token(&self, purpose: &str, user: &User) -> Result<String, AppError> {
        let claims = UserTokenClaims {
            sub: user.id,
            stamp: user.security_stamp.clone(),
        };
        self.tokens.issue(purpose, claims, self.token_lifetime)
    }

    /// A token is valid when it was issued for this user under the current stamp.
    fn token_matches(&self, purpose: &str, token: &str, current: &User) -> bool {
        match self.tokens.verify::<UserTokenClaims>(purpose, token) {
            Ok(claims) => claims.sub == current.id && claims.stamp == current.security_stamp,
            Err(e) => {
                log::debug!("Rejected {} token for {}: {}", purpose, current.id, e);
                false
            }
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(&self, mut user: User, password: Option<&str>) -> Result<IdentityResult, AppError> {
        if let Some(password) = password {
            let errors = self.policy.validate(password);
            if !errors.is_empty() {
                return Ok(IdentityResult::failed(errors));
            }
            user.password_hash = Some(hash_password(password, self.hash_cost)?);
        }
        user.normalized_email = normalize_email(&user.email);

        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.normalized_email == user.normalized_email)
        {
            return Ok(IdentityResult::failed(vec![IdentityError::new(
                "DuplicateEmail",
                format!("Email '{}' is already taken.", user.email),
            )]));
        }

        if self.admin_emails.contains(&user.normalized_email) && !user.is_in_role(ADMIN_ROLE) {
            log::info!("Granting {} role to {}", ADMIN_ROLE, user.email);
            user.roles.push(ADMIN_ROLE.to_string());
        }

        log::info!("Created user {}", user.id);
        users.insert(user.id, user);
        Ok(IdentityResult::success())
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let Ok(id) = Uuid::parse_str(user_id) else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let normalized = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.normalized_email == normalized)
            .cloned())
    }

    async fn find_by_login(
        &self,
        provider: &str,
        provider_key: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| {
                user.logins
                    .iter()
                    .any(|l| l.provider == provider && l.provider_key == provider_key)
            })
            .cloned())
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, AppError> {
        let current = self.users.read().await.get(&user.id).cloned();
        match current.and_then(|u| u.password_hash) {
            Some(hash) => verify_password(password, &hash),
            None => Ok(false),
        }
    }

    async fn generate_email_confirmation_token(&self, user: &User) -> Result<String, AppError> {
        self.issue_user_token(EMAIL_CONFIRMATION, user)
    }

    async fn confirm_email(&self, user: &User, token: &str) -> Result<IdentityResult, AppError> {
        let mut users = self.users.write().await;
        let Some(current) = users.get_mut(&user.id) else {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        };
        if !self.token_matches(EMAIL_CONFIRMATION, token, current) {
            return Ok(IdentityResult::failed(vec![IdentityError::invalid_token()]));
        }
        current.email_confirmed = true;
        Ok(IdentityResult::success())
    }

    async fn generate_password_reset_token(&self, user: &User) -> Result<String, AppError> {
        self.issue_user_token(RESET_PASSWORD, user)
    }

    async fn reset_password(
        &self,
        user: &User,
        token: &str,
        new_password: &str,
    ) -> Result<IdentityResult, AppError> {
        {
            let users = self.users.read().await;
            let Some(current) = users.get(&user.id) else {
                return Err(AppError::NotFound(format!("User {} not found", user.id)));
            };
            if !self.token_matches(RESET_PASSWORD, token, current) {
                return Ok(IdentityResult::failed(vec![IdentityError::invalid_token()]));
            }
        }

        let errors = self.policy.validate(new_password);
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }
        let hash = hash_password(new_password, self.hash_cost)?;

        let mut users = self.users.write().await;
        let Some(current) = users.get_mut(&user.id) else {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        };
        current.password_hash = Some(hash);
        current.security_stamp = new_security_stamp();
        log::info!("Password reset for user {}", user.id);
        Ok(IdentityResult::success())
    }

    async fn add_login(&self, user: &User, login: ExternalLogin) -> Result<IdentityResult, AppError> {
        let mut users = self.users.write().await;
        let taken = users.values().any(|u| {
            u.logins
                .iter()
                .any(|l| l.provider == login.provider && l.provider_key == login.provider_key)
        });
        if taken {
            return Ok(IdentityResult::failed(vec![IdentityError::new(
                "LoginAlreadyAssociated",
                "A user with this login already exists.",
            )]));
        }
        let Some(current) = users.get_mut(&user.id) else {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        };
        log::info!("Linked {} login to user {}", login.provider, user.id);
        current.logins.push(login);
        Ok(IdentityResult::success())
    }

    async fn add_to_role(&self, user: &User, role: &str) -> Result<IdentityResult, AppError> {
        let mut users = self.users.write().await;
        let Some(current) = users.get_mut(&user.id) else {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        };
        if current.is_in_role(role) {
            return Ok(IdentityResult::failed(vec![IdentityError::new(
                "UserAlreadyInRole",
                format!("User already in role '{}'.", role),
            )]));
        }
        current.roles.push(role.to_string());
        Ok(IdentityResult::success())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}
