//! The account workflow: registration, email confirmation, password reset and
//! local or external login.
//!
//! Every operation is stateless. It receives the bound form or query values,
//! plus the request's [`SessionContext`] where the caller's identity matters,
//! and returns an [`Outcome`] for the HTTP layer to render. Failures a user can
//! cause are views with form errors; `AppError` is reserved for broken
//! infrastructure.
//!
//! Forgot-password and reset-password answer identically whether or not the
//! account exists, and login never says which half of a credential was wrong.

use std::sync::Arc;

use serde::Serialize;
use validator::Validate;

use crate::auth::{
    CredentialStore, ExternalScheme, Principal, SessionContext, SessionManager, SignInResult,
    ADMIN_ROLE,
};
use crate::error::AppError;
use crate::links::{self, LinkGenerator};
use crate::models::{ForgotPasswordForm, LoginForm, RegisterForm, ResetPasswordForm, User};
use crate::views::{Outcome, SessionChange, View};

const REGISTRATION_SUCCESSFUL: &str = "Registration successful";
const CONFIRM_YOUR_EMAIL: &str =
    "Before you can Login, please confirm your email, by clicking on the confirmation link we have emailed you";
const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed yet";
const EXTERNAL_INFO_MISSING: &str = "Error loading external login information.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginModel<'a> {
    email: &'a str,
    remember_me: bool,
    return_url: Option<&'a str>,
    external_logins: Vec<ExternalScheme>,
}

#[derive(Debug, Serialize)]
struct ResetPasswordModel<'a> {
    token: Option<&'a str>,
    email: Option<&'a str>,
}

#[derive(Clone)]
pub struct AccountWorkflow {
    store: Arc<dyn CredentialStore>,
    session: Arc<dyn SessionManager>,
    links: LinkGenerator,
}

impl AccountWorkflow {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        session: Arc<dyn SessionManager>,
        links: LinkGenerator,
    ) -> Self {
        Self {
            store,
            session,
            links,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// The signed-in user of a request, if its session cookie verifies.
    pub fn principal(&self, ctx: &SessionContext) -> Option<Principal> {
        self.session.principal(ctx)
    }

    fn login_view(&self, form: &LoginForm, return_url: Option<&str>) -> View {
        View::named("Login").with_model(&LoginModel {
            email: &form.email,
            remember_me: form.remember_me,
            return_url,
            external_logins: self.session.external_schemes(),
        })
    }

    fn local_or_home(return_url: Option<&str>) -> String {
        match return_url {
            Some(url) if links::is_local_url(url) => links::content(url),
            _ => "/".to_string(),
        }
    }

    /// Logs the confirmation link in place of sending an email.
    async fn send_confirmation_link(&self, user: &User) -> Result<(), AppError> {
        let token = self.store.generate_email_confirmation_token(user).await?;
        let user_id = user.id.to_string();
        let link = self.links.absolute(
            "/Account/ConfirmEmail",
            &[("userId", user_id.as_str()), ("token", token.as_str())],
        );
        log::warn!("{}", link);
        Ok(())
    }

    fn registration_notice() -> Outcome {
        Outcome::View(View::error(REGISTRATION_SUCCESSFUL, Some(CONFIRM_YOUR_EMAIL)))
    }

    pub fn register_form(&self) -> Outcome {
        Outcome::View(View::named("Register").with_model(&RegisterForm::default()))
    }

    pub async fn register(&self, ctx: &SessionContext, form: RegisterForm) -> Result<Outcome, AppError> {
        if let Err(errors) = form.validate() {
            return Ok(Outcome::View(
                View::named("Register").with_model(&form).with_validation(&errors),
            ));
        }

        let city = form.city.clone().filter(|c| !c.trim().is_empty());
        let user = User::new(&form.email, city);
        let result = self.store.create(user.clone(), Some(&form.password)).await?;
        if !result.succeeded() {
            return Ok(Outcome::View(
                View::named("Register")
                    .with_model(&form)
                    .with_identity_errors(&result.errors),
            ));
        }

        self.send_confirmation_link(&user).await?;

        if self
            .principal(ctx)
            .is_some_and(|principal| principal.is_in_role(ADMIN_ROLE))
        {
            return Ok(Outcome::redirect("/Administration/ListUsers"));
        }
        Ok(Self::registration_notice())
    }

    /// Remote validation for the registration form: `true` when the email is free.
    pub async fn is_email_in_use(&self, email: &str) -> Result<Outcome, AppError> {
        match self.store.find_by_email(email).await? {
            None => Ok(Outcome::Json(serde_json::Value::Bool(true))),
            Some(_) => Ok(Outcome::Json(serde_json::Value::String(format!(
                "Email {} is already in use",
                email
            )))),
        }
    }

    pub async fn confirm_email(
        &self,
        user_id: Option<&str>,
        token: Option<&str>,
    ) -> Result<Outcome, AppError> {
        let (Some(user_id), Some(token)) = (user_id, token) else {
            return Ok(Outcome::home());
        };

        let Some(user) = self.store.find_by_id(user_id).await? else {
            return Ok(Outcome::NotFound(
                View::named("NotFound").with_message(format!("The User ID {} is invalid", user_id)),
            ));
        };

        let result = self.store.confirm_email(&user, token).await?;
        if result.succeeded() {
            log::info!("Email confirmed for user {}", user.id);
            return Ok(Outcome::View(View::named("ConfirmEmail")));
        }
        Ok(Outcome::View(View::error("Email cannot be confirmed", None)))
    }

    pub fn forgot_password_form(&self) -> Outcome {
        Outcome::View(View::named("ForgotPassword").with_model(&ForgotPasswordForm::default()))
    }

    pub async fn forgot_password(&self, form: ForgotPasswordForm) -> Result<Outcome, AppError> {
        if let Err(errors) = form.validate() {
            return Ok(Outcome::View(
                View::named("ForgotPassword")
                    .with_model(&form)
                    .with_validation(&errors),
            ));
        }

        if let Some(user) = self.store.find_by_email(&form.email).await? {
            if user.email_confirmed {
                let token = self.store.generate_password_reset_token(&user).await?;
                let link = self.links.absolute(
                    "/Account/ResetPassword",
                    &[("email", form.email.as_str()), ("token", token.as_str())],
                );
                log::warn!("{}", link);
            }
        }

        Ok(Outcome::View(View::named("ForgotPasswordConfirmation")))
    }

    pub fn reset_password_form(&self, token: Option<&str>, email: Option<&str>) -> Outcome {
        let view = View::named("ResetPassword").with_model(&ResetPasswordModel { token, email });
        if token.is_none() || email.is_none() {
            return Outcome::View(view.with_error("Invalid password reset token"));
        }
        Outcome::View(view)
    }

    pub async fn reset_password(&self, form: ResetPasswordForm) -> Result<Outcome, AppError> {
        if let Err(errors) = form.validate() {
            return Ok(Outcome::View(
                View::named("ResetPassword")
                    .with_model(&form)
                    .with_validation(&errors),
            ));
        }

        if let Some(user) = self.store.find_by_email(&form.email).await? {
            let result = self
                .store
                .reset_password(&user, &form.token, &form.password)
                .await?;
            if !result.succeeded() {
                return Ok(Outcome::View(
                    View::named("ResetPassword")
                        .with_model(&form)
                        .with_identity_errors(&result.errors),
                ));
            }
        }

        Ok(Outcome::View(View::named("ResetPasswordConfirmation")))
    }

    pub fn login_form(&self, return_url: Option<&str>) -> Outcome {
        Outcome::View(self.login_view(&LoginForm::default(), return_url))
    }

    pub async fn login(&self, form: LoginForm, return_url: Option<&str>) -> Result<Outcome, AppError> {
        let return_url = return_url.or(form.return_url.as_deref());

        if let Err(errors) = form.validate() {
            return Ok(Outcome::View(
                self.login_view(&form, return_url).with_validation(&errors),
            ));
        }

        if let Some(user) = self.store.find_by_email(&form.email).await? {
            if !user.email_confirmed && self.store.check_password(&user, &form.password).await? {
                return Ok(Outcome::View(
                    self.login_view(&form, return_url).with_error(EMAIL_NOT_CONFIRMED),
                ));
            }
        }

        match self
            .session
            .password_sign_in(&form.email, &form.password, form.remember_me)
            .await?
        {
            SignInResult::Succeeded(ticket) => {
                Ok(Outcome::signed_in(Self::local_or_home(return_url), ticket))
            }
            SignInResult::NotAllowed | SignInResult::Failed => Ok(Outcome::View(
                self.login_view(&form, return_url).with_error("Invalid Login Attempt"),
            )),
        }
    }

    pub fn logout(&self) -> Outcome {
        Outcome::Redirect {
            location: "/".to_string(),
            session: SessionChange::SignOut,
        }
    }

    pub fn external_login(&self, provider: &str, return_url: Option<&str>) -> Result<Outcome, AppError> {
        let redirect_url = match return_url {
            Some(url) => links::relative("/Account/ExternalLoginCallback", &[("returnUrl", url)]),
            None => "/Account/ExternalLoginCallback".to_string(),
        };
        let challenge = self
            .session
            .configure_external_challenge(provider, &redirect_url)?;
        Ok(Outcome::Challenge(challenge))
    }

    /// The provider's redirect back to `/signin-{provider}`.
    ///
    /// Only a `state` this app signed for the same provider is honoured; the
    /// browser then continues at the callback URL carried inside it, with any
    /// provider error passed along as `remoteError`.
    pub fn external_provider_return(
        &self,
        provider: &str,
        state: Option<&str>,
        error: Option<&str>,
    ) -> Outcome {
        let challenge = state
            .and_then(|state| self.session.challenge_state(state))
            .filter(|challenge| challenge.provider.eq_ignore_ascii_case(provider))
            .filter(|challenge| links::is_local_url(&challenge.redirect_url));
        let Some(challenge) = challenge else {
            log::warn!("Rejected return from {} without a valid state", provider);
            return Outcome::View(
                self.login_view(&LoginForm::default(), None)
                    .with_error(EXTERNAL_INFO_MISSING),
            );
        };

        match error {
            Some(error) => Outcome::redirect(links::relative(
                &challenge.redirect_url,
                &[("remoteError", error)],
            )),
            None => Outcome::redirect(challenge.redirect_url),
        }
    }

    pub async fn external_login_callback(
        &self,
        ctx: &SessionContext,
        return_url: Option<&str>,
        remote_error: Option<&str>,
    ) -> Result<Outcome, AppError> {
        let return_url = return_url.unwrap_or("~/");
        let login_view = || self.login_view(&LoginForm::default(), Some(return_url));

        if let Some(remote_error) = remote_error {
            return Ok(Outcome::View(
                login_view().with_error(format!("Error from external provider: {}", remote_error)),
            ));
        }

        let Some(info) = self.session.external_login_info(ctx) else {
            return Ok(Outcome::View(
                login_view().with_error(EXTERNAL_INFO_MISSING),
            ));
        };

        let mut user = None;
        if let Some(email) = info.email.as_deref() {
            user = self.store.find_by_email(email).await?;
            if user.as_ref().is_some_and(|u| !u.email_confirmed) {
                return Ok(Outcome::View(login_view().with_error(EMAIL_NOT_CONFIRMED)));
            }
        }

        let result = self
            .session
            .external_login_sign_in(&info.provider, &info.provider_key, false)
            .await?;
        if let SignInResult::Succeeded(ticket) = result {
            return Ok(Outcome::signed_in(Self::local_or_home(Some(return_url)), ticket));
        }

        let Some(email) = info.email.as_deref() else {
            log::warn!("No email claim received from {}", info.provider);
            return Ok(Outcome::View(View::error(
                format!("Email claim not received from: {}", info.provider),
                Some("Please contact support"),
            )));
        };

        let user = match user {
            Some(user) => user,
            None => {
                // First visit through this provider: create the account, but only
                // sign in once the email is confirmed.
                let user = User::new(email, None);
                let created = self.store.create(user.clone(), None).await?;
                if !created.succeeded() {
                    return Ok(Outcome::View(login_view().with_identity_errors(&created.errors)));
                }
                self.send_confirmation_link(&user).await?;
                return Ok(Self::registration_notice());
            }
        };

        let linked = self.store.add_login(&user, info.to_login()).await?;
        if !linked.succeeded() {
            return Ok(Outcome::View(login_view().with_identity_errors(&linked.errors)));
        }
        let ticket = self.session.sign_in(&user, false)?;
        Ok(Outcome::signed_in(Self::local_or_home(Some(return_url)), ticket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CookieSessionManager, InMemoryCredentialStore, TokenService};
    use crate::config::PasswordPolicy;

    const TEST_HASH_COST: u32 = 4;

    fn workflow() -> AccountWorkflow {
        let tokens = TokenService::new("workflow-test-secret");
        let store = Arc::new(
            InMemoryCredentialStore::new(
                PasswordPolicy::default(),
                tokens.clone(),
                chrono::Duration::hours(1),
            )
            .with_hash_cost(TEST_HASH_COST),
        );
        let session = Arc::new(CookieSessionManager::new(
            store.clone(),
            tokens,
            Vec::new(),
            "http://localhost:8080",
        ));
        let links = LinkGenerator::new("http://localhost:8080").unwrap();
        AccountWorkflow::new(store, session, links)
    }

    #[test]
    fn test_local_or_home() {
        assert_eq!(AccountWorkflow::local_or_home(None), "/");
        assert_eq!(AccountWorkflow::local_or_home(Some("/Home/Edit/1")), "/Home/Edit/1");
        assert_eq!(AccountWorkflow::local_or_home(Some("~/")), "/");
        assert_eq!(AccountWorkflow::local_or_home(Some("https://evil.example")), "/");
        assert_eq!(AccountWorkflow::local_or_home(Some("/\\evil.example")), "/");
    }

    #[actix_rt::test]
    async fn test_register_then_email_in_use() {
        let workflow = workflow();
        let form = RegisterForm {
            email: "mary@example.com".into(),
            password: "Str0ng#Password".into(),
            confirm_password: "Str0ng#Password".into(),
            city: Some("  ".into()),
        };

        let outcome = workflow
            .register(&SessionContext::default(), form)
            .await
            .unwrap();
        let Outcome::View(view) = outcome else {
            panic!("expected a view, got {:?}", outcome);
        };
        assert_eq!(view.title.as_deref(), Some(REGISTRATION_SUCCESSFUL));

        let user = workflow.store().find_by_email("mary@example.com").await.unwrap().unwrap();
        assert_eq!(user.city, None);

        assert_eq!(
            workflow.is_email_in_use("MARY@example.com").await.unwrap(),
            Outcome::Json(serde_json::json!("Email MARY@example.com is already in use"))
        );
        assert_eq!(
            workflow.is_email_in_use("john@example.com").await.unwrap(),
            Outcome::Json(serde_json::json!(true))
        );
    }

    #[actix_rt::test]
    async fn test_external_login_without_providers_is_bad_request() {
        let workflow = workflow();
        let err = workflow.external_login("Google", None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_logout_signs_out() {
        assert_eq!(
            workflow().logout(),
            Outcome::Redirect {
                location: "/".into(),
                session: SessionChange::SignOut,
            }
        );
    }
}
