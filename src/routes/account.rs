//! `/Account/*` handlers. Each one binds its input, hands it to the
//! `AccountWorkflow` and returns the resulting `Outcome`.

use actix_web::{get, post, route, web, Either};
use serde::Deserialize;

use crate::account::AccountWorkflow;
use crate::auth::SessionContext;
use crate::error::AppError;
use crate::models::{ForgotPasswordForm, LoginForm, RegisterForm, ResetPasswordForm};
use crate::views::Outcome;

#[derive(Debug, Deserialize)]
pub struct ReturnUrlQuery {
    #[serde(rename = "returnUrl", alias = "ReturnUrl")]
    pub return_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmEmailQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordQuery {
    pub token: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalLoginQuery {
    pub provider: String,
    #[serde(rename = "returnUrl", alias = "ReturnUrl")]
    pub return_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalCallbackQuery {
    #[serde(rename = "returnUrl", alias = "ReturnUrl")]
    pub return_url: Option<String>,
    #[serde(rename = "remoteError")]
    pub remote_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderReturnQuery {
    pub state: Option<String>,
    pub error: Option<String>,
}

#[get("/Register")]
pub async fn register_form(workflow: web::Data<AccountWorkflow>) -> Outcome {
    workflow.register_form()
}

#[post("/Register")]
pub async fn register(
    workflow: web::Data<AccountWorkflow>,
    ctx: SessionContext,
    form: web::Form<RegisterForm>,
) -> Result<Outcome, AppError> {
    workflow.register(&ctx, form.into_inner()).await
}

/// Remote validation posts the form field; links pass `?email=`.
#[route("/IsEmailInUse", method = "GET", method = "POST")]
pub async fn is_email_in_use(
    workflow: web::Data<AccountWorkflow>,
    input: Either<web::Form<EmailQuery>, web::Query<EmailQuery>>,
) -> Result<Outcome, AppError> {
    let email = match input {
        Either::Left(form) => form.into_inner().email,
        Either::Right(query) => query.into_inner().email,
    };
    workflow.is_email_in_use(&email).await
}

#[get("/ConfirmEmail")]
pub async fn confirm_email(
    workflow: web::Data<AccountWorkflow>,
    query: web::Query<ConfirmEmailQuery>,
) -> Result<Outcome, AppError> {
    workflow
        .confirm_email(query.user_id.as_deref(), query.token.as_deref())
        .await
}

#[get("/ForgotPassword")]
pub async fn forgot_password_form(workflow: web::Data<AccountWorkflow>) -> Outcome {
    workflow.forgot_password_form()
}

#[post("/ForgotPassword")]
pub async fn forgot_password(
    workflow: web::Data<AccountWorkflow>,
    form: web::Form<ForgotPasswordForm>,
) -> Result<Outcome, AppError> {
    workflow.forgot_password(form.into_inner()).await
}

#[get("/ResetPassword")]
pub async fn reset_password_form(
    workflow: web::Data<AccountWorkflow>,
    query: web::Query<ResetPasswordQuery>,
) -> Outcome {
    workflow.reset_password_form(query.token.as_deref(), query.email.as_deref())
}

#[post("/ResetPassword")]
pub async fn reset_password(
    workflow: web::Data<AccountWorkflow>,
    form: web::Form<ResetPasswordForm>,
) -> Result<Outcome, AppError> {
    workflow.reset_password(form.into_inner()).await
}

#[get("/Login")]
pub async fn login_form(
    workflow: web::Data<AccountWorkflow>,
    query: web::Query<ReturnUrlQuery>,
) -> Outcome {
    workflow.login_form(query.return_url.as_deref())
}

#[post("/Login")]
pub async fn login(
    workflow: web::Data<AccountWorkflow>,
    query: web::Query<ReturnUrlQuery>,
    form: web::Form<LoginForm>,
) -> Result<Outcome, AppError> {
    workflow
        .login(form.into_inner(), query.return_url.as_deref())
        .await
}

#[post("/Logout")]
pub async fn logout(workflow: web::Data<AccountWorkflow>) -> Outcome {
    workflow.logout()
}

#[post("/ExternalLogin")]
pub async fn external_login(
    workflow: web::Data<AccountWorkflow>,
    query: web::Query<ExternalLoginQuery>,
) -> Result<Outcome, AppError> {
    workflow.external_login(&query.provider, query.return_url.as_deref())
}

#[get("/ExternalLoginCallback")]
pub async fn external_login_callback(
    workflow: web::Data<AccountWorkflow>,
    ctx: SessionContext,
    query: web::Query<ExternalCallbackQuery>,
) -> Result<Outcome, AppError> {
    workflow
        .external_login_callback(
            &ctx,
            query.return_url.as_deref(),
            query.remote_error.as_deref(),
        )
        .await
}

/// Registered at the application root: providers return to `/signin-{provider}`.
#[get("/signin-{provider}")]
pub async fn external_provider_return(
    workflow: web::Data<AccountWorkflow>,
    provider: web::Path<String>,
    query: web::Query<ProviderReturnQuery>,
) -> Outcome {
    workflow.external_provider_return(
        &provider,
        query.state.as_deref(),
        query.error.as_deref(),
    )
}
