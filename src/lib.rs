#![doc = "The `employee_manager` library crate."]
#![doc = ""]
#![doc = "Account workflow (registration, email confirmation, password reset, local and"]
#![doc = "external login), employee records, and the actix-web routing that exposes them."]
#![doc = "The binary in `main.rs` wires these together from environment configuration."]

pub mod account;
pub mod auth;
pub mod config;
pub mod error;
pub mod links;
pub mod models;
pub mod repository;
pub mod routes;
pub mod views;

use std::sync::Arc;

use crate::account::AccountWorkflow;
use crate::auth::{CookieSessionManager, InMemoryCredentialStore, TokenService};
use crate::config::Config;
use crate::error::AppError;
use crate::links::LinkGenerator;

/// Builds the account workflow over the in-memory credential store and
/// cookie-based session manager described by `config`.
pub fn build_account_workflow(config: &Config) -> Result<AccountWorkflow, AppError> {
    let tokens = TokenService::new(&config.session_secret);
    let store = Arc::new(
        InMemoryCredentialStore::new(
            config.password_policy.clone(),
            tokens.clone(),
            chrono::Duration::hours(config.token_lifetime_hours),
        )
        .with_admin_emails(&config.admin_emails),
    );
    let session = Arc::new(CookieSessionManager::new(
        store.clone(),
        tokens,
        config.external_providers.clone(),
        config.public_base_url.clone(),
    ));
    let links = LinkGenerator::new(&config.public_base_url)?;
    Ok(AccountWorkflow::new(store, session, links))
}
