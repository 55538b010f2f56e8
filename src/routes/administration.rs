use actix_web::{get, web};

use crate::account::AccountWorkflow;
use crate::auth::{CurrentPrincipal, RequireSession, ADMIN_ROLE};
use crate::error::AppError;
use crate::views::{Outcome, View};

/// Lists registered users. Admins only; everyone else lands on `AccessDenied`.
#[get("/ListUsers", wrap = "RequireSession")]
pub async fn list_users(
    workflow: web::Data<AccountWorkflow>,
    principal: CurrentPrincipal,
) -> Result<Outcome, AppError> {
    if !principal.0.is_in_role(ADMIN_ROLE) {
        log::warn!("User {} denied access to user administration", principal.0.user_id);
        return Ok(Outcome::redirect("/Administration/AccessDenied"));
    }
    let users = workflow.store().list_users().await?;
    Ok(Outcome::View(View::named("ListUsers").with_model(&users)))
}

#[get("/AccessDenied")]
pub async fn access_denied() -> Outcome {
    Outcome::View(View::named("AccessDenied"))
}
