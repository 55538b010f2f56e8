//! Handler outcomes and their HTTP rendering.
//!
//! A "view" is rendered as a JSON document naming the page, its model and any
//! form errors. Redirects may carry a session change, which is applied as
//! cookies on the response.

use std::collections::BTreeMap;

use actix_web::body::BoxBody;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, Responder};
use serde::Serialize;
use validator::ValidationErrors;

use crate::auth::session::{EXTERNAL_COOKIE, SESSION_COOKIE, SESSION_LIFETIME_DAYS};
use crate::auth::{Challenge, IdentityError, SessionTicket};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub view: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Form-level errors not tied to a field.
    pub errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
    pub model: serde_json::Value,
}

impl View {
    pub fn named(view: &'static str) -> Self {
        Self {
            view,
            title: None,
            message: None,
            errors: Vec::new(),
            field_errors: BTreeMap::new(),
            model: serde_json::Value::Null,
        }
    }

    /// The generic `Error` page with a title and optional message.
    pub fn error(title: impl Into<String>, message: Option<&str>) -> Self {
        let mut view = Self::named("Error").with_title(title);
        view.message = message.map(str::to_string);
        view
    }

    pub fn with_model<T: Serialize>(mut self, model: &T) -> Self {
        self.model = serde_json::to_value(model).unwrap_or_default();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_identity_errors(mut self, errors: &[IdentityError]) -> Self {
        self.errors
            .extend(errors.iter().map(|e| e.description.clone()));
        self
    }

    pub fn with_validation(mut self, errors: &ValidationErrors) -> Self {
        for (field, field_errors) in errors.field_errors() {
            let messages = field_errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("The {} field is invalid.", field),
                })
                .collect();
            self.field_errors.insert(field.to_string(), messages);
        }
        self
    }
}

/// What an authenticated-session cookie should do on a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Keep,
    /// Set the session cookie and drop any external identity cookie.
    SignIn(SessionTicket),
    /// Drop both identity cookies.
    SignOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    View(View),
    NotFound(View),
    Json(serde_json::Value),
    Redirect {
        location: String,
        session: SessionChange,
    },
    Challenge(Challenge),
}

impl Outcome {
    pub fn redirect(location: impl Into<String>) -> Self {
        Outcome::Redirect {
            location: location.into(),
            session: SessionChange::Keep,
        }
    }

    pub fn home() -> Self {
        Self::redirect("/")
    }

    pub fn signed_in(location: impl Into<String>, ticket: SessionTicket) -> Self {
        Outcome::Redirect {
            location: location.into(),
            session: SessionChange::SignIn(ticket),
        }
    }
}

fn removal(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

impl Responder for Outcome {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        match self {
            Outcome::View(view) => HttpResponse::Ok().json(view),
            Outcome::NotFound(view) => HttpResponse::NotFound().json(view),
            Outcome::Json(value) => HttpResponse::Ok().json(value),
            Outcome::Challenge(challenge) => HttpResponse::Found()
                .insert_header((header::LOCATION, challenge.location))
                .finish(),
            Outcome::Redirect { location, session } => {
                let mut response = HttpResponse::Found();
                response.insert_header((header::LOCATION, location));
                match session {
                    SessionChange::Keep => {}
                    SessionChange::SignIn(ticket) => {
                        let mut cookie = Cookie::build(SESSION_COOKIE, ticket.token)
                            .path("/")
                            .http_only(true)
                            .same_site(SameSite::Lax)
                            .secure(ticket.secure)
                            .finish();
                        if ticket.persistent {
                            cookie.set_max_age(CookieDuration::days(SESSION_LIFETIME_DAYS));
                        }
                        response.cookie(cookie);
                        response.cookie(removal(EXTERNAL_COOKIE));
                    }
                    SessionChange::SignOut => {
                        response.cookie(removal(SESSION_COOKIE));
                        response.cookie(removal(EXTERNAL_COOKIE));
                    }
                }
                response.finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use validator::Validate;

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[test]
    fn test_view_collects_field_errors() {
        let errors = Named { name: String::new() }.validate().unwrap_err();
        let view = View::named("Create").with_validation(&errors);
        assert_eq!(view.field_errors["name"], vec!["Name is required".to_string()]);
        assert!(view.errors.is_empty());
    }

    #[actix_rt::test]
    async fn test_sign_in_redirect_sets_cookies() {
        let req = TestRequest::default().to_http_request();
        let outcome = Outcome::signed_in(
            "/Home",
            SessionTicket {
                token: "tok".into(),
                persistent: true,
                secure: true,
            },
        );
        let resp = outcome.respond_to(&req);
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/Home");

        let cookies: Vec<_> = resp.cookies().collect();
        let session = cookies.iter().find(|c| c.name() == SESSION_COOKIE).unwrap();
        assert_eq!(session.value(), "tok");
        assert_eq!(session.max_age(), Some(CookieDuration::days(SESSION_LIFETIME_DAYS)));
        assert_eq!(session.secure(), Some(true));
        assert_eq!(session.http_only(), Some(true));
        let external = cookies.iter().find(|c| c.name() == EXTERNAL_COOKIE).unwrap();
        assert_eq!(external.value(), "");
    }

    #[actix_rt::test]
    async fn test_not_found_view_status() {
        let req = TestRequest::default().to_http_request();
        let resp = Outcome::NotFound(View::named("NotFound")).respond_to(&req);
        assert_eq!(resp.status(), 404);
    }
}
