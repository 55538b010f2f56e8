use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::session::{EXTERNAL_COOKIE, SESSION_COOKIE};
use crate::auth::Principal;
use crate::error::AppError;

/// The raw identity cookies of a request.
///
/// Handlers pass this to the account workflow explicitly; only the session
/// manager knows how to verify the values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub session_cookie: Option<String>,
    pub external_cookie: Option<String>,
}

impl SessionContext {
    pub fn from_http_request(req: &HttpRequest) -> Self {
        Self {
            session_cookie: req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()),
            external_cookie: req.cookie(EXTERNAL_COOKIE).map(|c| c.value().to_string()),
        }
    }
}

impl FromRequest for SessionContext {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(SessionContext::from_http_request(req)))
    }
}

/// The signed-in user, as placed in request extensions by `RequireSession`.
///
/// Only usable on routes wrapped in that middleware; elsewhere extraction
/// fails with `AppError::Unauthorized`.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl FromRequest for CurrentPrincipal {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Principal>().cloned() {
            Some(principal) => ready(Ok(CurrentPrincipal(principal))),
            None => {
                let err = AppError::Unauthorized(
                    "No signed-in user on this request. Ensure RequireSession is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use uuid::Uuid;

    #[actix_rt::test]
    async fn test_session_context_reads_both_cookies() {
        let req = test::TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "session-token"))
            .cookie(Cookie::new(EXTERNAL_COOKIE, "external-token"))
            .to_http_request();

        let ctx = SessionContext::extract(&req).await.unwrap();
        assert_eq!(ctx.session_cookie.as_deref(), Some("session-token"));
        assert_eq!(ctx.external_cookie.as_deref(), Some("external-token"));
    }

    #[actix_rt::test]
    async fn test_session_context_without_cookies() {
        let req = test::TestRequest::default().to_http_request();
        let ctx = SessionContext::extract(&req).await.unwrap();
        assert_eq!(ctx, SessionContext::default());
    }

    #[actix_rt::test]
    async fn test_current_principal_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let principal = Principal {
            user_id: Uuid::new_v4(),
            email: "mary@example.com".into(),
            roles: vec![],
        };
        req.extensions_mut().insert(principal.clone());

        let mut payload = Payload::None;
        let extracted = CurrentPrincipal::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(extracted.0, principal);
    }

    #[actix_rt::test]
    async fn test_current_principal_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = CurrentPrincipal::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
