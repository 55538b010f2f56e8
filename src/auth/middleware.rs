use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::account::AccountWorkflow;
use crate::auth::SessionContext;
use crate::links;

/// Lets a request through only when it carries a valid session cookie.
///
/// Anonymous requests are redirected to the login page with the original
/// path as `ReturnUrl`. The verified `Principal` is stored in request
/// extensions for the `CurrentPrincipal` extractor.
pub struct RequireSession;

impl<S, B> Transform<S, ServiceRequest> for RequireSession
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequireSessionService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireSessionService { service }))
    }
}

pub struct RequireSessionService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequireSessionService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let ctx = SessionContext::from_http_request(req.request());
        let principal = req
            .app_data::<web::Data<AccountWorkflow>>()
            .and_then(|workflow| workflow.principal(&ctx));

        match principal {
            Some(principal) => {
                req.extensions_mut().insert(principal);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            None => {
                let return_url = match req.query_string() {
                    "" => req.path().to_string(),
                    query => format!("{}?{}", req.path(), query),
                };
                let location = links::relative("/Account/Login", &[("ReturnUrl", &return_url)]);
                let (request, _payload) = req.into_parts();
                let response = HttpResponse::Found()
                    .insert_header((header::LOCATION, location))
                    .finish()
                    .map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            }
        }
    }
}
