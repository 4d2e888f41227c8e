use crate::helper::auth_helpers::{self, SESSION_USERNAME, SESSION_USER_ID};
use crate::AppState;
use actix_session::SessionExt;
use actix_web::{
    body::EitherBody,
    dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, FromRequest, HttpRequest, HttpResponse,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use serde::Serialize;
use std::future::{ready, Ready as StdReady};

#[derive(Serialize, Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        if let (Ok(Some(id)), Ok(Some(username))) = (session.get(SESSION_USER_ID), session.get(SESSION_USERNAME)) {
            ready(Ok(AuthenticatedUser { id, username }))
        } else {
            ready(Err(actix_web::error::ErrorUnauthorized("Not logged in.")))
        }
    }
}

/// Sends anonymous requests to the login page, remembering where they were
/// headed. The session's account is looked up on every request, so deleting
/// a user locks it out at once. Must sit inside the session middleware.
pub struct RequireLogin;

impl<S, B> Transform<S, ServiceRequest> for RequireLogin
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireLoginMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequireLoginMiddleware { service })
    }
}

pub struct RequireLoginMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequireLoginMiddleware<S>
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
        let session = req.get_session();
        let is_authenticated = match req.app_data::<web::Data<AppState>>() {
            Some(state) => match auth_helpers::refresh_session_user(&state.pool, &session) {
                Ok(user) => user.is_some(),
                Err(e) => {
                    log::error!("Could not check the session user: {}", e);
                    false
                }
            },
            None => {
                log::error!("Application state missing; admin request treated as anonymous.");
                false
            }
        };

        if is_authenticated {
            let fut = self.service.call(req);
            Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            })
        } else {
            let requested = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string());
            log::info!("Anonymous request to '{}' redirected to login.", requested);
            let login_url = auth_helpers::login_url_with_next(&requested);

            Box::pin(async move {
                let (http_req, _payload) = req.into_parts();
                let res = HttpResponse::Found()
                    .append_header((header::LOCATION, login_url))
                    .finish()
                    .map_into_right_body();
                Ok(ServiceResponse::new(http_req, res))
            })
        }
    }
}
