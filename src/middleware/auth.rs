use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::services::auth_service::{AuthGate, Principal};
use crate::utils::AppError;

/// Resolves the auth cookie into a [`Principal`] stored in request extensions.
///
/// `required()` rejects requests without a valid cookie. `bootstrap()` falls
/// back to the gate's bootstrap credential so the schema and seed endpoints
/// work before the Users sheet exists.
///
/// Rejections are answered here rather than returned as `Err`, so outer
/// middleware such as CORS still decorates the 401.
pub struct SessionGuard {
    allow_bootstrap: bool,
}

impl SessionGuard {
    pub fn required() -> Self {
        Self { allow_bootstrap: false }
    }

    pub fn bootstrap() -> Self {
        Self { allow_bootstrap: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardService {
            service,
            allow_bootstrap: self.allow_bootstrap,
        }))
    }
}

pub struct SessionGuardService<S> {
    service: S,
    allow_bootstrap: bool,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
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
        let gate = match req.app_data::<web::Data<dyn AuthGate>>() {
            Some(gate) => gate.clone(),
            None => {
                log::error!("❌ AuthGate missing from app data");
                let res = AppError::ConfigurationMissing("Auth gate not configured".to_string())
                    .error_response();
                return Box::pin(async move { Ok(req.into_response(res).map_into_right_body()) });
            }
        };

        let cookie = req.cookie(gate.cookie_name());
        let resolved = match gate.identify(cookie.as_ref().map(|c| c.value())) {
            Ok(principal) => Ok(principal),
            Err(e) if self.allow_bootstrap => match gate.bootstrap_credential() {
                Some(credential) => Ok(Principal { user: None, credential }),
                None => Err(e),
            },
            Err(e) => Err(e),
        };

        match resolved {
            Ok(principal) => {
                req.extensions_mut().insert(principal);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(e) => {
                log::warn!("🔒 {} {} rejected: {}", req.method(), req.path(), e);
                let res = e.error_response();
                Box::pin(async move { Ok(req.into_response(res).map_into_right_body()) })
            }
        }
    }
}
