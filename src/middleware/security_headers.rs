use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::api::metrics;

/// Relaxes cross-origin isolation so the OAuth popup can reach `window.opener`,
/// and feeds the request/error counters behind `/metrics`.
pub struct SecurityHeaders;

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddleware { service }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        metrics::increment_request_count();
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = match fut.await {
                Ok(res) => res,
                Err(e) => {
                    metrics::increment_error_count();
                    return Err(e);
                }
            };

            if res.status().is_server_error() || res.status().is_client_error() {
                metrics::increment_error_count();
            }

            let headers = res.headers_mut();

            // The callback page posts to its opener; same-origin COOP would sever that link
            headers.insert(
                actix_web::http::header::HeaderName::from_static("cross-origin-opener-policy"),
                actix_web::http::header::HeaderValue::from_static("unsafe-none"),
            );

            headers.insert(
                actix_web::http::header::HeaderName::from_static("cross-origin-embedder-policy"),
                actix_web::http::header::HeaderValue::from_static("unsafe-none"),
            );

            Ok(res)
        })
    }
}
