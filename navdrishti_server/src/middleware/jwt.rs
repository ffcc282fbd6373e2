//! JWT validation middleware.
//!
//! Wraps the authenticated `/api` scope. Validates the `Authorization: Bearer` token against the shared
//! identity secret and stores the decoded [`JwtClaims`] in the request extensions, where the
//! [`JwtClaims`] extractor and the ACL middleware pick them up.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace};
use nvd_common::Secret;

use crate::{
    auth::decode_access_token,
    errors::{AuthError, ServerError},
};

pub struct JwtAuthMiddlewareFactory {
    secret: Secret<String>,
}

impl JwtAuthMiddlewareFactory {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService { secret: self.secret.clone(), service: Rc::new(service) }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    secret: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        Box::pin(async move {
            trace!("🔑️ Checking access token for {}", req.path());
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .ok_or_else(|| Error::from(ServerError::AuthenticationError(AuthError::MissingToken)))?;
            let claims = decode_access_token(token, &secret).map_err(|e| {
                debug!("🔑️ Access token rejected: {e}");
                Error::from(ServerError::AuthenticationError(e))
            })?;
            trace!("🔑️ Access token accepted for {}", claims.sub);
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
