use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use futures_util::future::LocalBoxFuture;

use crate::error::ApiError;
use crate::identity::Identity;
use crate::routes::AppState;

/// Extractor yielding the verified caller. Use `Option<Caller>` for endpoints that also
/// serve anonymous visitors.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl Caller {
    pub fn uid(&self) -> &str {
        &self.0.uid
    }
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        // Delegate to BearerAuth to parse the header.
        let bearer = BearerAuth::from_request(req, pl).into_inner();
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(async move {
            let Ok(bearer) = bearer else {
                return Err(ApiError::Unauthorized("Unauthorized".into()));
            };
            let state = state.ok_or_else(|| ApiError::Internal("application state not configured".into()))?;
            let identity = state.identity.verify_token(bearer.token()).await?;
            Ok(Caller(identity))
        })
    }
}
