use super::jwt::JwtService;
use crate::db::store::AccountStore;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use actix_web::{FromRequest, HttpRequest};
use futures::future::{Ready, err, ok};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

const PUBLIC_PATHS: [&str; 3] = ["/health", "/auth/signin", "/auth/signup"];

pub fn is_public_path(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    PUBLIC_PATHS.contains(&path)
}

#[derive(Clone)]
pub struct AuthMiddleware {
    jwt_service: Arc<JwtService>,
    accounts: Arc<dyn AccountStore>,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService, accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            jwt_service: Arc::new(jwt_service),
            accounts,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
            jwt_service: self.jwt_service.clone(),
            accounts: self.accounts.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    jwt_service: Arc<JwtService>,
    accounts: Arc<dyn AccountStore>,
}

#[derive(Debug)]
enum AuthError {
    NoAuthHeader,
    InvalidHeaderFormat,
    NotBearerToken,
    VerificationFailed(String),
    InvalidUuidInClaims(String),
    SessionRevoked(Uuid),
    SessionLookupFailed(String),
}

impl AuthError {
    fn log_message(&self, path: &str) -> String {
        match self {
            AuthError::NoAuthHeader => format!("No Authorization header found for path: {}", path),
            AuthError::InvalidHeaderFormat => {
                format!("Invalid Authorization header format (non-UTF-8) for path: {}", path)
            }
            AuthError::NotBearerToken => {
                format!("Authorization header for path {} doesn't start with 'Bearer '", path)
            }
            AuthError::VerificationFailed(e) => {
                format!("JWT token verification failed for path {}: {}", path, e)
            }
            AuthError::InvalidUuidInClaims(sub) => {
                format!("Invalid UUID in JWT claims.sub for path {}: {}", path, sub)
            }
            AuthError::SessionRevoked(user_id) => {
                format!("Token for signed-out user {} used on path {}", user_id, path)
            }
            AuthError::SessionLookupFailed(e) => {
                format!("Session lookup failed for path {}: {}", path, e)
            }
        }
    }

    fn client_error_json(&self) -> serde_json::Value {
        let error_message = match self {
            AuthError::InvalidUuidInClaims(_)
            | AuthError::VerificationFailed(_)
            | AuthError::SessionRevoked(_)
            | AuthError::SessionLookupFailed(_) => "Invalid or expired session",
            _ => "Missing or invalid authorization token",
        };
        serde_json::json!({ "error": error_message })
    }
}

/// Verified identity and the token's issue time.
fn validate_request_token(
    req: &ServiceRequest,
    jwt_service: &JwtService,
) -> Result<(AuthenticatedUser, usize), AuthError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthError::NoAuthHeader)?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidHeaderFormat)?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AuthError::NotBearerToken)?;

    let claims = jwt_service
        .verify_token(token)
        .map_err(|e| AuthError::VerificationFailed(e.to_string()))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AuthError::InvalidUuidInClaims(claims.sub.clone()))?;

    Ok((
        AuthenticatedUser {
            id: user_id,
            email: claims.email,
        },
        claims.iat,
    ))
}

/// Rejects tokens of unknown or deactivated users and tokens issued before
/// the user's last sign-out.
async fn check_session(
    accounts: &dyn AccountStore,
    user_id: Uuid,
    issued_at: usize,
) -> Result<(), AuthError> {
    match accounts.get_user_by_id(user_id).await {
        Ok(Some(account)) if account.accepts_token_issued_at(issued_at) => Ok(()),
        Ok(_) => Err(AuthError::SessionRevoked(user_id)),
        Err(e) => Err(AuthError::SessionLookupFailed(e.to_string())),
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt_service = self.jwt_service.clone();
        let accounts = self.accounts.clone();

        Box::pin(async move {
            let path_str = req.path().to_string();

            if is_public_path(&path_str) || req.method() == actix_web::http::Method::OPTIONS {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }
            log::debug!("Auth middleware processing path: {}", &path_str);

            let verified = match validate_request_token(&req, &jwt_service) {
                Ok((user, issued_at)) => check_session(accounts.as_ref(), user.id, issued_at)
                    .await
                    .map(|()| user),
                Err(e) => Err(e),
            };

            match verified {
                Ok(user) => {
                    log::debug!("Request to {} authenticated as {}", path_str, user.id);
                    req.extensions_mut().insert(user);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(auth_error) => {
                    log::warn!("{}", auth_error.log_message(&path_str));

                    let (http_req, _payload) = req.into_parts();
                    let response = HttpResponse::Unauthorized()
                        .json(auth_error.client_error_json())
                        .map_into_right_body();
                    Ok(ServiceResponse::new(http_req, response))
                }
            }
        })
    }
}

/// Identity placed in request extensions by [`AuthMiddleware`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ok(user.clone()),
            None => {
                log::warn!(
                    "AuthenticatedUser extractor: no identity in request extensions for path: {}",
                    req.path()
                );
                err(actix_web::error::ErrorUnauthorized(
                    serde_json::json!({ "error": "Not authenticated" }).to_string(),
                ))
            }
        }
    }
}
