use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use dispatch::DispatchError;
use serde::Serialize;
use uuid::Uuid;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;

/// One shape for every non-2xx response, carrying the status code out of
/// band via `#[serde(skip)]` so the body only ever has a `message` field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,
    pub message: String,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }
}

impl From<DispatchError> for RouteErrorResponse {
    fn from(error: DispatchError) -> Self {
        let status_code = match &error {
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::Forbidden(_) => StatusCode::FORBIDDEN,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Conflict(_) => StatusCode::CONFLICT,
            DispatchError::Unauthorized => StatusCode::UNAUTHORIZED,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let DispatchError::Internal(source) = &error {
            tracing::error!(error = %source, "internal error handling request");
        }
        Self::new(status_code, error.to_string())
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

/// The upstream gateway owns authentication and transport; it forwards the
/// authenticated caller's id in `X-User-Id`, the same way a fronting proxy
/// passes identity through `X-Forwarded-*` headers rather than this
/// service re-deriving it itself.
pub struct AuthenticatedUser(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_header(&parts.headers, "x-user-id").map(AuthenticatedUser)
    }
}

/// Same contract as [`AuthenticatedUser`], but for the dispatch-facing
/// routes the driver app calls, which are authenticated against the
/// driver's own user id rather than a passenger's.
pub struct AuthenticatedDriver(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedDriver
where
    S: Send + Sync,
{
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_header(&parts.headers, "x-driver-user-id").map(AuthenticatedDriver)
    }
}

fn user_id_header(headers: &HeaderMap, name: &str) -> Result<Uuid, RouteErrorResponse> {
    let raw = headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| RouteErrorResponse::new(StatusCode::UNAUTHORIZED, "missing session"))?;
    Uuid::parse_str(raw)
        .map_err(|_| RouteErrorResponse::new(StatusCode::UNAUTHORIZED, "missing session"))
}
