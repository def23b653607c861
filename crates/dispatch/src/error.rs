use thiserror::Error;

/// Each variant maps to the matching HTTP status-code class named in its
/// doc comment; the web crate owns that conversion.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 404-class.
    #[error("not found")]
    NotFound,
    /// 403-class: role/approval mismatch, signature failure, cancellation
    /// attempted by a non-party.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// 400-class: malformed input or an illegal state transition.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// 409-class: the acceptance race was lost.
    #[error("conflict: {0}")]
    Conflict(String),
    /// 401-class: missing session. Not raised inside this crate today (no
    /// component here owns authentication) but kept in the taxonomy since
    /// callers surface it.
    #[error("unauthorized")]
    Unauthorized,
    /// 5xx-class: unexpected store or broker failure.
    #[error("internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(Box::new(error))
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
