use thiserror::Error;

/// Failures specific to the presence webhook's signature protocol. Every
/// variant is a 403-class rejection of the whole request; unlike a
/// malformed individual presence message (swallowed per-item), a bad
/// signature means the request cannot be trusted at all.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing X-Ably-Key header")]
    MissingKeyName,
    #[error("missing X-Ably-Signature header")]
    MissingSignature,
    #[error("signature key name does not match the configured API key")]
    UnknownKeyName,
    #[error("signature does not match the request body")]
    SignatureMismatch,
}

/// Failures publishing to Ably's REST API. Callers treat every variant the
/// same way: log and move on, since `EventPublisher::publish` failures must
/// never abort a dispatch round.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("ably rest api request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ably rest api returned {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}
