use thiserror::Error;

use crate::kind::EventKind;

/// Why a webhook signature was rejected. The caller answers 401 and stops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,

    #[error("signature has {actual} hex chars, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("signature is not lowercase hex")]
    Malformed,

    #[error("signature mismatch")]
    Mismatch,

    #[error("invalid HMAC key")]
    InvalidKey,
}

/// Protocol-level mismatch with the upstream system. Never fatal: the event
/// is logged and skipped.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),

    #[error("payload for {kind} does not match its schema: {reason}")]
    SchemaMismatch { kind: EventKind, reason: String },
}

/// Everything that can stop an inbound webhook before it becomes an event.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("authentication failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("unparseable webhook body: {0}")]
    Malformed(String),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

impl IngestError {
    /// True when the request itself must be rejected as unauthenticated.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, IngestError::Signature(_))
    }

    /// Short error code string returned in HTTP response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Signature(_) => "AUTH_FAILED",
            IngestError::Malformed(_) => "MALFORMED_BODY",
            IngestError::Classify(ClassifyError::UnknownEventKind(_)) => "UNKNOWN_EVENT",
            IngestError::Classify(ClassifyError::SchemaMismatch { .. }) => "SCHEMA_MISMATCH",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
