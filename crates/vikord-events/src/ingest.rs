use tracing::{debug, error, warn};

use crate::classify::{classify, WebhookEnvelope};
use crate::error::{ClassifyError, IngestError};
use crate::event::WebhookEvent;
use crate::signature::SignatureValidator;

/// Authenticate, parse and classify one inbound webhook body.
///
/// `validator` is `None` only when unsigned webhooks are explicitly allowed.
/// Every failure is logged here at the level its kind calls for; callers only
/// decide the HTTP status via [`IngestError::is_auth_failure`].
pub fn ingest(
    validator: Option<&SignatureValidator>,
    raw_body: &[u8],
    signature: Option<&str>,
) -> Result<WebhookEvent, IngestError> {
    if let Some(v) = validator {
        if let Err(e) = v.validate(raw_body, signature) {
            warn!(reason = %e, bytes = raw_body.len(), "webhook signature rejected");
            return Err(e.into());
        }
    }

    let envelope = WebhookEnvelope::parse(raw_body).map_err(|e| {
        warn!(error = %e, "webhook body is not a valid envelope");
        IngestError::Malformed(e.to_string())
    })?;

    let timestamp = envelope.timestamp();
    let event_name = envelope.event_name.clone();

    match classify(&event_name, envelope.data) {
        Ok(event) => {
            debug!(event_kind = %event.kind(), "webhook classified");
            Ok(match timestamp {
                Some(ts) => event.with_timestamp(ts),
                None => event,
            })
        }
        Err(e @ ClassifyError::UnknownEventKind(_)) => {
            warn!(event_name = %event_name, "unsupported webhook event kind, skipping");
            Err(e.into())
        }
        Err(e @ ClassifyError::SchemaMismatch { .. }) => {
            error!(event_name = %event_name, error = %e, "webhook payload schema mismatch, skipping");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::EventKind;

    const BODY: &[u8] = br#"{"event_name":"task.created","time":"2026-10-19T10:00:00Z","data":{"task":{"id":42,"title":"Fix bug","project_id":3},"doer":{"id":1,"username":"u1"}}}"#;

    #[test]
    fn signed_body_becomes_event() {
        let v = SignatureValidator::new("k");
        let sig = v.sign(BODY).unwrap();
        let ev = ingest(Some(&v), BODY, Some(&sig)).unwrap();
        assert_eq!(ev.kind(), EventKind::TaskCreated);
        assert_eq!(ev.timestamp().to_rfc3339(), "2026-10-19T10:00:00+00:00");
    }

    #[test]
    fn bad_signature_is_auth_failure() {
        let v = SignatureValidator::new("k");
        let err = ingest(Some(&v), BODY, Some(&"0".repeat(64))).unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[test]
    fn garbage_body_is_malformed() {
        let err = ingest(None, b"not json", None).unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn unknown_kind_is_not_auth_failure() {
        let body = br#"{"event_name":"label.created","data":{}}"#;
        let err = ingest(None, body, None).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Classify(ClassifyError::UnknownEventKind(_))
        ));
        assert!(!err.is_auth_failure());
    }
}
