use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClassifyError, Result};
use crate::event::EventData;
use crate::event::WebhookEvent;
use crate::kind::EventKind;

/// Outer JSON body Vikunja posts: `{ event_name, time, data }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event_name: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEnvelope {
    pub fn parse(raw_body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw_body)
    }

    /// Event time from the envelope, if present and well-formed.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Map a raw event name and payload to a typed [`WebhookEvent`].
///
/// The event is stamped with the current time; use
/// [`WebhookEvent::with_timestamp`] to carry the upstream time instead.
pub fn classify(event_name: &str, raw_data: Value) -> Result<WebhookEvent> {
    let kind: EventKind = event_name.parse()?;

    let data = match kind {
        EventKind::TaskCreated | EventKind::TaskUpdated | EventKind::TaskDeleted => {
            EventData::Task(shape(kind, raw_data)?)
        }
        EventKind::TaskAssigneeCreated | EventKind::TaskAssigneeDeleted => {
            EventData::TaskAssignee(shape(kind, raw_data)?)
        }
        EventKind::TaskCommentCreated
        | EventKind::TaskCommentEdited
        | EventKind::TaskCommentDeleted => EventData::TaskComment(shape(kind, raw_data)?),
        EventKind::TaskAttachmentCreated | EventKind::TaskAttachmentDeleted => {
            EventData::TaskAttachment(shape(kind, raw_data)?)
        }
        EventKind::TaskRelationCreated | EventKind::TaskRelationDeleted => {
            EventData::TaskRelation(shape(kind, raw_data)?)
        }
        EventKind::ProjectCreated | EventKind::ProjectUpdated | EventKind::ProjectDeleted => {
            EventData::Project(shape(kind, raw_data)?)
        }
        EventKind::ProjectSharedUser => EventData::ProjectSharedUser(shape(kind, raw_data)?),
        EventKind::ProjectSharedTeam => EventData::ProjectSharedTeam(shape(kind, raw_data)?),
        EventKind::TeamCreated | EventKind::TeamDeleted => EventData::Team(shape(kind, raw_data)?),
        EventKind::TeamMemberAdded | EventKind::TeamMemberRemoved => {
            EventData::TeamMember(shape(kind, raw_data)?)
        }
    };

    Ok(WebhookEvent::new(kind, Utc::now(), data))
}

fn shape<T: DeserializeOwned>(kind: EventKind, raw: Value) -> Result<T> {
    if !raw.is_object() {
        return Err(ClassifyError::SchemaMismatch {
            kind,
            reason: "data is not an object".to_string(),
        });
    }
    serde_json::from_value(raw).map_err(|e| ClassifyError::SchemaMismatch {
        kind,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_payload() -> Value {
        json!({
            "task": {"id": 42, "title": "Fix bug", "project_id": 3},
            "doer": {"id": 1, "username": "ana"}
        })
    }

    #[test]
    fn task_created_classifies() {
        let ev = classify("task.created", task_payload()).unwrap();
        assert_eq!(ev.kind(), EventKind::TaskCreated);
        let task = ev.data().task().unwrap();
        assert_eq!(task.id, 42);
        assert_eq!(ev.data().doer().username, "ana");
        assert_eq!(ev.data().project_id(), Some(3));
    }

    #[test]
    fn unknown_kind_is_reported() {
        let err = classify("task.archived", task_payload()).unwrap_err();
        assert!(matches!(err, ClassifyError::UnknownEventKind(ref n) if n == "task.archived"));
    }

    #[test]
    fn missing_doer_is_schema_mismatch() {
        let err = classify(
            "task.updated",
            json!({"task": {"id": 1, "title": "t", "project_id": 1}}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::SchemaMismatch {
                kind: EventKind::TaskUpdated,
                ..
            }
        ));
    }

    #[test]
    fn comment_kind_requires_comment_object() {
        let err = classify("task.comment.created", task_payload()).unwrap_err();
        assert!(matches!(err, ClassifyError::SchemaMismatch { .. }));
    }

    #[test]
    fn non_object_data_is_schema_mismatch() {
        let err = classify("team.created", json!([1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::SchemaMismatch {
                kind: EventKind::TeamCreated,
                ..
            }
        ));
    }

    #[test]
    fn envelope_parses_time() {
        let env = WebhookEnvelope::parse(
            br#"{"event_name":"task.created","time":"2026-10-19T10:00:00.123456789-03:00","data":{}}"#,
        )
        .unwrap();
        assert_eq!(env.event_name, "task.created");
        assert_eq!(
            env.timestamp().unwrap().to_rfc3339(),
            "2026-10-19T13:00:00.123456789+00:00"
        );
    }
}
