// Every supported Vikunja event kind must classify from a well-formed
// payload, and the typed data must carry what the payload carried.

use serde_json::{json, Value};
use vikord_events::{classify, ClassifyError, EventData, EventKind};

fn user(id: i64, username: &str) -> Value {
    json!({"id": id, "name": "", "username": username, "created": "2026-01-01T00:00:00Z"})
}

fn task() -> Value {
    json!({
        "id": 42,
        "title": "Fix bug",
        "description": "<p>Steps</p>",
        "done": false,
        "due_date": "2026-11-01T12:00:00Z",
        "priority": 3,
        "percent_done": 0.5,
        "identifier": "OPS-7",
        "index": 7,
        "project_id": 3,
        "assignees": [user(5, "bea")],
        "labels": [{"id": 1, "title": "bug", "hex_color": "e8445a"}],
        "created": "2026-10-01T09:00:00Z"
    })
}

fn project() -> Value {
    json!({"id": 3, "title": "Ops", "identifier": "OPS", "owner": user(1, "ana")})
}

fn team() -> Value {
    json!({"id": 8, "name": "Platform", "description": "infra folks"})
}

fn fixture(kind: EventKind) -> Value {
    let doer = user(1, "ana");
    match kind {
        EventKind::TaskCreated | EventKind::TaskUpdated | EventKind::TaskDeleted => {
            json!({"task": task(), "doer": doer})
        }
        EventKind::TaskAssigneeCreated | EventKind::TaskAssigneeDeleted => {
            json!({"task": task(), "doer": doer, "assignee": user(5, "bea")})
        }
        EventKind::TaskCommentCreated
        | EventKind::TaskCommentEdited
        | EventKind::TaskCommentDeleted => json!({
            "task": task(),
            "doer": doer,
            "comment": {"id": 11, "comment": "<p>looks good</p>", "author": user(1, "ana")}
        }),
        EventKind::TaskAttachmentCreated | EventKind::TaskAttachmentDeleted => json!({
            "task": task(),
            "doer": doer,
            "attachment": {"id": 4, "task_id": 42, "file": {"name": "log.txt", "size": 12}}
        }),
        EventKind::TaskRelationCreated | EventKind::TaskRelationDeleted => json!({
            "task": task(),
            "doer": doer,
            "relation": {"task_id": 42, "other_task_id": 43, "relation_kind": "blocking"}
        }),
        EventKind::ProjectCreated | EventKind::ProjectUpdated | EventKind::ProjectDeleted => {
            json!({"project": project(), "doer": doer})
        }
        EventKind::ProjectSharedUser => {
            json!({"project": project(), "doer": doer, "user": user(9, "caio")})
        }
        EventKind::ProjectSharedTeam => {
            json!({"project": project(), "doer": doer, "team": team()})
        }
        EventKind::TeamCreated | EventKind::TeamDeleted => json!({"team": team(), "doer": doer}),
        EventKind::TeamMemberAdded | EventKind::TeamMemberRemoved => {
            json!({"team": team(), "doer": doer, "member": user(9, "caio")})
        }
    }
}

#[test]
fn every_kind_classifies_its_fixture() {
    for kind in EventKind::ALL {
        let ev = classify(kind.as_str(), fixture(kind))
            .unwrap_or_else(|e| panic!("{kind} failed to classify: {e}"));
        assert_eq!(ev.kind(), kind);
        assert_eq!(ev.data().doer().id, 1, "{kind}");
    }
}

#[test]
fn classified_data_matches_fixture() {
    for kind in EventKind::ALL {
        let ev = classify(kind.as_str(), fixture(kind)).unwrap();
        match ev.data() {
            EventData::Task(e) => {
                assert_eq!(e.task.title, "Fix bug");
                assert_eq!(e.task.assignees[0].username, "bea");
                assert_eq!(e.task.labels[0].title, "bug");
            }
            EventData::TaskAssignee(e) => assert_eq!(e.assignee.id, 5),
            EventData::TaskComment(e) => assert_eq!(e.comment.comment, "<p>looks good</p>"),
            EventData::TaskAttachment(e) => assert_eq!(e.attachment.file.name, "log.txt"),
            EventData::TaskRelation(e) => {
                assert_eq!(e.relation.other_task_id, 43);
                assert_eq!(e.relation.relation_kind, "blocking");
            }
            EventData::Project(e) => assert_eq!(e.project.identifier, "OPS"),
            EventData::ProjectSharedUser(e) => assert_eq!(e.user.username, "caio"),
            EventData::ProjectSharedTeam(e) => assert_eq!(e.team.name, "Platform"),
            EventData::Team(e) => assert_eq!(e.team.description, "infra folks"),
            EventData::TeamMember(e) => assert_eq!(e.member.id, 9),
        }
    }
}

#[test]
fn kind_and_shape_cannot_disagree() {
    // A team payload sent under a task name is a schema mismatch, not a team event.
    let err = classify("task.created", fixture(EventKind::TeamCreated)).unwrap_err();
    assert!(matches!(
        err,
        ClassifyError::SchemaMismatch {
            kind: EventKind::TaskCreated,
            ..
        }
    ));
}

#[test]
fn names_outside_the_enumeration_are_unknown() {
    for name in ["task.moved", "label.created", "project", "team.member", "x"] {
        assert!(matches!(
            classify(name, json!({})),
            Err(ClassifyError::UnknownEventKind(_))
        ));
    }
}
