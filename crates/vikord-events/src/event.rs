use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vikord_core::types::{Attachment, Comment, Project, Task, TaskRelation, Team, User};

use crate::kind::EventKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task: Task,
    pub doer: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssigneeEvent {
    pub task: Task,
    pub doer: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    pub assignee: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCommentEvent {
    pub task: Task,
    pub doer: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    pub comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAttachmentEvent {
    pub task: Task,
    pub doer: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRelationEvent {
    pub task: Task,
    pub doer: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    pub relation: TaskRelation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEvent {
    pub project: Project,
    pub doer: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSharedUserEvent {
    pub project: Project,
    pub doer: User,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSharedTeamEvent {
    pub project: Project,
    pub doer: User,
    pub team: Team,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEvent {
    pub team: Team,
    pub doer: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberEvent {
    pub team: Team,
    pub doer: User,
    pub member: User,
}

/// Payload shape, one variant per schema. Several kinds share a shape
/// (e.g. all three plain task kinds carry a [`TaskEvent`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    Task(TaskEvent),
    TaskAssignee(TaskAssigneeEvent),
    TaskComment(TaskCommentEvent),
    TaskAttachment(TaskAttachmentEvent),
    TaskRelation(TaskRelationEvent),
    Project(ProjectEvent),
    ProjectSharedUser(ProjectSharedUserEvent),
    ProjectSharedTeam(ProjectSharedTeamEvent),
    Team(TeamEvent),
    TeamMember(TeamMemberEvent),
}

impl EventData {
    /// The task every task-family payload carries.
    pub fn task(&self) -> Option<&Task> {
        match self {
            EventData::Task(e) => Some(&e.task),
            EventData::TaskAssignee(e) => Some(&e.task),
            EventData::TaskComment(e) => Some(&e.task),
            EventData::TaskAttachment(e) => Some(&e.task),
            EventData::TaskRelation(e) => Some(&e.task),
            _ => None,
        }
    }

    /// Project embedded in a task-family payload, when the sender included it.
    pub fn embedded_project(&self) -> Option<&Project> {
        match self {
            EventData::Task(e) => e.project.as_ref(),
            EventData::TaskAssignee(e) => e.project.as_ref(),
            EventData::TaskComment(e) => e.project.as_ref(),
            EventData::TaskAttachment(e) => e.project.as_ref(),
            EventData::TaskRelation(e) => e.project.as_ref(),
            _ => None,
        }
    }

    /// The acting user.
    pub fn doer(&self) -> &User {
        match self {
            EventData::Task(e) => &e.doer,
            EventData::TaskAssignee(e) => &e.doer,
            EventData::TaskComment(e) => &e.doer,
            EventData::TaskAttachment(e) => &e.doer,
            EventData::TaskRelation(e) => &e.doer,
            EventData::Project(e) => &e.doer,
            EventData::ProjectSharedUser(e) => &e.doer,
            EventData::ProjectSharedTeam(e) => &e.doer,
            EventData::Team(e) => &e.doer,
            EventData::TeamMember(e) => &e.doer,
        }
    }

    /// Project the event belongs to, if any (team events have none).
    pub fn project_id(&self) -> Option<i64> {
        match self {
            EventData::Project(e) => Some(e.project.id),
            EventData::ProjectSharedUser(e) => Some(e.project.id),
            EventData::ProjectSharedTeam(e) => Some(e.project.id),
            EventData::Team(_) | EventData::TeamMember(_) => None,
            other => other.task().map(|t| t.project_id),
        }
    }
}

/// A classified, schema-checked webhook event.
///
/// Only constructed by [`crate::classify`], which guarantees that `kind`
/// matches the shape of `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEvent {
    kind: EventKind,
    timestamp: DateTime<Utc>,
    data: EventData,
}

impl WebhookEvent {
    pub(crate) fn new(kind: EventKind, timestamp: DateTime<Utc>, data: EventData) -> Self {
        Self {
            kind,
            timestamp,
            data,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
