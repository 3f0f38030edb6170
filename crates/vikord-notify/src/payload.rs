use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vikord_core::types::User;
use vikord_events::EventKind;

/// What a notification is about. Reminders and digests are synthetic kinds
/// produced by the scheduler rather than by upstream webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NotificationKind {
    Event(EventKind),
    Reminder,
    Digest,
}

impl From<EventKind> for NotificationKind {
    fn from(kind: EventKind) -> Self {
        NotificationKind::Event(kind)
    }
}

/// A Vikunja user as shown in Discord.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReference {
    pub external_id: i64,
    pub display_name: String,
    pub username: String,
    /// Present only when an identity mapping exists.
    pub chat_user_id: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserReference {
    pub fn from_user(user: &User, resolved: &HashMap<i64, String>) -> Self {
        Self {
            external_id: user.id,
            display_name: user.display_name().to_string(),
            username: user.username.clone(),
            chat_user_id: resolved.get(&user.id).cloned(),
            avatar_url: None,
        }
    }

    /// Actor used for scheduler-originated notifications.
    pub fn system() -> Self {
        Self {
            external_id: 0,
            display_name: "Vikord".to_string(),
            username: "vikord".to_string(),
            chat_user_id: None,
            avatar_url: None,
        }
    }

    /// `<@id>` when linked, otherwise the plain display name.
    pub fn mention(&self) -> String {
        match &self.chat_user_id {
            Some(id) => format!("<@{id}>"),
            None => self.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
    pub id: i64,
    pub title: String,
    pub identifier: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskContext {
    /// `OPS-12` or `#12`.
    pub reference: String,
    pub done: bool,
    pub priority: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// 0.0 ..= 1.0
    pub percent_done: f64,
    pub assignees: Vec<UserReference>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentContext {
    pub task_reference: String,
    /// Plain text, at most [`crate::text::COMMENT_MAX_CHARS`] characters.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentContext {
    pub task_reference: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationContext {
    pub task_reference: String,
    pub relation_kind: String,
    pub related_task_id: i64,
    pub related_task_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamContext {
    pub description: String,
    pub member: Option<UserReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectContext {
    pub owner: Option<UserReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationContext {
    Task(TaskContext),
    Comment(CommentContext),
    Attachment(AttachmentContext),
    Relation(RelationContext),
    Team(TeamContext),
    Project(ProjectContext),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Render-ready description of one notification. Built fresh per event or
/// scheduler firing and consumed once by the formatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub kind: NotificationKind,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub project: Option<ProjectInfo>,
    pub author: Option<UserReference>,
    pub context: Option<NotificationContext>,
    /// Extra fields rendered after the context fields.
    pub fields: Vec<Field>,
    /// Overrides the per-kind color table.
    pub color: Option<u32>,
    pub timestamp: DateTime<Utc>,
}
