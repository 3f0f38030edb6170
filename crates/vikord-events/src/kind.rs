use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;

/// Every Vikunja webhook event the bot understands.
///
/// The wire names are Vikunja's `event_name` values verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "task.created")]
    TaskCreated,
    #[serde(rename = "task.updated")]
    TaskUpdated,
    #[serde(rename = "task.deleted")]
    TaskDeleted,
    #[serde(rename = "task.assignee.created")]
    TaskAssigneeCreated,
    #[serde(rename = "task.assignee.deleted")]
    TaskAssigneeDeleted,
    #[serde(rename = "task.comment.created")]
    TaskCommentCreated,
    #[serde(rename = "task.comment.edited")]
    TaskCommentEdited,
    #[serde(rename = "task.comment.deleted")]
    TaskCommentDeleted,
    #[serde(rename = "task.attachment.created")]
    TaskAttachmentCreated,
    #[serde(rename = "task.attachment.deleted")]
    TaskAttachmentDeleted,
    #[serde(rename = "task.relation.created")]
    TaskRelationCreated,
    #[serde(rename = "task.relation.deleted")]
    TaskRelationDeleted,
    #[serde(rename = "project.created")]
    ProjectCreated,
    #[serde(rename = "project.updated")]
    ProjectUpdated,
    #[serde(rename = "project.deleted")]
    ProjectDeleted,
    #[serde(rename = "project.shared.user")]
    ProjectSharedUser,
    #[serde(rename = "project.shared.team")]
    ProjectSharedTeam,
    #[serde(rename = "team.created")]
    TeamCreated,
    #[serde(rename = "team.deleted")]
    TeamDeleted,
    #[serde(rename = "team.member.added")]
    TeamMemberAdded,
    #[serde(rename = "team.member.removed")]
    TeamMemberRemoved,
}

/// Top-level grouping used by the payload builder to pick a rendering path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    Task,
    Project,
    Team,
}

impl EventKind {
    pub const ALL: [EventKind; 21] = [
        EventKind::TaskCreated,
        EventKind::TaskUpdated,
        EventKind::TaskDeleted,
        EventKind::TaskAssigneeCreated,
        EventKind::TaskAssigneeDeleted,
        EventKind::TaskCommentCreated,
        EventKind::TaskCommentEdited,
        EventKind::TaskCommentDeleted,
        EventKind::TaskAttachmentCreated,
        EventKind::TaskAttachmentDeleted,
        EventKind::TaskRelationCreated,
        EventKind::TaskRelationDeleted,
        EventKind::ProjectCreated,
        EventKind::ProjectUpdated,
        EventKind::ProjectDeleted,
        EventKind::ProjectSharedUser,
        EventKind::ProjectSharedTeam,
        EventKind::TeamCreated,
        EventKind::TeamDeleted,
        EventKind::TeamMemberAdded,
        EventKind::TeamMemberRemoved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskCreated => "task.created",
            EventKind::TaskUpdated => "task.updated",
            EventKind::TaskDeleted => "task.deleted",
            EventKind::TaskAssigneeCreated => "task.assignee.created",
            EventKind::TaskAssigneeDeleted => "task.assignee.deleted",
            EventKind::TaskCommentCreated => "task.comment.created",
            EventKind::TaskCommentEdited => "task.comment.edited",
            EventKind::TaskCommentDeleted => "task.comment.deleted",
            EventKind::TaskAttachmentCreated => "task.attachment.created",
            EventKind::TaskAttachmentDeleted => "task.attachment.deleted",
            EventKind::TaskRelationCreated => "task.relation.created",
            EventKind::TaskRelationDeleted => "task.relation.deleted",
            EventKind::ProjectCreated => "project.created",
            EventKind::ProjectUpdated => "project.updated",
            EventKind::ProjectDeleted => "project.deleted",
            EventKind::ProjectSharedUser => "project.shared.user",
            EventKind::ProjectSharedTeam => "project.shared.team",
            EventKind::TeamCreated => "team.created",
            EventKind::TeamDeleted => "team.deleted",
            EventKind::TeamMemberAdded => "team.member.added",
            EventKind::TeamMemberRemoved => "team.member.removed",
        }
    }

    pub fn family(&self) -> EventFamily {
        match self {
            EventKind::TaskCreated
            | EventKind::TaskUpdated
            | EventKind::TaskDeleted
            | EventKind::TaskAssigneeCreated
            | EventKind::TaskAssigneeDeleted
            | EventKind::TaskCommentCreated
            | EventKind::TaskCommentEdited
            | EventKind::TaskCommentDeleted
            | EventKind::TaskAttachmentCreated
            | EventKind::TaskAttachmentDeleted
            | EventKind::TaskRelationCreated
            | EventKind::TaskRelationDeleted => EventFamily::Task,
            EventKind::ProjectCreated
            | EventKind::ProjectUpdated
            | EventKind::ProjectDeleted
            | EventKind::ProjectSharedUser
            | EventKind::ProjectSharedTeam => EventFamily::Project,
            EventKind::TeamCreated
            | EventKind::TeamDeleted
            | EventKind::TeamMemberAdded
            | EventKind::TeamMemberRemoved => EventFamily::Team,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = ClassifyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ClassifyError::UnknownEventKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn serde_names_match_as_str() {
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        for name in ["task.archived", "", "TASK.CREATED", "task"] {
            assert!(matches!(
                name.parse::<EventKind>(),
                Err(ClassifyError::UnknownEventKind(n)) if n == name
            ));
        }
    }

    #[test]
    fn families_partition_by_prefix() {
        for kind in EventKind::ALL {
            let expected = match kind.as_str().split('.').next() {
                Some("task") => EventFamily::Task,
                Some("project") => EventFamily::Project,
                _ => EventFamily::Team,
            };
            assert_eq!(kind.family(), expected, "{kind}");
        }
    }
}
