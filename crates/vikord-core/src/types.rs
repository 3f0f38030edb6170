//! Vikunja entities as they appear in webhook payloads and REST responses.
//!
//! Only the fields the bot reads are modelled; everything else is ignored by
//! serde. Vikunja quirks are normalised at deserialisation time:
//! - "no date" is sent as `0001-01-01T00:00:00Z` and becomes `None`
//! - empty collections are sent as `null` and become empty vectors

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A Vikunja account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
}

impl User {
    /// Human-facing name: the profile name when set, else the username.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub hex_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, deserialize_with = "vikunja_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "vikunja_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "vikunja_date")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i64,
    /// 0.0 ..= 1.0
    #[serde(default)]
    pub percent_done: f64,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub index: i64,
    pub project_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assignees: Vec<User>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "vikunja_date")]
    pub created: Option<DateTime<Utc>>,
    pub created_by: Option<User>,
}

impl Task {
    /// Short reference shown to users: `PROJ-12` when the project has an
    /// identifier, otherwise `#<index>` (or `#<id>` when no index is known).
    pub fn reference(&self) -> String {
        if !self.identifier.trim().is_empty() {
            self.identifier.clone()
        } else if self.index > 0 {
            format!("#{}", self.index)
        } else {
            format!("#{}", self.id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub hex_color: String,
    pub owner: Option<User>,
    #[serde(default)]
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub comment: String,
    pub author: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub task_id: i64,
    pub file: FileInfo,
    pub created_by: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRelation {
    pub task_id: i64,
    pub other_task_id: i64,
    pub relation_kind: String,
    pub created_by: Option<User>,
}

/// Deserialise a Vikunja timestamp, mapping `null`, empty strings and the
/// zero date (year 1) to `None`.
pub fn vikunja_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            let dt = DateTime::parse_from_rfc3339(s)
                .map_err(serde::de::Error::custom)?
                .with_timezone(&Utc);
            Ok(non_zero_date(dt))
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_zero_date(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (dt.year() > 1).then_some(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_date_and_null_collections_normalise() {
        let task: Task = serde_json::from_value(json!({
            "id": 42,
            "title": "Fix bug",
            "project_id": 3,
            "due_date": "0001-01-01T00:00:00Z",
            "start_date": null,
            "assignees": null,
            "labels": null
        }))
        .unwrap();
        assert!(task.due_date.is_none());
        assert!(task.start_date.is_none());
        assert!(task.assignees.is_empty());
        assert!(task.labels.is_empty());
    }

    #[test]
    fn real_due_date_is_kept() {
        let task: Task = serde_json::from_value(json!({
            "id": 1,
            "title": "t",
            "project_id": 1,
            "due_date": "2026-11-02T12:00:00-03:00"
        }))
        .unwrap();
        let due = task.due_date.unwrap();
        assert_eq!(due.to_rfc3339(), "2026-11-02T15:00:00+00:00");
    }

    #[test]
    fn task_reference_prefers_identifier() {
        let mut task: Task =
            serde_json::from_value(json!({"id": 9, "title": "t", "project_id": 1})).unwrap();
        assert_eq!(task.reference(), "#9");
        task.index = 4;
        assert_eq!(task.reference(), "#4");
        task.identifier = "OPS-4".into();
        assert_eq!(task.reference(), "OPS-4");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let u = User {
            id: 1,
            name: " ".into(),
            username: "ana".into(),
        };
        assert_eq!(u.display_name(), "ana");
    }
}
