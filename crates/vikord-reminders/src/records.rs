use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a reminder or digest is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Dm,
    Guild,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Dm => "dm",
            TargetType::Guild => "guild",
        }
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dm" => Ok(TargetType::Dm),
            "guild" => Ok(TargetType::Guild),
            other => Err(format!("unknown target type: {other}")),
        }
    }
}

/// Who a reminder pings in the message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionMode {
    #[default]
    Assignees,
    Everyone,
}

impl MentionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentionMode::Assignees => "assignees",
            MentionMode::Everyone => "everyone",
        }
    }
}

impl std::str::FromStr for MentionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "assignees" => Ok(MentionMode::Assignees),
            "everyone" => Ok(MentionMode::Everyone),
            other => Err(format!("unknown mention mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderRecord {
    pub id: i64,
    pub owner_discord_id: String,
    pub task_id: i64,
    pub project_id: i64,
    pub target_type: TargetType,
    pub guild_id: Option<String>,
    pub cron_expression: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub mention_mode: MentionMode,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestRecord {
    pub id: i64,
    pub owner_discord_id: String,
    pub project_id: i64,
    pub target_type: TargetType,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub cron_expression: String,
    /// Custom cadence in days, layered on a daily expression.
    pub interval_days: Option<u32>,
    pub min_priority: i64,
    pub next_run_at: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// User input for a new reminder, before `next_run_at` is known.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub owner_discord_id: String,
    pub task_id: i64,
    pub project_id: i64,
    pub target_type: TargetType,
    pub guild_id: Option<String>,
    pub cron_expression: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub mention_mode: MentionMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDigest {
    pub owner_discord_id: String,
    pub project_id: i64,
    pub target_type: TargetType,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub cron_expression: String,
    pub interval_days: Option<u32>,
    pub min_priority: i64,
}
