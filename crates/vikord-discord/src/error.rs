use vikord_core::VikordError;
use vikord_reminders::ReminderError;
use vikord_users::UserError;

/// Errors produced by the Discord adapter.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("no bot token configured")]
    NoToken,
}

/// Why a slash command could not complete. Every variant renders as the
/// ephemeral reply the invoker sees.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Bad or missing input; the text tells the user how to fix it.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Reminder(#[from] ReminderError),

    #[error(transparent)]
    Users(#[from] UserError),

    #[error(transparent)]
    Upstream(#[from] VikordError),
}

impl CommandError {
    pub fn usage(msg: impl Into<String>) -> Self {
        CommandError::Usage(msg.into())
    }

    /// Text shown to the user. Internal failures stay generic; the details
    /// go to the log.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::Usage(msg) => msg.clone(),
            CommandError::Reminder(ReminderError::InvalidCadence(msg)) => msg.clone(),
            CommandError::Reminder(ReminderError::NotFound { kind, id }) => {
                format!("Não encontrei {} #{id}.", kind_pt(kind))
            }
            CommandError::Reminder(ReminderError::NotOwner { kind, id }) => {
                format!("{} #{id} pertence a outra pessoa.", capitalize(kind_pt(kind)))
            }
            CommandError::Users(UserError::AlreadyLinked { .. }) => {
                "Esse usuário Vikunja já está vinculado a outra conta do Discord.".to_string()
            }
            CommandError::Upstream(_) => {
                "⚠️ O Vikunja não respondeu como esperado. Tente novamente em instantes.".to_string()
            }
            _ => "⚠️ Erro interno. Tente novamente mais tarde.".to_string(),
        }
    }
}

fn kind_pt(kind: &str) -> &'static str {
    match kind {
        "reminder" => "o lembrete",
        "digest" => "o resumo",
        _ => "o registro",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
