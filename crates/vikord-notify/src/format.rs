//! Payload → Discord-shaped message. Pure and deterministic: the same
//! payload always renders to the same message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vikord_events::EventKind;

use crate::payload::{Field, NotificationContext, NotificationKind, NotificationPayload, TaskContext};
use crate::priority::priority_badge;
use crate::text::truncate_chars;

pub const DEFAULT_COLOR: u32 = 0x95a5a6;
pub const DEFAULT_ICON: &str = "🔔";

const MAX_FIELDS: usize = 25;
const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 4096;

const COLORS: &[(NotificationKind, u32)] = &[
    (NotificationKind::Event(EventKind::TaskCreated), 0x2ecc71),
    (NotificationKind::Event(EventKind::TaskUpdated), 0x3498db),
    (NotificationKind::Event(EventKind::TaskDeleted), 0xe74c3c),
    (NotificationKind::Event(EventKind::TaskAssigneeCreated), 0x9b59b6),
    (NotificationKind::Event(EventKind::TaskAssigneeDeleted), 0x8e7cc3),
    (NotificationKind::Event(EventKind::TaskCommentCreated), 0x1abc9c),
    (NotificationKind::Event(EventKind::TaskCommentEdited), 0x16a085),
    (NotificationKind::Event(EventKind::TaskCommentDeleted), 0xc0392b),
    (NotificationKind::Event(EventKind::TaskAttachmentCreated), 0xe67e22),
    (NotificationKind::Event(EventKind::TaskAttachmentDeleted), 0xd35400),
    (NotificationKind::Event(EventKind::TaskRelationCreated), 0x34495e),
    (NotificationKind::Event(EventKind::TaskRelationDeleted), 0x2c3e50),
    (NotificationKind::Event(EventKind::ProjectCreated), 0x27ae60),
    (NotificationKind::Event(EventKind::ProjectUpdated), 0x2980b9),
    (NotificationKind::Event(EventKind::ProjectDeleted), 0xc0392b),
    (NotificationKind::Event(EventKind::ProjectSharedUser), 0x8e44ad),
    (NotificationKind::Event(EventKind::ProjectSharedTeam), 0x8e44ad),
    (NotificationKind::Event(EventKind::TeamCreated), 0x27ae60),
    (NotificationKind::Event(EventKind::TeamDeleted), 0xc0392b),
    (NotificationKind::Event(EventKind::TeamMemberAdded), 0x2ecc71),
    (NotificationKind::Event(EventKind::TeamMemberRemoved), 0xe74c3c),
    (NotificationKind::Reminder, 0xf1c40f),
    (NotificationKind::Digest, 0x5865f2),
];

const ICONS: &[(NotificationKind, &str)] = &[
    (NotificationKind::Event(EventKind::TaskCreated), "🆕"),
    (NotificationKind::Event(EventKind::TaskUpdated), "✏️"),
    (NotificationKind::Event(EventKind::TaskDeleted), "🗑️"),
    (NotificationKind::Event(EventKind::TaskAssigneeCreated), "👤"),
    (NotificationKind::Event(EventKind::TaskAssigneeDeleted), "👤"),
    (NotificationKind::Event(EventKind::TaskCommentCreated), "💬"),
    (NotificationKind::Event(EventKind::TaskCommentEdited), "💬"),
    (NotificationKind::Event(EventKind::TaskCommentDeleted), "💬"),
    (NotificationKind::Event(EventKind::TaskAttachmentCreated), "📎"),
    (NotificationKind::Event(EventKind::TaskAttachmentDeleted), "📎"),
    (NotificationKind::Event(EventKind::TaskRelationCreated), "🔗"),
    (NotificationKind::Event(EventKind::TaskRelationDeleted), "🔗"),
    (NotificationKind::Event(EventKind::ProjectCreated), "📁"),
    (NotificationKind::Event(EventKind::ProjectUpdated), "📁"),
    (NotificationKind::Event(EventKind::ProjectDeleted), "🗑️"),
    (NotificationKind::Event(EventKind::ProjectSharedUser), "🤝"),
    (NotificationKind::Event(EventKind::ProjectSharedTeam), "🤝"),
    (NotificationKind::Event(EventKind::TeamCreated), "👥"),
    (NotificationKind::Event(EventKind::TeamDeleted), "👥"),
    (NotificationKind::Event(EventKind::TeamMemberAdded), "➕"),
    (NotificationKind::Event(EventKind::TeamMemberRemoved), "➖"),
    (NotificationKind::Reminder, "⏰"),
    (NotificationKind::Digest, "📋"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorBlock {
    pub name: String,
    /// `<@id>` when the author has a linked Discord account.
    pub mention: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEmbed {
    pub title: String,
    pub color: u32,
    pub description: Option<String>,
    pub fields: Vec<Field>,
    pub url: Option<String>,
    pub author: Option<AuthorBlock>,
    pub footer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMessage {
    /// Plain message text sent alongside the embed (mentions live here).
    pub content: Option<String>,
    pub embed: RenderedEmbed,
}

impl RenderedMessage {
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        self.content = (!content.is_empty()).then_some(content);
        self
    }
}

pub fn color_for(kind: NotificationKind) -> u32 {
    lookup(COLORS, kind).unwrap_or(DEFAULT_COLOR)
}

pub fn icon_for(kind: NotificationKind) -> &'static str {
    lookup(ICONS, kind).unwrap_or(DEFAULT_ICON)
}

fn lookup<T: Copy>(table: &[(NotificationKind, T)], kind: NotificationKind) -> Option<T> {
    table.iter().find(|(k, _)| *k == kind).map(|(_, v)| *v)
}

pub fn kind_label(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Reminder => "Lembrete",
        NotificationKind::Digest => "Resumo",
        NotificationKind::Event(kind) => match kind {
            EventKind::TaskCreated => "Tarefa criada",
            EventKind::TaskUpdated => "Tarefa atualizada",
            EventKind::TaskDeleted => "Tarefa excluída",
            EventKind::TaskAssigneeCreated => "Responsável adicionado",
            EventKind::TaskAssigneeDeleted => "Responsável removido",
            EventKind::TaskCommentCreated => "Novo comentário",
            EventKind::TaskCommentEdited => "Comentário editado",
            EventKind::TaskCommentDeleted => "Comentário excluído",
            EventKind::TaskAttachmentCreated => "Anexo adicionado",
            EventKind::TaskAttachmentDeleted => "Anexo removido",
            EventKind::TaskRelationCreated => "Relação criada",
            EventKind::TaskRelationDeleted => "Relação removida",
            EventKind::ProjectCreated => "Projeto criado",
            EventKind::ProjectUpdated => "Projeto atualizado",
            EventKind::ProjectDeleted => "Projeto excluído",
            EventKind::ProjectSharedUser => "Projeto compartilhado",
            EventKind::ProjectSharedTeam => "Projeto compartilhado",
            EventKind::TeamCreated => "Equipe criada",
            EventKind::TeamDeleted => "Equipe excluída",
            EventKind::TeamMemberAdded => "Membro adicionado",
            EventKind::TeamMemberRemoved => "Membro removido",
        },
    }
}

fn relation_label(kind: &str) -> &str {
    match kind {
        "subtask" => "Subtarefa",
        "parenttask" => "Tarefa pai",
        "related" => "Relacionada",
        "duplicateof" => "Duplicata de",
        "duplicates" => "Duplica",
        "blocking" => "Bloqueia",
        "blocked" => "Bloqueada por",
        "precedes" => "Precede",
        "follows" => "Segue",
        "copiedfrom" => "Copiada de",
        "copiedto" => "Copiada para",
        other => other,
    }
}

pub fn format(payload: &NotificationPayload) -> RenderedMessage {
    let kind = payload.kind;
    let title = truncate_chars(
        &format!("{} {}: {}", icon_for(kind), kind_label(kind), payload.title),
        MAX_TITLE_CHARS,
    );

    let mut description = payload.description.clone();
    let mut fields = Vec::new();
    if let Some(context) = &payload.context {
        if let NotificationContext::Comment(c) = context {
            description = Some(match description {
                Some(d) => format!("{d}\n\n{}", c.text),
                None => c.text.clone(),
            });
        }
        fields = context_fields(context);
    }
    fields.extend(payload.fields.iter().cloned());
    fields.truncate(MAX_FIELDS);

    let author = payload.author.as_ref().map(|a| AuthorBlock {
        name: a.display_name.clone(),
        mention: a.chat_user_id.as_ref().map(|id| format!("<@{id}>")),
        icon_url: a.avatar_url.clone(),
    });

    RenderedMessage {
        content: None,
        embed: RenderedEmbed {
            title,
            color: payload.color.unwrap_or_else(|| color_for(kind)),
            description: description
                .filter(|d| !d.is_empty())
                .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS)),
            fields,
            url: payload.url.clone(),
            author,
            footer: payload.project.as_ref().map(|p| format!("📁 {}", p.title)),
            timestamp: payload.timestamp,
        },
    }
}

fn context_fields(context: &NotificationContext) -> Vec<Field> {
    match context {
        NotificationContext::Task(t) => task_fields(t),
        NotificationContext::Comment(c) => vec![Field::new("Tarefa", &c.task_reference, true)],
        NotificationContext::Attachment(a) => vec![
            Field::new("Tarefa", &a.task_reference, true),
            Field::new("Arquivo", &a.file_name, true),
        ],
        NotificationContext::Relation(r) => {
            let related = match &r.related_task_url {
                Some(url) => format!("[#{}]({url})", r.related_task_id),
                None => format!("#{}", r.related_task_id),
            };
            vec![
                Field::new("Tarefa", &r.task_reference, true),
                Field::new("Relação", relation_label(&r.relation_kind), true),
                Field::new("Tarefa relacionada", related, true),
            ]
        }
        NotificationContext::Team(t) => {
            let mut fields = Vec::new();
            if !t.description.is_empty() {
                fields.push(Field::new("Descrição", &t.description, false));
            }
            if let Some(member) = &t.member {
                fields.push(Field::new("Membro", member.mention(), true));
            }
            fields
        }
        NotificationContext::Project(p) => p
            .owner
            .iter()
            .map(|o| Field::new("Dono", o.mention(), true))
            .collect(),
    }
}

/// Identifier, status, priority, due date, progress, assignees, labels.
/// Priority and progress are omitted at zero; the rest when empty.
fn task_fields(t: &TaskContext) -> Vec<Field> {
    let mut fields = vec![
        Field::new("Tarefa", &t.reference, true),
        Field::new(
            "Status",
            if t.done { "✅ Concluída" } else { "🔄 Em aberto" },
            true,
        ),
    ];
    if t.priority != 0 {
        fields.push(Field::new("Prioridade", priority_badge(t.priority), true));
    }
    if let Some(due) = t.due_date {
        fields.push(Field::new("Prazo", format!("<t:{}:f>", due.timestamp()), true));
    }
    if t.percent_done > 0.0 {
        let pct = (t.percent_done * 100.0).round().clamp(0.0, 100.0);
        fields.push(Field::new("Progresso", format!("{pct:.0}%"), true));
    }
    if !t.assignees.is_empty() {
        let who: Vec<String> = t.assignees.iter().map(|a| a.mention()).collect();
        fields.push(Field::new("Responsáveis", who.join(", "), false));
    }
    if !t.labels.is_empty() {
        fields.push(Field::new("Etiquetas", t.labels.join(", "), false));
    }
    fields
}
