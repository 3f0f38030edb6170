use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use vikord_core::types::{Project, Task, User};
use vikord_core::TaskApi;
use vikord_events::{EventData, EventFamily, EventKind, WebhookEvent};
use vikord_users::IdentityResolver;

use crate::payload::{
    AttachmentContext, CommentContext, Field, NotificationContext, NotificationKind,
    NotificationPayload, ProjectContext, ProjectInfo, RelationContext, TaskContext, TeamContext,
    UserReference,
};
use crate::priority::priority_badge;
use crate::text::{strip_html, truncate_chars, COMMENT_MAX_CHARS};

/// Label used when the project of a task cannot be fetched.
pub const FALLBACK_PROJECT_TITLE: &str = "Projeto";

/// Platform limit on embed fields; digests never list more tasks than this.
pub const MAX_DIGEST_TASKS: usize = 25;

/// Turns classified events (and scheduler firings) into notification payloads.
pub struct PayloadBuilder {
    api: Arc<dyn TaskApi>,
    resolver: Arc<IdentityResolver>,
    frontend_base: String,
}

impl PayloadBuilder {
    pub fn new(
        api: Arc<dyn TaskApi>,
        resolver: Arc<IdentityResolver>,
        frontend_base: impl Into<String>,
    ) -> Self {
        Self {
            api,
            resolver,
            frontend_base: frontend_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn task_url(&self, task_id: i64) -> String {
        format!("{}/tasks/{task_id}", self.frontend_base)
    }

    pub fn project_url(&self, project_id: i64) -> String {
        format!("{}/projects/{project_id}", self.frontend_base)
    }

    /// Build the payload for a webhook event. `None` means the event has
    /// nothing to show and delivery is skipped.
    pub async fn build(&self, event: &WebhookEvent) -> Option<NotificationPayload> {
        let data = event.data();
        let resolved = self.resolver.resolve_many(&collect_user_ids(data));
        let kind = event.kind();
        let author = Some(UserReference::from_user(data.doer(), &resolved));

        let mut payload = match kind.family() {
            EventFamily::Task => self.build_task(kind, data, &resolved).await?,
            EventFamily::Project => self.build_project(kind, data, &resolved)?,
            EventFamily::Team => build_team(kind, data, &resolved)?,
        };
        payload.author = author;
        payload.timestamp = event.timestamp();

        debug!(kind = %kind, title = %payload.title, "payload built");
        Some(payload)
    }

    async fn build_task(
        &self,
        kind: EventKind,
        data: &EventData,
        resolved: &HashMap<i64, String>,
    ) -> Option<NotificationPayload> {
        let Some(task) = data.task() else {
            warn!(kind = %kind, "task event without task data, skipping");
            return None;
        };
        let project = match data.embedded_project() {
            Some(p) => self.info_from(p),
            None => self.project_info(task.project_id).await,
        };
        let reference = task.reference();

        let (context, description) = match data {
            EventData::Task(_) => (NotificationContext::Task(self.task_context(task, resolved)), None),
            EventData::TaskAssignee(e) => {
                let who = UserReference::from_user(&e.assignee, resolved).mention();
                let description = match kind {
                    EventKind::TaskAssigneeDeleted => format!("{who} não é mais responsável"),
                    _ => format!("Atribuída a {who}"),
                };
                (
                    NotificationContext::Task(self.task_context(task, resolved)),
                    Some(description),
                )
            }
            EventData::TaskComment(e) => {
                let text = truncate_chars(&strip_html(&e.comment.comment), COMMENT_MAX_CHARS);
                (
                    NotificationContext::Comment(CommentContext {
                        task_reference: reference,
                        text,
                    }),
                    None,
                )
            }
            EventData::TaskAttachment(e) => (
                NotificationContext::Attachment(AttachmentContext {
                    task_reference: reference,
                    file_name: e.attachment.file.name.clone(),
                }),
                None,
            ),
            EventData::TaskRelation(e) => {
                let other = if e.relation.other_task_id == task.id {
                    e.relation.task_id
                } else {
                    e.relation.other_task_id
                };
                (
                    NotificationContext::Relation(RelationContext {
                        task_reference: reference,
                        relation_kind: e.relation.relation_kind.clone(),
                        related_task_id: other,
                        related_task_url: Some(self.task_url(other)),
                    }),
                    None,
                )
            }
            _ => {
                warn!(kind = %kind, "task kind with non-task payload, skipping");
                return None;
            }
        };

        Some(NotificationPayload {
            kind: kind.into(),
            title: task.title.clone(),
            description,
            url: Some(self.task_url(task.id)),
            project: Some(project),
            author: None,
            context: Some(context),
            fields: Vec::new(),
            color: None,
            timestamp: Utc::now(),
        })
    }

    fn build_project(
        &self,
        kind: EventKind,
        data: &EventData,
        resolved: &HashMap<i64, String>,
    ) -> Option<NotificationPayload> {
        let (project, description) = match data {
            EventData::Project(e) => (&e.project, None),
            EventData::ProjectSharedUser(e) => {
                let who = UserReference::from_user(&e.user, resolved).mention();
                (&e.project, Some(format!("Projeto compartilhado com {who}")))
            }
            EventData::ProjectSharedTeam(e) => (
                &e.project,
                Some(format!("Projeto compartilhado com a equipe {}", e.team.name)),
            ),
            _ => {
                warn!(kind = %kind, "project kind with non-project payload, skipping");
                return None;
            }
        };

        let owner = project
            .owner
            .as_ref()
            .map(|o| UserReference::from_user(o, resolved));

        Some(NotificationPayload {
            kind: kind.into(),
            title: project.title.clone(),
            description,
            url: Some(self.project_url(project.id)),
            project: Some(self.info_from(project)),
            author: None,
            context: Some(NotificationContext::Project(ProjectContext { owner })),
            fields: Vec::new(),
            color: None,
            timestamp: Utc::now(),
        })
    }

    /// Project title and link for a task, fetched live. Lookup failures
    /// degrade to a generic label.
    pub async fn project_info(&self, project_id: i64) -> ProjectInfo {
        match self.api.get_project(project_id).await {
            Ok(Some(project)) => self.info_from(&project),
            Ok(None) => {
                debug!(project_id, "project not found upstream, using fallback label");
                self.fallback_info(project_id)
            }
            Err(e) => {
                warn!(project_id, error = %e, "project lookup failed, using fallback label");
                self.fallback_info(project_id)
            }
        }
    }

    pub fn info_from(&self, project: &Project) -> ProjectInfo {
        ProjectInfo {
            id: project.id,
            title: project.title.clone(),
            identifier: project.identifier.clone(),
            url: Some(self.project_url(project.id)),
        }
    }

    fn fallback_info(&self, project_id: i64) -> ProjectInfo {
        ProjectInfo {
            id: project_id,
            title: FALLBACK_PROJECT_TITLE.to_string(),
            identifier: String::new(),
            url: Some(self.project_url(project_id)),
        }
    }

    pub fn task_context(&self, task: &Task, resolved: &HashMap<i64, String>) -> TaskContext {
        TaskContext {
            reference: task.reference(),
            done: task.done,
            priority: task.priority,
            due_date: task.due_date,
            start_date: task.start_date,
            end_date: task.end_date,
            percent_done: task.percent_done,
            assignees: task
                .assignees
                .iter()
                .map(|u| UserReference::from_user(u, resolved))
                .collect(),
            labels: task.labels.iter().map(|l| l.title.clone()).collect(),
        }
    }

    /// Reminder for one task, attributed to the system actor.
    pub fn build_reminder(
        &self,
        task: &Task,
        project: ProjectInfo,
        message: Option<&str>,
    ) -> NotificationPayload {
        let ids: HashSet<i64> = task.assignees.iter().map(|u| u.id).collect();
        let resolved = self.resolver.resolve_many(&ids);

        NotificationPayload {
            kind: NotificationKind::Reminder,
            title: task.title.clone(),
            description: message
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            url: Some(self.task_url(task.id)),
            project: Some(project),
            author: Some(UserReference::system()),
            context: Some(NotificationContext::Task(self.task_context(task, &resolved))),
            fields: Vec::new(),
            color: None,
            timestamp: Utc::now(),
        }
    }

    /// Digest of already filtered and sorted tasks. At most
    /// [`MAX_DIGEST_TASKS`] become fields; the rest are counted in the
    /// description.
    pub fn build_digest(&self, project: &Project, tasks: &[Task]) -> NotificationPayload {
        let shown = &tasks[..tasks.len().min(MAX_DIGEST_TASKS)];
        let ids: HashSet<i64> = shown
            .iter()
            .flat_map(|t| t.assignees.iter().map(|u| u.id))
            .collect();
        let resolved = self.resolver.resolve_many(&ids);

        let fields = shown
            .iter()
            .map(|task| digest_field(task, &resolved, &self.task_url(task.id)))
            .collect();

        let mut description = format!("{} tarefa(s) pendente(s)", tasks.len());
        if tasks.len() > shown.len() {
            description.push_str(&format!(", mostrando as {} mais importantes", shown.len()));
        }

        NotificationPayload {
            kind: NotificationKind::Digest,
            title: format!("Resumo: {}", project.title),
            description: Some(description),
            url: Some(self.project_url(project.id)),
            project: Some(self.info_from(project)),
            author: Some(UserReference::system()),
            context: None,
            fields,
            color: None,
            timestamp: Utc::now(),
        }
    }
}

fn build_team(
    kind: EventKind,
    data: &EventData,
    resolved: &HashMap<i64, String>,
) -> Option<NotificationPayload> {
    let (team, member) = match data {
        EventData::Team(e) => (&e.team, None),
        EventData::TeamMember(e) => (&e.team, Some(UserReference::from_user(&e.member, resolved))),
        _ => {
            warn!(kind = %kind, "team kind with non-team payload, skipping");
            return None;
        }
    };

    Some(NotificationPayload {
        kind: kind.into(),
        title: team.name.clone(),
        description: None,
        url: None,
        project: None,
        author: None,
        context: Some(NotificationContext::Team(TeamContext {
            description: team.description.clone(),
            member,
        })),
        fields: Vec::new(),
        color: None,
        timestamp: Utc::now(),
    })
}

fn digest_field(task: &Task, resolved: &HashMap<i64, String>, url: &str) -> Field {
    let mut lines = vec![priority_badge(task.priority)];
    if let Some(due) = task.due_date {
        lines.push(format!("📅 <t:{}:d>", due.timestamp()));
    }
    if !task.assignees.is_empty() {
        let who: Vec<String> = task
            .assignees
            .iter()
            .map(|u| UserReference::from_user(u, resolved).mention())
            .collect();
        lines.push(format!("👥 {}", who.join(", ")));
    }
    lines.push(format!("[abrir]({url})"));

    Field::new(
        format!("{} {}", task.reference(), task.title),
        lines.join("\n"),
        false,
    )
}

/// Every Vikunja user id referenced anywhere in the event.
pub fn collect_user_ids(data: &EventData) -> HashSet<i64> {
    let mut ids = HashSet::new();
    ids.insert(data.doer().id);

    match data {
        EventData::Task(e) => insert_task(&e.task, &mut ids),
        EventData::TaskAssignee(e) => {
            insert_task(&e.task, &mut ids);
            ids.insert(e.assignee.id);
        }
        EventData::TaskComment(e) => {
            insert_task(&e.task, &mut ids);
            if let Some(author) = &e.comment.author {
                ids.insert(author.id);
            }
        }
        EventData::TaskAttachment(e) => insert_task(&e.task, &mut ids),
        EventData::TaskRelation(e) => insert_task(&e.task, &mut ids),
        EventData::Project(e) => insert_owner(e.project.owner.as_ref(), &mut ids),
        EventData::ProjectSharedUser(e) => {
            insert_owner(e.project.owner.as_ref(), &mut ids);
            ids.insert(e.user.id);
        }
        EventData::ProjectSharedTeam(e) => insert_owner(e.project.owner.as_ref(), &mut ids),
        EventData::Team(_) => {}
        EventData::TeamMember(e) => {
            ids.insert(e.member.id);
        }
    }
    ids.remove(&0);
    ids
}

fn insert_task(task: &Task, ids: &mut HashSet<i64>) {
    ids.extend(task.assignees.iter().map(|u| u.id));
    if let Some(creator) = &task.created_by {
        ids.insert(creator.id);
    }
}

fn insert_owner(owner: Option<&User>, ids: &mut HashSet<i64>) {
    if let Some(owner) = owner {
        ids.insert(owner.id);
    }
}
