//! Slash commands.
//!
//! Registration happens in `ready()`. Each interaction is flattened into an
//! [`Invocation`] and answered by [`run`] with the text of an ephemeral
//! reply; nothing is persisted unless every input validated.

use chrono::{DateTime, Utc};
use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse,
};
use serenity::model::application::{
    CommandDataOptionValue, CommandInteraction, CommandOptionType,
};
use serenity::model::id::GuildId;
use serenity::prelude::Context;
use tracing::{info, warn};
use vikord_core::TaskPatch;
use vikord_notify::priority::priority_badge;
use vikord_notify::text::truncate_chars;
use vikord_reminders::cadence::parse_starts_at;
use vikord_reminders::{parse_cadence, MentionMode, NewDigest, NewReminder, TargetType};

use crate::context::BotContext;
use crate::error::CommandError;

/// Replies stay under Discord's 2000-char message limit.
const REPLY_MAX_CHARS: usize = 1900;

type Reply = Result<String, CommandError>;

/// A typed option value from an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Int(i64),
    Text(String),
    User(String),
}

/// Serenity-free view of a slash command interaction.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub name: String,
    pub user_id: String,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub options: Vec<(String, OptionValue)>,
}

impl Invocation {
    fn value(&self, name: &str) -> Option<&OptionValue> {
        self.options.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn int(&self, name: &str) -> Option<i64> {
        match self.value(name) {
            Some(OptionValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        match self.value(name) {
            Some(OptionValue::Text(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    fn user(&self, name: &str) -> Option<&str> {
        match self.value(name) {
            Some(OptionValue::User(id)) => Some(id),
            _ => None,
        }
    }

    fn require_int(&self, name: &str) -> Result<i64, CommandError> {
        self.int(name)
            .ok_or_else(|| CommandError::usage(format!("Informe `{name}`.")))
    }

    fn require_text(&self, name: &str) -> Result<&str, CommandError> {
        self.text(name)
            .ok_or_else(|| CommandError::usage(format!("Informe `{name}`.")))
    }

    fn require_guild(&self) -> Result<&str, CommandError> {
        self.guild_id
            .as_deref()
            .ok_or_else(|| CommandError::usage("Use este comando dentro de um servidor."))
    }
}

fn int_option(name: &str, description: &str, required: bool) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::Integer, name, description).required(required)
}

fn text_option(name: &str, description: &str, required: bool) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, name, description).required(required)
}

fn target_option() -> CreateCommandOption {
    text_option("target", "Onde entregar (padrão: dm)", false)
        .add_string_choice("Mensagem direta", "dm")
        .add_string_choice("Este canal", "channel")
}

/// Every slash command the bot answers.
pub fn command_definitions() -> Vec<CreateCommand> {
    const CADENCE: &str = "daily HH:MM | weekly <dia> HH:MM | every N days HH:MM | once AAAA-MM-DD HH:MM | cron";

    vec![
        CreateCommand::new("link")
            .description("Vincular sua conta do Discord a um usuário Vikunja")
            .add_option(int_option("vikunja_id", "ID do usuário no Vikunja", true))
            .add_option(text_option("username", "Nome de usuário no Vikunja", true)),
        CreateCommand::new("unlink").description("Remover o vínculo com o Vikunja"),
        CreateCommand::new("bind")
            .description("Enviar as notificações de um projeto para este canal")
            .add_option(int_option("project_id", "ID do projeto", true)),
        CreateCommand::new("unbind")
            .description("Parar de enviar um projeto para este canal")
            .add_option(int_option("project_id", "ID do projeto", true)),
        CreateCommand::new("subscribe")
            .description("Receber as notificações de um projeto por DM")
            .add_option(int_option("project_id", "ID do projeto", true)),
        CreateCommand::new("unsubscribe")
            .description("Cancelar as notificações de um projeto por DM")
            .add_option(int_option("project_id", "ID do projeto", true)),
        CreateCommand::new("remind")
            .description("Criar um lembrete para uma tarefa")
            .add_option(int_option("task_id", "ID da tarefa", true))
            .add_option(text_option("cadence", CADENCE, true))
            .add_option(text_option("starts_at", "Início (AAAA-MM-DD HH:MM)", false))
            .add_option(text_option("message", "Texto extra do lembrete", false))
            .add_option(
                text_option("mention", "Quem mencionar (padrão: responsáveis)", false)
                    .add_string_choice("Responsáveis", "assignees")
                    .add_string_choice("Todos", "everyone"),
            )
            .add_option(target_option()),
        CreateCommand::new("reminders").description("Listar seus lembretes"),
        CreateCommand::new("unremind")
            .description("Apagar um lembrete")
            .add_option(int_option("id", "ID do lembrete", true)),
        CreateCommand::new("digest")
            .description("Criar um resumo periódico de um projeto")
            .add_option(int_option("project_id", "ID do projeto", true))
            .add_option(text_option("cadence", CADENCE, true))
            .add_option(
                int_option("min_priority", "Prioridade mínima (0 a 5)", false)
                    .min_int_value(0)
                    .max_int_value(5),
            )
            .add_option(target_option()),
        CreateCommand::new("digests").description("Listar seus resumos"),
        CreateCommand::new("undigest")
            .description("Apagar um resumo")
            .add_option(int_option("id", "ID do resumo", true)),
        CreateCommand::new("done")
            .description("Marcar uma tarefa como concluída")
            .add_option(int_option("task_id", "ID da tarefa", true)),
        CreateCommand::new("assign")
            .description("Atribuir uma tarefa a alguém")
            .add_option(int_option("task_id", "ID da tarefa", true))
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "Quem recebe a tarefa")
                    .required(true),
            ),
    ]
}

/// Register the commands, per guild when `guild_id` is set (instant) or
/// globally otherwise. Call from `ready()`.
pub async fn register_commands(ctx: &Context, guild_id: Option<GuildId>) {
    let commands = command_definitions();
    match guild_id {
        Some(gid) => match gid.set_commands(&ctx.http, commands).await {
            Ok(cmds) => info!(guild = %gid, count = cmds.len(), "registered guild slash commands"),
            Err(e) => warn!(guild = %gid, error = %e, "failed to register guild commands"),
        },
        None => {
            match serenity::model::application::Command::set_global_commands(&ctx.http, commands)
                .await
            {
                Ok(cmds) => info!(count = cmds.len(), "registered global slash commands"),
                Err(e) => warn!(error = %e, "failed to register global slash commands"),
            }
        }
    }
}

/// Flatten a serenity interaction. Option kinds the bot never declares are
/// ignored.
pub fn invocation(command: &CommandInteraction) -> Invocation {
    let options = command
        .data
        .options
        .iter()
        .filter_map(|o| {
            let value = match &o.value {
                CommandDataOptionValue::Integer(i) => OptionValue::Int(*i),
                CommandDataOptionValue::String(s) => OptionValue::Text(s.clone()),
                CommandDataOptionValue::User(u) => OptionValue::User(u.to_string()),
                _ => return None,
            };
            Some((o.name.clone(), value))
        })
        .collect();

    Invocation {
        name: command.data.name.clone(),
        user_id: command.user.id.to_string(),
        guild_id: command.guild_id.map(|g| g.to_string()),
        channel_id: command.channel_id.to_string(),
        options,
    }
}

/// Answer an interaction: defer (ephemeral), run, then edit in the reply.
pub async fn handle_interaction(app: &BotContext, ctx: &Context, command: &CommandInteraction) {
    let deferred = command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true)),
        )
        .await;
    if let Err(e) = deferred {
        warn!(command = %command.data.name, error = %e, "failed to defer slash command");
        return;
    }

    let reply = run(app, &invocation(command)).await;
    if let Err(e) = command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(reply))
        .await
    {
        warn!(command = %command.data.name, error = %e, "failed to send slash command reply");
    }
}

/// Execute a command and return the reply text.
pub async fn run(app: &BotContext, inv: &Invocation) -> String {
    let result = match inv.name.as_str() {
        "link" => link(app, inv),
        "unlink" => unlink(app, inv),
        "bind" => bind(app, inv).await,
        "unbind" => unbind(app, inv),
        "subscribe" => subscribe(app, inv).await,
        "unsubscribe" => unsubscribe(app, inv),
        "remind" => remind(app, inv).await,
        "reminders" => list_reminders(app, inv),
        "unremind" => unremind(app, inv),
        "digest" => digest(app, inv).await,
        "digests" => list_digests(app, inv),
        "undigest" => undigest(app, inv),
        "done" => done(app, inv).await,
        "assign" => assign(app, inv).await,
        _ => Ok("Comando desconhecido.".to_string()),
    };

    let reply = match result {
        Ok(text) => text,
        Err(e) => {
            if !matches!(e, CommandError::Usage(_)) {
                warn!(command = %inv.name, user_id = %inv.user_id, error = %e, "slash command failed");
            }
            e.user_message()
        }
    };
    truncate_chars(&reply, REPLY_MAX_CHARS)
}

fn relative(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "sem data".to_string(), |t| format!("<t:{}:R>", t.timestamp()))
}

fn link(app: &BotContext, inv: &Invocation) -> Reply {
    let vikunja_id = inv.require_int("vikunja_id")?;
    let username = inv.require_text("username")?;
    app.identities.upsert_mapping(vikunja_id, username, &inv.user_id)?;
    Ok(format!("✅ Conta vinculada ao usuário Vikunja **{username}** (#{vikunja_id})."))
}

fn unlink(app: &BotContext, inv: &Invocation) -> Reply {
    if app.identities.remove_mapping_by_discord_id(&inv.user_id)? {
        Ok("Vínculo removido.".to_string())
    } else {
        Ok("Sua conta não está vinculada ao Vikunja.".to_string())
    }
}

async fn bind(app: &BotContext, inv: &Invocation) -> Reply {
    let guild = inv.require_guild()?;
    let project_id = inv.require_int("project_id")?;
    let project = app
        .api
        .get_project(project_id)
        .await?
        .ok_or_else(|| CommandError::usage(format!("Projeto #{project_id} não encontrado.")))?;
    app.bindings
        .bind_channel(guild, &inv.channel_id, project.id, &project.title)?;
    Ok(format!("🔗 Este canal agora recebe as notificações de **{}**.", project.title))
}

fn unbind(app: &BotContext, inv: &Invocation) -> Reply {
    inv.require_guild()?;
    let project_id = inv.require_int("project_id")?;
    if app.bindings.unbind_channel(&inv.channel_id, project_id)? {
        Ok(format!("Canal desvinculado do projeto #{project_id}."))
    } else {
        Ok(format!("Este canal não está vinculado ao projeto #{project_id}."))
    }
}

async fn subscribe(app: &BotContext, inv: &Invocation) -> Reply {
    let project_id = inv.require_int("project_id")?;
    let project = app
        .api
        .get_project(project_id)
        .await?
        .ok_or_else(|| CommandError::usage(format!("Projeto #{project_id} não encontrado.")))?;
    app.bindings
        .subscribe_dm(&inv.user_id, project.id, &project.title)?;
    Ok(format!("📬 Você vai receber as notificações de **{}** por mensagem direta.", project.title))
}

fn unsubscribe(app: &BotContext, inv: &Invocation) -> Reply {
    let project_id = inv.require_int("project_id")?;
    if app.bindings.unsubscribe_dm(&inv.user_id, project_id)? {
        Ok(format!("Inscrição no projeto #{project_id} cancelada."))
    } else {
        Ok(format!("Você não estava inscrito no projeto #{project_id}."))
    }
}

/// `dm` (default) or `channel`; a channel target needs a guild.
fn parse_target(inv: &Invocation) -> Result<TargetType, CommandError> {
    match inv.text("target").unwrap_or("dm") {
        "dm" => Ok(TargetType::Dm),
        "channel" | "guild" => {
            inv.require_guild()?;
            Ok(TargetType::Guild)
        }
        other => Err(CommandError::usage(format!(
            "Destino inválido: `{other}`. Use `dm` ou `channel`."
        ))),
    }
}

async fn remind(app: &BotContext, inv: &Invocation) -> Reply {
    let task_id = inv.require_int("task_id")?;
    let target_type = parse_target(inv)?;
    let mention_mode = match inv.text("mention") {
        None => MentionMode::default(),
        Some(raw) => raw.parse::<MentionMode>().map_err(|_| {
            CommandError::usage(format!("Menção inválida: `{raw}`. Use `assignees` ou `everyone`."))
        })?,
    };

    let tz = app.timezone;
    let cadence = parse_cadence(inv.require_text("cadence")?, tz, Utc::now())?;
    if cadence.interval_days.is_some() {
        return Err(CommandError::usage(
            "Intervalos de N dias só valem para resumos. Use `/digest` ou uma cadência diária/semanal.",
        ));
    }
    let starts_at = match inv.text("starts_at") {
        Some(raw) => Some(parse_starts_at(raw, tz)?),
        None => cadence.starts_at,
    };

    let task = app
        .api
        .get_task(task_id)
        .await?
        .ok_or_else(|| CommandError::usage(format!("Tarefa #{task_id} não encontrada.")))?;

    let guild_id = match target_type {
        TargetType::Guild => Some(inv.require_guild()?.to_string()),
        TargetType::Dm => None,
    };
    if let Some(guild) = &guild_id {
        if app.bindings.channel_for_project(guild, task.project_id)?.is_none() {
            return Err(CommandError::usage(
                "Nenhum canal deste servidor está vinculado ao projeto da tarefa. Use `/bind` primeiro.",
            ));
        }
    }

    let record = app.engine.create_reminder(NewReminder {
        owner_discord_id: inv.user_id.clone(),
        task_id: task.id,
        project_id: task.project_id,
        target_type,
        guild_id,
        cron_expression: cadence.expression,
        starts_at,
        message: inv.text("message").map(String::from),
        mention_mode,
    })?;

    Ok(format!(
        "⏰ Lembrete #{} criado para **{}**. Próximo envio: {}.",
        record.id,
        task.title,
        relative(record.next_run_at)
    ))
}

fn list_reminders(app: &BotContext, inv: &Invocation) -> Reply {
    let reminders = app.engine.reminders_for(&inv.user_id)?;
    if reminders.is_empty() {
        return Ok("Você não tem lembretes.".to_string());
    }
    let mut text = format!("**Seus lembretes** ({}):\n", reminders.len());
    for r in &reminders {
        text.push_str(&format!(
            "- `#{}` tarefa #{} · `{}` · {} · {}{}\n",
            r.id,
            r.task_id,
            r.cron_expression,
            r.target_type.as_str(),
            relative(r.next_run_at),
            if r.enabled { "" } else { " (desativado)" }
        ));
    }
    Ok(text)
}

fn unremind(app: &BotContext, inv: &Invocation) -> Reply {
    let id = inv.require_int("id")?;
    app.engine.delete_reminder(id, &inv.user_id)?;
    Ok(format!("🗑️ Lembrete #{id} apagado."))
}

async fn digest(app: &BotContext, inv: &Invocation) -> Reply {
    let project_id = inv.require_int("project_id")?;
    let target_type = parse_target(inv)?;
    let min_priority = inv.int("min_priority").unwrap_or(0);
    if !(0..=5).contains(&min_priority) {
        return Err(CommandError::usage("A prioridade mínima vai de 0 a 5."));
    }

    let cadence = parse_cadence(inv.require_text("cadence")?, app.timezone, Utc::now())?;
    if cadence.starts_at.is_some() {
        return Err(CommandError::usage(
            "Resumos são recorrentes; use `daily`, `weekly` ou `every N days`.",
        ));
    }

    let project = app
        .api
        .get_project(project_id)
        .await?
        .ok_or_else(|| CommandError::usage(format!("Projeto #{project_id} não encontrado.")))?;

    let (guild_id, channel_id) = match target_type {
        TargetType::Guild => (
            Some(inv.require_guild()?.to_string()),
            Some(inv.channel_id.clone()),
        ),
        TargetType::Dm => (None, None),
    };

    let record = app.engine.create_digest(NewDigest {
        owner_discord_id: inv.user_id.clone(),
        project_id: project.id,
        target_type,
        guild_id,
        channel_id,
        cron_expression: cadence.expression,
        interval_days: cadence.interval_days,
        min_priority,
    })?;

    let every = match record.interval_days {
        Some(days) => format!(" a cada {days} dias"),
        None => String::new(),
    };
    Ok(format!(
        "📋 Resumo #{} de **{}** criado{every} (prioridade mínima: {}). Próximo envio: {}.",
        record.id,
        project.title,
        priority_badge(min_priority),
        relative(record.next_run_at)
    ))
}

fn list_digests(app: &BotContext, inv: &Invocation) -> Reply {
    let digests = app.engine.digests_for(&inv.user_id)?;
    if digests.is_empty() {
        return Ok("Você não tem resumos.".to_string());
    }
    let mut text = format!("**Seus resumos** ({}):\n", digests.len());
    for d in &digests {
        let every = d
            .interval_days
            .map(|n| format!(" · a cada {n} dias"))
            .unwrap_or_default();
        text.push_str(&format!(
            "- `#{}` projeto #{} · `{}`{every} · prioridade ≥ {} · {}{}\n",
            d.id,
            d.project_id,
            d.cron_expression,
            d.min_priority,
            relative(d.next_run_at),
            if d.enabled { "" } else { " (desativado)" }
        ));
    }
    Ok(text)
}

fn undigest(app: &BotContext, inv: &Invocation) -> Reply {
    let id = inv.require_int("id")?;
    app.engine.delete_digest(id, &inv.user_id)?;
    Ok(format!("🗑️ Resumo #{id} apagado."))
}

async fn done(app: &BotContext, inv: &Invocation) -> Reply {
    let task_id = inv.require_int("task_id")?;
    let patch = TaskPatch {
        done: Some(true),
        ..TaskPatch::default()
    };
    let task = app.api.update_task(task_id, &patch).await?;
    info!(task_id, user_id = %inv.user_id, "task marked done from Discord");
    Ok(format!("✅ Tarefa **{}** concluída.", task.title))
}

async fn assign(app: &BotContext, inv: &Invocation) -> Reply {
    let task_id = inv.require_int("task_id")?;
    let user = inv
        .user("user")
        .ok_or_else(|| CommandError::usage("Informe `user`."))?;
    let Some(vikunja_id) = app.identities.find_vikunja_user_id(user)? else {
        return Err(CommandError::usage(format!(
            "<@{user}> não tem conta Vikunja vinculada (use `/link`)."
        )));
    };
    app.api.assign_task(task_id, vikunja_id).await?;
    info!(task_id, vikunja_user_id = vikunja_id, "task assigned from Discord");
    Ok(format!("👤 <@{user}> agora é responsável pela tarefa #{task_id}."))
}
