//! Rendered notifications to serenity builders.

use serenity::builder::{
    CreateAllowedMentions, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage,
};
use serenity::model::Timestamp;
use vikord_notify::{RenderedEmbed, RenderedMessage};

/// Discord's description limit.
const MAX_DESCRIPTION: usize = 4096;

pub fn to_create_embed(embed: &RenderedEmbed) -> CreateEmbed {
    let mut e = CreateEmbed::new().title(&embed.title).colour(embed.color);
    if let Some(url) = &embed.url {
        e = e.url(url);
    }
    if let Some(description) = description_with_author(embed) {
        e = e.description(description);
    }
    for field in &embed.fields {
        e = e.field(&field.name, &field.value, field.inline);
    }
    if let Some(author) = &embed.author {
        let mut a = CreateEmbedAuthor::new(&author.name);
        if let Some(icon) = &author.icon_url {
            a = a.icon_url(icon);
        }
        e = e.author(a);
    }
    if let Some(footer) = &embed.footer {
        e = e.footer(CreateEmbedFooter::new(footer));
    }
    if let Ok(ts) = Timestamp::from_unix_timestamp(embed.timestamp.timestamp()) {
        e = e.timestamp(ts);
    }
    e
}

/// Embed author names cannot mention, so a linked author's mention is
/// appended to the description instead.
fn description_with_author(embed: &RenderedEmbed) -> Option<String> {
    let mention = embed.author.as_ref().and_then(|a| a.mention.as_deref());
    let text = match (embed.description.as_deref(), mention) {
        (Some(d), Some(m)) => format!("{d}\n\n👤 {m}"),
        (None, Some(m)) => format!("👤 {m}"),
        (Some(d), None) => d.to_string(),
        (None, None) => return None,
    };
    if text.chars().count() > MAX_DESCRIPTION {
        return embed.description.clone();
    }
    Some(text)
}

pub fn to_create_message(message: &RenderedMessage) -> CreateMessage {
    let mut m = CreateMessage::new().embed(to_create_embed(&message.embed));
    if let Some(content) = &message.content {
        m = m.content(content);
    }
    m.allowed_mentions(allowed_mentions(message.content.as_deref()))
}

/// Users are always pingable; `@everyone` only when the content asks for it.
fn allowed_mentions(content: Option<&str>) -> CreateAllowedMentions {
    let everyone = content.is_some_and(|c| c.contains("@everyone"));
    CreateAllowedMentions::new().all_users(true).everyone(everyone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vikord_notify::format::AuthorBlock;

    fn embed(description: Option<&str>, mention: Option<&str>) -> RenderedEmbed {
        RenderedEmbed {
            title: "🆕 Tarefa criada: Fix bug".into(),
            color: 0x2ecc71,
            description: description.map(String::from),
            fields: Vec::new(),
            url: None,
            author: Some(AuthorBlock {
                name: "Bea".into(),
                mention: mention.map(String::from),
                icon_url: None,
            }),
            footer: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn linked_author_is_mentioned_in_description() {
        let d = description_with_author(&embed(Some("corpo"), Some("<@500>"))).unwrap();
        assert_eq!(d, "corpo\n\n👤 <@500>");
        assert_eq!(description_with_author(&embed(None, Some("<@500>"))).unwrap(), "👤 <@500>");
    }

    #[test]
    fn plain_author_leaves_description_alone() {
        assert_eq!(description_with_author(&embed(Some("corpo"), None)).as_deref(), Some("corpo"));
        assert_eq!(description_with_author(&embed(None, None)), None);
    }

    #[test]
    fn full_description_drops_the_mention() {
        let long = "x".repeat(MAX_DESCRIPTION);
        let d = description_with_author(&embed(Some(&long), Some("<@500>"))).unwrap();
        assert_eq!(d, long);
    }
}
