//! Fan-out of webhook notifications to Discord.

use tracing::{debug, info, warn};
use vikord_events::{EventData, EventKind, WebhookEvent};
use vikord_notify::{format, DeliveryTarget};
use vikord_reminders::BindingStore;
use vikord_users::IdentityStore;

use crate::app::AppState;

/// Channels bound to the event's project, then DM subscribers, then (for a
/// new assignment) the linked assignee. Duplicates are dropped.
pub fn targets_for(
    bindings: &BindingStore,
    identities: &IdentityStore,
    event: &WebhookEvent,
) -> anyhow::Result<Vec<DeliveryTarget>> {
    let mut targets = Vec::new();
    let mut push = |t: DeliveryTarget| {
        if !targets.contains(&t) {
            targets.push(t);
        }
    };

    if let Some(project_id) = event.data().project_id() {
        for binding in bindings.channels_for_project(project_id)? {
            push(DeliveryTarget::Channel(binding.channel_id));
        }
        for user in bindings.dm_subscribers(project_id)? {
            push(DeliveryTarget::DirectMessage(user));
        }
    }

    if let EventData::TaskAssignee(e) = event.data() {
        if event.kind() == EventKind::TaskAssigneeCreated {
            let mut linked = identities.find_discord_user_ids(&[e.assignee.id])?;
            if let Some(discord_id) = linked.remove(&e.assignee.id) {
                push(DeliveryTarget::DirectMessage(discord_id));
            }
        }
    }

    Ok(targets)
}

/// Build, render and deliver one event. Returns how many sends succeeded.
pub async fn dispatch(state: &AppState, event: &WebhookEvent) -> usize {
    let kind = event.kind();
    let targets = match targets_for(&state.bindings, &state.identities, event) {
        Ok(t) => t,
        Err(e) => {
            warn!(event_kind = %kind, error = %e, "could not resolve notification targets");
            return 0;
        }
    };
    if targets.is_empty() {
        debug!(event_kind = %kind, "nobody subscribed, event dropped");
        return 0;
    }

    let Some(payload) = state.builder.build(event).await else {
        return 0;
    };
    let message = format(&payload);

    let mut delivered = 0;
    for target in &targets {
        match state.delivery.send(target, &message).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(event_kind = %kind, target = %target, error = %e, "delivery failed, dropped"),
        }
    }
    info!(event_kind = %kind, delivered, targets = targets.len(), "webhook notification delivered");
    delivered
}
