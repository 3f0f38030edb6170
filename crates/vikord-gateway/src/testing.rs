//! Fakes shared by the gateway's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::json;
use vikord_core::config::VikordConfig;
use vikord_core::error::Result as CoreResult;
use vikord_core::types::{Project, Task};
use vikord_core::{TaskApi, TaskPatch};
use vikord_events::SignatureValidator;
use vikord_notify::{Delivery, DeliveryError, DeliveryTarget, PayloadBuilder, RenderedMessage};
use vikord_reminders::{BindingStore, ReminderEngine, ReminderStore};
use vikord_scheduler::RecurrenceScheduler;
use vikord_users::{IdentityResolver, IdentityStore};

use crate::app::AppState;

pub struct FakeApi;

#[async_trait]
impl TaskApi for FakeApi {
    async fn get_project(&self, id: i64) -> CoreResult<Option<Project>> {
        Ok(Some(serde_json::from_value(json!({"id": id, "title": "Ops"}))?))
    }

    async fn get_project_tasks(&self, _project_id: i64) -> CoreResult<Vec<Task>> {
        Ok(Vec::new())
    }

    async fn get_task(&self, _id: i64) -> CoreResult<Option<Task>> {
        Ok(None)
    }

    async fn update_task(&self, id: i64, _patch: &TaskPatch) -> CoreResult<Task> {
        Ok(serde_json::from_value(json!({"id": id, "title": "t", "project_id": 3}))?)
    }

    async fn assign_task(&self, _id: i64, _user_id: i64) -> CoreResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct Recorder {
    pub sent: Mutex<Vec<(DeliveryTarget, RenderedMessage)>>,
}

#[async_trait]
impl Delivery for Recorder {
    async fn send(
        &self,
        target: &DeliveryTarget,
        message: &RenderedMessage,
    ) -> Result<(), DeliveryError> {
        if let DeliveryTarget::Channel(id) = target {
            if id == "404" {
                return Err(DeliveryError::SendFailed("unknown channel".into()));
            }
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.clone(), message.clone()));
        Ok(())
    }
}

pub fn test_state(secret: Option<&str>) -> (Arc<AppState>, Arc<Recorder>) {
    let db = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
    let identities = Arc::new(IdentityStore::new(Arc::clone(&db)).unwrap());
    let bindings = Arc::new(BindingStore::new(Arc::clone(&db)).unwrap());
    let store = Arc::new(ReminderStore::new(Arc::clone(&db)).unwrap());
    let api: Arc<dyn TaskApi> = Arc::new(FakeApi);
    let recorder = Arc::new(Recorder::default());
    let delivery: Arc<dyn Delivery> = recorder.clone();

    let builder = Arc::new(PayloadBuilder::new(
        Arc::clone(&api),
        Arc::new(IdentityResolver::new(Arc::clone(&identities))),
        "https://vikunja.example",
    ));
    let engine = Arc::new(ReminderEngine::new(
        store,
        Arc::clone(&bindings),
        Arc::new(RecurrenceScheduler::new(chrono_tz::UTC)),
        Arc::clone(&builder),
        api,
        Arc::clone(&delivery),
    ));

    let state = Arc::new(AppState {
        config: VikordConfig::default(),
        validator: secret.map(SignatureValidator::new),
        builder,
        identities,
        bindings,
        delivery,
        engine,
    });
    (state, recorder)
}
