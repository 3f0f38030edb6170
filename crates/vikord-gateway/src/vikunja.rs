//! Vikunja REST client.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use vikord_core::config::VikunjaConfig;
use vikord_core::error::{Result, VikordError};
use vikord_core::types::{Project, Task};
use vikord_core::{TaskApi, TaskPatch};

/// Tasks fetched per page; a shorter page is the last one.
const PAGE_SIZE: usize = 50;

/// Upper bound on pages walked for one project.
const MAX_PAGES: usize = 100;

pub struct VikunjaClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl VikunjaClient {
    pub fn new(config: &VikunjaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
    }

    async fn send(&self, path: &str, req: RequestBuilder) -> Result<Response> {
        req.send().await.map_err(|e| {
            warn!(path, error = %e, "Vikunja request failed");
            VikordError::Upstream(e.to_string())
        })
    }

    /// `Ok(None)` on 404/403: the entity is gone or no longer visible.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self.send(path, self.request(Method::GET, path)).await?;
        if matches!(resp.status(), StatusCode::NOT_FOUND | StatusCode::FORBIDDEN) {
            debug!(path, status = resp.status().as_u16(), "Vikunja entity not found");
            return Ok(None);
        }
        decode(path, resp).await.map(Some)
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(path, status = status.as_u16(), body = %body, "Vikunja API error");
        return Err(VikordError::UpstreamStatus {
            status: status.as_u16(),
            path: path.to_string(),
        });
    }
    resp.json::<T>()
        .await
        .map_err(|e| VikordError::Upstream(format!("{path}: {e}")))
}

/// Vikunja's task update replaces the whole task, so the patch is applied on
/// top of the current JSON.
fn apply_patch(mut current: Value, patch: &TaskPatch) -> Result<Value> {
    let Value::Object(ref mut map) = current else {
        return Err(VikordError::Upstream("task body is not an object".into()));
    };
    if let Value::Object(changes) = serde_json::to_value(patch)? {
        map.extend(changes);
    }
    Ok(current)
}

#[async_trait]
impl TaskApi for VikunjaClient {
    async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.get_optional(&format!("/projects/{id}")).await
    }

    async fn get_project_tasks(&self, project_id: i64) -> Result<Vec<Task>> {
        let path = format!("/projects/{project_id}/tasks");
        let mut tasks = Vec::new();
        for page in 1..=MAX_PAGES {
            let req = self
                .request(Method::GET, &path)
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);
            let resp = self.send(&path, req).await?;
            let batch: Vec<Task> = decode(&path, resp).await?;
            let short = batch.len() < PAGE_SIZE;
            tasks.extend(batch);
            if short {
                break;
            }
        }
        debug!(project_id, count = tasks.len(), "project tasks fetched");
        Ok(tasks)
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>> {
        self.get_optional(&format!("/tasks/{id}")).await
    }

    async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<Task> {
        let path = format!("/tasks/{id}");
        let current: Value = self
            .get_optional(&path)
            .await?
            .ok_or_else(|| VikordError::InvalidInput(format!("task {id} not found")))?;
        let body = apply_patch(current, patch)?;
        let resp = self
            .send(&path, self.request(Method::POST, &path).json(&body))
            .await?;
        decode(&path, resp).await
    }

    async fn assign_task(&self, id: i64, user_id: i64) -> Result<()> {
        let path = format!("/tasks/{id}/assignees");
        let resp = self
            .send(
                &path,
                self.request(Method::PUT, &path).json(&json!({ "user_id": user_id })),
            )
            .await?;
        // Vikunja answers 409 when the user is already assigned.
        if resp.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        decode::<Value>(&path, resp).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_keeps_untouched_fields() {
        let current = json!({"id": 42, "title": "Fix bug", "done": false, "priority": 3});
        let patch = TaskPatch {
            done: Some(true),
            ..TaskPatch::default()
        };
        let merged = apply_patch(current, &patch).unwrap();
        assert_eq!(merged["done"], true);
        assert_eq!(merged["title"], "Fix bug");
        assert_eq!(merged["priority"], 3);
    }

    #[test]
    fn patch_on_non_object_is_an_error() {
        assert!(apply_patch(json!([1, 2]), &TaskPatch::default()).is_err());
    }

    #[test]
    fn api_url_is_normalised() {
        let client = VikunjaClient::new(&VikunjaConfig {
            api_url: "https://tasks.example.com/api/v1/".into(),
            frontend_url: None,
            token: "t".into(),
        });
        assert_eq!(client.api_url, "https://tasks.example.com/api/v1");
    }
}
