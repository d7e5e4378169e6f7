//! NodeList task service client
//!
//! Blocking HTTP calls through a shared `ureq::Agent`, each moved onto the
//! blocking pool so async callers never stall:
//! - task listing, creation, edits, priority and completion
//! - group listing, creation and the group-name index

use crate::api::service::{RemoteResult, TaskApi};
use crate::error::RemoteError;
use crate::types::{GroupNames, NewTask, Priority, Task, TaskGroup, TaskId, TaskUpdate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// HTTP implementation of [`TaskApi`].
#[derive(Clone)]
pub struct HttpTaskApi {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(config: ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&format!(
                "{}/{}",
                crate::metadata::PKG_NAME,
                crate::metadata::PKG_VERSION
            ))
            .build();
        Self {
            agent,
            base_url: normalize_base_url(&config.base_url),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Run one request on the blocking pool and decode a 2xx JSON body.
    async fn call<T, F>(&self, operation: &'static str, url: String, send: F) -> RemoteResult<T>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(&ureq::Agent, &str) -> Result<ureq::Response, ureq::Error> + Send + 'static,
    {
        let agent = self.agent.clone();
        debug!(operation, %url, "sending request");

        let result = tokio::task::spawn_blocking(move || -> RemoteResult<T> {
            let response = send(&agent, &url).map_err(|e| from_ureq(operation, e))?;
            response.into_json::<T>().map_err(|e| RemoteError::Body {
                operation,
                message: e.to_string(),
            })
        })
        .await
        .map_err(|e| RemoteError::Transport {
            operation,
            message: format!("request task failed: {e}"),
        })
        .and_then(|inner| inner);

        if let Err(err) = &result {
            warn!(operation, error = %err, "task service call failed");
        }
        result
    }
}

fn from_ureq(operation: &'static str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => RemoteError::Status {
            operation,
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => RemoteError::Transport {
            operation,
            message: transport.to_string(),
        },
    }
}

impl TaskApi for HttpTaskApi {
    /// List every task, each with its group reference
    async fn list_tasks(&self) -> RemoteResult<Vec<Task>> {
        self.call("list tasks", self.url("/tasks"), |agent, url| {
            agent.get(url).call()
        })
        .await
    }

    /// List groups with their member tasks
    async fn list_groups(&self) -> RemoteResult<Vec<TaskGroup>> {
        self.call("list groups", self.url("/groups"), |agent, url| {
            agent.get(url).call()
        })
        .await
    }

    async fn group_names(&self) -> RemoteResult<GroupNames> {
        self.call("group names", self.url("/groups/names"), |agent, url| {
            agent.get(url).call()
        })
        .await
    }

    async fn create_task(&self, task: &NewTask) -> RemoteResult<Task> {
        let body = task.clone();
        self.call("create task", self.url("/tasks/create"), move |agent, url| {
            agent.post(url).send_json(body)
        })
        .await
    }

    /// Full edit; the service may move the task to another group
    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> RemoteResult<Task> {
        let body = update.clone();
        self.call(
            "update task",
            self.url(&format!("/tasks/update/{id}")),
            move |agent, url| agent.patch(url).send_json(body),
        )
        .await
    }

    async fn change_priority(&self, id: TaskId, priority: Priority) -> RemoteResult<Task> {
        self.call(
            "change priority",
            self.url(&format!("/tasks/priority/{id}")),
            move |agent, url| agent.patch(url).query("priority", priority.code()).call(),
        )
        .await
    }

    async fn complete_task(&self, id: TaskId) -> RemoteResult<Task> {
        self.call(
            "complete task",
            self.url(&format!("/tasks/complete/{id}")),
            |agent, url| agent.patch(url).call(),
        )
        .await
    }

    async fn create_group(&self, name: &str) -> RemoteResult<TaskGroup> {
        let body = json!({ "taskGroupName": name });
        self.call("create group", self.url("/groups/create"), move |agent, url| {
            agent.post(url).send_json(body)
        })
        .await
    }
}

/// Accepts `host:port` as well as full URLs, like the deployment env var does.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    with_scheme.trim_end_matches('/').to_string()
}
