//! The task board: store, UI toggles, remote commands and the live session.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::api::TaskApi;
use crate::error::{ClientError, ClientResult, RemoteError};
use crate::live::{ListenerHandle, ListenerState, LiveConfig, LiveUpdateListener};
use crate::store::{GroupPartition, GroupingSource, Merge, TaskStore};
use crate::types::{Group, GroupId, GroupNames, NewTask, Priority, Task, TaskId, TaskUpdate};
use crate::view::ui_state::UiState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardOptions {
    pub enable_live_updates: bool,
    pub grouping_source: GroupingSource,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            enable_live_updates: true,
            grouping_source: GroupingSource::Embedded,
        }
    }
}

struct LiveSession {
    handle: ListenerHandle,
    updates: mpsc::UnboundedReceiver<Task>,
}

pub struct TaskBoard<A> {
    api: A,
    store: TaskStore,
    ui: UiState,
    options: BoardOptions,
    notice: Option<String>,
    live: Option<LiveSession>,
}

impl<A: TaskApi> TaskBoard<A> {
    pub fn new(api: A, options: BoardOptions) -> Self {
        Self {
            api,
            store: TaskStore::new(),
            ui: UiState::new(),
            options,
            notice: None,
            live: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn options(&self) -> BoardOptions {
        self.options
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn partition(&self) -> Vec<GroupPartition<'_>> {
        self.store.partition(self.options.grouping_source)
    }

    /// Log a failed call and keep it for the next render.
    fn report(&mut self, err: RemoteError) -> ClientError {
        error!(operation = err.operation(), error = %err, "task service call failed");
        self.notice = Some(err.to_string());
        err.into()
    }

    fn reject(&mut self, message: String) -> ClientError {
        self.notice = Some(message.clone());
        ClientError::InvalidInput(message)
    }

    pub async fn load(&mut self) -> ClientResult<()> {
        self.refresh().await
    }

    /// Fetch tasks and groups together; each successful half is applied
    /// even if the other fails.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        let (tasks, groups) = tokio::join!(self.api.list_tasks(), self.api.list_groups());
        let mut first_error = None;

        match tasks {
            Ok(tasks) => {
                debug!(count = tasks.len(), "tasks loaded");
                self.store.replace_tasks(tasks);
                self.ui.reconcile(self.store.tasks());
            }
            Err(err) => first_error = Some(self.report(err)),
        }
        match groups {
            Ok(groups) => {
                debug!(count = groups.len(), "groups loaded");
                self.store.replace_groups(groups);
            }
            Err(err) => {
                let err = self.report(err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Create a task, then reload both collections.
    pub async fn create_task(&mut self, new_task: NewTask) -> ClientResult<Task> {
        new_task.validate().map_err(|m| self.reject(m))?;
        let created = match self.api.create_task(&new_task).await {
            Ok(task) => task,
            Err(err) => return Err(self.report(err)),
        };
        info!(task_id = created.id, group_id = created.group.id, "task created");
        if self.refresh().await.is_err() {
            self.store.apply_task_update(created.clone());
        }
        Ok(created)
    }

    /// Full edit. Group membership may change, so both collections reload.
    pub async fn update_task(&mut self, id: TaskId, update: TaskUpdate) -> ClientResult<Task> {
        update.validate().map_err(|m| self.reject(m))?;
        let updated = match self.api.update_task(id, &update).await {
            Ok(task) => task,
            Err(err) => return Err(self.report(err)),
        };
        info!(task_id = id, "task updated");
        if self.refresh().await.is_err() {
            self.store.apply_task_update(updated.clone());
        }
        Ok(updated)
    }

    /// On success only the priority field is patched locally. The menu closes
    /// whatever the outcome.
    pub async fn change_priority(&mut self, id: TaskId, priority: Priority) -> ClientResult<()> {
        let result = self.api.change_priority(id, priority).await;
        self.ui.close_priority_menu();
        match result {
            Ok(_) => {
                if !self.store.apply_local_priority_change(id, priority) {
                    debug!(task_id = id, "priority changed for a task not on the board");
                }
                Ok(())
            }
            Err(err) => Err(self.report(err)),
        }
    }

    pub async fn complete_task(&mut self, id: TaskId) -> ClientResult<Task> {
        match self.api.complete_task(id).await {
            Ok(task) => {
                self.store.apply_task_update(task.clone());
                Ok(task)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    pub async fn create_group(&mut self, name: &str) -> ClientResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject("Group name cannot be empty".to_string()));
        }
        match self.api.create_group(name).await {
            Ok(group) => {
                let header = group.header();
                info!(group_id = header.id, "group created");
                self.store.insert_group(header.clone());
                Ok(header)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    pub async fn group_names(&mut self) -> ClientResult<GroupNames> {
        match self.api.group_names().await {
            Ok(names) => Ok(names),
            Err(err) => Err(self.report(err)),
        }
    }

    /// Merge one pushed task.
    pub fn apply_push(&mut self, task: Task) -> Merge {
        let id = task.id;
        let merge = self.store.apply_task_update(task);
        debug!(task_id = id, ?merge, "push update applied");
        merge
    }

    pub fn toggle_group(&mut self, id: GroupId) -> bool {
        self.ui.toggle_group(id)
    }

    pub fn toggle_task(&mut self, id: TaskId) -> bool {
        self.ui.toggle_task(id)
    }

    pub fn toggle_priority_menu(&mut self, id: TaskId) -> Option<TaskId> {
        self.ui.toggle_priority_menu(id)
    }

    pub fn dismiss_menus(&mut self) {
        self.ui.dismiss_menus();
    }

    /// Subscribe to live updates, replacing any previous subscription.
    /// Returns false when live updates are turned off.
    pub async fn mount_live(&mut self, config: LiveConfig) -> bool {
        if !self.options.enable_live_updates {
            debug!("live updates disabled");
            return false;
        }
        self.unmount_live().await;

        let (tx, updates) = mpsc::unbounded_channel();
        let handle = LiveUpdateListener::new(config).mount(move |task| {
            let _ = tx.send(task);
        });
        self.live = Some(LiveSession { handle, updates });
        true
    }

    pub async fn unmount_live(&mut self) {
        if let Some(session) = self.live.take() {
            session.handle.unmount().await;
        }
    }

    pub fn live_state(&self) -> Option<ListenerState> {
        self.live.as_ref().map(|s| s.handle.state())
    }

    /// Wait for the next pushed task. `None` once the listener has stopped
    /// or when no listener is mounted.
    pub async fn next_push(&mut self) -> Option<Task> {
        match self.live.as_mut() {
            Some(session) => session.updates.recv().await,
            None => None,
        }
    }

    /// Apply every push that already arrived, in arrival order.
    pub fn apply_pending_pushes(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(session) = self.live.as_mut() {
            while let Ok(task) = session.updates.try_recv() {
                pending.push(task);
            }
        }
        let count = pending.len();
        for task in pending {
            self.apply_push(task);
        }
        count
    }
}
