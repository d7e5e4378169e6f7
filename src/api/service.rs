use std::future::Future;

use crate::error::RemoteError;
use crate::types::{GroupNames, NewTask, Priority, Task, TaskGroup, TaskId, TaskUpdate};

pub type RemoteResult<T> = core::result::Result<T, RemoteError>;

/// Calls the board makes against the task service.
///
/// Every call is one request; implementations never retry and never cache.
pub trait TaskApi {
    fn list_tasks(&self) -> impl Future<Output = RemoteResult<Vec<Task>>>;

    fn list_groups(&self) -> impl Future<Output = RemoteResult<Vec<TaskGroup>>>;

    fn group_names(&self) -> impl Future<Output = RemoteResult<GroupNames>>;

    fn create_task(&self, task: &NewTask) -> impl Future<Output = RemoteResult<Task>>;

    fn update_task(
        &self,
        id: TaskId,
        update: &TaskUpdate,
    ) -> impl Future<Output = RemoteResult<Task>>;

    fn change_priority(
        &self,
        id: TaskId,
        priority: Priority,
    ) -> impl Future<Output = RemoteResult<Task>>;

    fn complete_task(&self, id: TaskId) -> impl Future<Output = RemoteResult<Task>>;

    fn create_group(&self, name: &str) -> impl Future<Output = RemoteResult<TaskGroup>>;
}
