use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::types::{Group, GroupId, GroupRef, Priority, Task, TaskGroup, TaskId};

/// Where the board takes group names and group order from.
///
/// Membership always comes from the task's own group reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingSource {
    /// Groups as they first appear in the task list.
    #[default]
    Embedded,
    /// Groups in the order of the separately fetched group list.
    SeparateFetch,
}

impl GroupingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingSource::Embedded => "embedded",
            GroupingSource::SeparateFetch => "separate-fetch",
        }
    }
}

impl fmt::Display for GroupingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" => Ok(GroupingSource::Embedded),
            "separate-fetch" | "separate" => Ok(GroupingSource::SeparateFetch),
            _ => Err(format!("Unknown grouping source: {s}")),
        }
    }
}

/// Outcome of merging one task record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Merge {
    Inserted,
    Replaced,
}

/// One visible group and its member tasks, in store order.
#[derive(Debug, PartialEq, Eq)]
pub struct GroupPartition<'a> {
    pub group: GroupRef,
    pub tasks: Vec<&'a Task>,
}

/// Tasks and group headers held for one board session.
#[derive(Clone, Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    groups: Vec<Group>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Keeps only the headers; member lists on the records are not a second
    /// copy of membership.
    pub fn replace_groups(&mut self, groups: Vec<TaskGroup>) {
        self.groups = groups.iter().map(TaskGroup::header).collect();
    }

    pub fn insert_group(&mut self, group: Group) {
        match self.groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group,
            None => self.groups.push(group),
        }
    }

    /// Insert an unseen task or overwrite the stored record with the same id.
    pub fn apply_task_update(&mut self, task: Task) -> Merge {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task;
                Merge::Replaced
            }
            None => {
                self.tasks.push(task);
                Merge::Inserted
            }
        }
    }

    /// Returns false when the task is not held.
    pub fn apply_local_priority_change(&mut self, id: TaskId, priority: Priority) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Partition tasks by group. Groups without members are left out.
    pub fn partition(&self, source: GroupingSource) -> Vec<GroupPartition<'_>> {
        let mut partitions: Vec<GroupPartition<'_>> = Vec::new();
        let mut slot: HashMap<GroupId, usize> = HashMap::new();

        if source == GroupingSource::SeparateFetch {
            for group in &self.groups {
                if slot.contains_key(&group.id) {
                    continue;
                }
                slot.insert(group.id, partitions.len());
                partitions.push(GroupPartition {
                    group: group.reference(),
                    tasks: Vec::new(),
                });
            }
        }

        for task in &self.tasks {
            let index = *slot.entry(task.group.id).or_insert_with(|| {
                partitions.push(GroupPartition {
                    group: task.group.clone(),
                    tasks: Vec::new(),
                });
                partitions.len() - 1
            });
            partitions[index].tasks.push(task);
        }

        partitions.retain(|p| !p.tasks.is_empty());
        partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn task(id: TaskId, group: GroupId, priority: Priority) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: None,
            priority,
            completed: false,
            completed_at: None,
            created_at: None,
            updated_at: None,
            group: GroupRef {
                id: group,
                name: format!("embedded {group}"),
            },
        }
    }

    fn group(id: GroupId, name: &str) -> TaskGroup {
        TaskGroup {
            id,
            name: name.to_string(),
            tasks: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn merge_replaces_existing_record() {
        let mut store = TaskStore::new();
        store.replace_tasks(vec![task(1, 1, Priority::Medium)]);

        let merge = store.apply_task_update(task(1, 1, Priority::Urgent));

        assert_eq!(merge, Merge::Replaced);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].priority, Priority::Urgent);
    }

    #[test]
    fn merge_inserts_unseen_record() {
        let mut store = TaskStore::new();
        assert_eq!(store.apply_task_update(task(5, 1, Priority::Low)), Merge::Inserted);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].id, 5);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut once = TaskStore::new();
        once.replace_tasks(vec![task(1, 1, Priority::Low), task(2, 2, Priority::High)]);
        let mut twice = once.clone();
        let update = task(2, 1, Priority::Urgent);

        once.apply_task_update(update.clone());
        twice.apply_task_update(update.clone());
        twice.apply_task_update(update);

        assert_eq!(once.tasks(), twice.tasks());
    }

    #[test]
    fn local_priority_patch_touches_one_field() {
        let mut store = TaskStore::new();
        store.replace_tasks(vec![task(10, 1, Priority::Medium), task(11, 1, Priority::Low)]);

        assert!(store.apply_local_priority_change(10, Priority::Urgent));
        assert!(!store.apply_local_priority_change(99, Priority::Urgent));

        assert_eq!(store.task(10).unwrap().priority, Priority::Urgent);
        assert_eq!(store.task(10).unwrap().title, "task 10");
        assert_eq!(store.task(11).unwrap().priority, Priority::Low);
    }

    #[test]
    fn partition_follows_first_appearance_and_hides_empty_groups() {
        let mut store = TaskStore::new();
        store.replace_groups(vec![group(1, "Work"), group(2, "Home"), group(3, "Empty")]);
        store.replace_tasks(vec![
            task(20, 2, Priority::Low),
            task(10, 1, Priority::Low),
            task(21, 2, Priority::Low),
        ]);

        let parts = store.partition(GroupingSource::Embedded);
        let ids: Vec<(GroupId, Vec<TaskId>)> = parts
            .iter()
            .map(|p| (p.group.id, p.tasks.iter().map(|t| t.id).collect()))
            .collect();
        assert_eq!(ids, vec![(2, vec![20, 21]), (1, vec![10])]);
        assert_eq!(parts[0].group.name, "embedded 2");
        assert_eq!(store.groups().len(), 3);
    }

    #[test]
    fn separate_fetch_uses_fetched_order_and_names() {
        let mut store = TaskStore::new();
        store.replace_groups(vec![group(1, "Work"), group(2, "Home"), group(3, "Empty")]);
        store.replace_tasks(vec![
            task(20, 2, Priority::Low),
            task(40, 4, Priority::Low),
            task(10, 1, Priority::Low),
        ]);

        let parts = store.partition(GroupingSource::SeparateFetch);
        let names: Vec<&str> = parts.iter().map(|p| p.group.name.as_str()).collect();
        assert_eq!(names, vec!["Work", "Home", "embedded 4"]);
    }

    #[test]
    fn partition_contains_every_task_exactly_once() {
        let mut store = TaskStore::new();
        store.replace_groups(vec![group(3, "C"), group(1, "A")]);
        let tasks: Vec<Task> = (0..40)
            .map(|i| task(i, i * 7 % 5, Priority::ALL[(i % 5) as usize]))
            .collect();
        store.replace_tasks(tasks);

        for source in [GroupingSource::Embedded, GroupingSource::SeparateFetch] {
            let parts = store.partition(source);
            let seen: Vec<TaskId> = parts.iter().flat_map(|p| p.tasks.iter().map(|t| t.id)).collect();
            let unique: HashSet<TaskId> = seen.iter().copied().collect();
            assert_eq!(seen.len(), 40);
            assert_eq!(unique.len(), 40);
            assert!(parts.iter().all(|p| !p.tasks.is_empty()));
            assert!(parts.iter().all(|p| p.tasks.iter().all(|t| t.group.id == p.group.id)));
        }
    }

    #[test]
    fn insert_group_replaces_by_id() {
        let mut store = TaskStore::new();
        store.insert_group(group(1, "Work").header());
        store.insert_group(group(1, "Office").header());
        store.insert_group(group(2, "Home").header());

        assert_eq!(store.groups().len(), 2);
        assert_eq!(store.group(1).unwrap().name, "Office");
    }

    #[test]
    fn grouping_source_parses() {
        assert_eq!("separate-fetch".parse::<GroupingSource>().unwrap(), GroupingSource::SeparateFetch);
        assert_eq!("Embedded".parse::<GroupingSource>().unwrap(), GroupingSource::Embedded);
        assert!("by-tag".parse::<GroupingSource>().is_err());
    }
}
