use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type TaskId = i64;
pub type GroupId = i64;

/// Group id → group name, as served by the name index endpoint.
pub type GroupNames = BTreeMap<GroupId, String>;

/// Five fixed urgency levels, most urgent first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
    #[default]
    NoPriority,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::NoPriority,
    ];

    /// Wire code, `P1` through `P5`.
    pub fn code(&self) -> &'static str {
        match self {
            Priority::Urgent => "P1",
            Priority::High => "P2",
            Priority::Medium => "P3",
            Priority::Low => "P4",
            Priority::NoPriority => "P5",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Urgent => "Urgent",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::NoPriority => "No priority",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Priority::Urgent => "#FF0000",
            Priority::High => "#FFA500",
            Priority::Medium => "#FFFF00",
            Priority::Low => "#00FF00",
            Priority::NoPriority => "#808080",
        }
    }

    /// Channels of [`color`](Self::color).
    pub fn rgb(&self) -> (u8, u8, u8) {
        let hex = self.color().trim_start_matches('#');
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).unwrap_or(0);
        (channel(0), channel(2), channel(4))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("none") {
            return Ok(Priority::NoPriority);
        }
        Priority::ALL
            .into_iter()
            .find(|p| wanted.eq_ignore_ascii_case(p.code()) || wanted.eq_ignore_ascii_case(p.label()))
            .ok_or_else(|| format!("Unknown priority: {s}"))
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.code().to_string()
    }
}

/// Service timestamp. The service has emitted several layouts over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(pub NaiveDateTime);

impl Timestamp {
    const ISO: &'static str = "%Y-%m-%dT%H:%M:%S";
    const DISPLAY: &'static str = "%d/%m/%Y %H:%M";

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Timestamp(dt.naive_local()));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(Timestamp)
            .ok_or_else(|| format!("Unrecognised timestamp: {s}"))
    }

    pub fn display(&self) -> String {
        self.0.format(Self::DISPLAY).to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::ISO))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Timestamp::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

/// The copy of a task's group carried on every task record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    #[serde(rename = "taskGroupId")]
    pub id: GroupId,
    #[serde(rename = "taskGroupName", default)]
    pub name: String,
}

impl GroupRef {
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Group #{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskWire")]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "taskId")]
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    #[serde(rename = "taskGroup")]
    pub group: GroupRef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskWire {
    task_id: TaskId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    completed_at: Option<Timestamp>,
    #[serde(default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    updated_at: Option<Timestamp>,
    #[serde(default)]
    task_group: Option<GroupRef>,
    #[serde(default)]
    task_group_id: Option<GroupId>,
}

impl TaskWire {
    /// `owner` is the group record this task was nested in, if any.
    fn into_task(self, owner: Option<&GroupRef>) -> Result<Task, String> {
        if self.title.trim().is_empty() {
            return Err(format!("task {} has an empty title", self.task_id));
        }
        if self.completed_at.is_some() && !self.completed {
            return Err(format!(
                "task {} has a completion time but is not completed",
                self.task_id
            ));
        }
        let group = match (self.task_group, self.task_group_id, owner) {
            (Some(group), _, _) => group,
            (None, Some(id), Some(owner)) if owner.id == id => owner.clone(),
            (None, Some(id), _) => GroupRef {
                id,
                name: String::new(),
            },
            (None, None, Some(owner)) => owner.clone(),
            (None, None, None) => {
                return Err(format!("task {} carries no group reference", self.task_id));
            }
        };
        Ok(Task {
            id: self.task_id,
            title: self.title,
            description: self.description,
            priority: self.priority.unwrap_or_default(),
            completed: self.completed,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            group,
        })
    }
}

impl TryFrom<TaskWire> for Task {
    type Error = String;

    fn try_from(wire: TaskWire) -> Result<Self, Self::Error> {
        wire.into_task(None)
    }
}

/// Group header: a group without its member list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "taskGroupId")]
    pub id: GroupId,
    #[serde(rename = "taskGroupName")]
    pub name: String,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Group {
    pub fn reference(&self) -> GroupRef {
        GroupRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// A group as served by the group endpoints, member tasks included.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TaskGroupWire")]
pub struct TaskGroup {
    pub id: GroupId,
    pub name: String,
    pub tasks: Vec<Task>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl TaskGroup {
    pub fn header(&self) -> Group {
        Group {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskGroupWire {
    task_group_id: GroupId,
    task_group_name: String,
    #[serde(default)]
    tasks: Vec<TaskWire>,
    #[serde(default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    updated_at: Option<Timestamp>,
}

impl TryFrom<TaskGroupWire> for TaskGroup {
    type Error = String;

    fn try_from(wire: TaskGroupWire) -> Result<Self, Self::Error> {
        if wire.task_group_name.trim().is_empty() {
            return Err(format!("group {} has an empty name", wire.task_group_id));
        }
        let owner = GroupRef {
            id: wire.task_group_id,
            name: wire.task_group_name.clone(),
        };
        let tasks = wire
            .tasks
            .into_iter()
            .map(|t| t.into_task(Some(&owner)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TaskGroup {
            id: wire.task_group_id,
            name: wire.task_group_name,
            tasks,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

/// Body of a create-task request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub task_group_id: GroupId,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Body of a full task edit. Same shape as [`NewTask`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub task_group_id: GroupId,
}

impl TaskUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        Ok(())
    }
}

impl From<&Task> for TaskUpdate {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority,
            task_group_id: task.group.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_accepts_codes_and_labels() {
        assert_eq!("P1".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("MEDIUM".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("No priority".parse::<Priority>().unwrap(), Priority::NoPriority);
        assert_eq!("NONE".parse::<Priority>().unwrap(), Priority::NoPriority);
        assert!("P9".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_order_is_fixed() {
        let mut shuffled = vec![Priority::Low, Priority::Urgent, Priority::NoPriority, Priority::High];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Priority::Urgent, Priority::High, Priority::Low, Priority::NoPriority]
        );
        assert_eq!(Priority::default(), Priority::NoPriority);
        assert_eq!(serde_json::to_value(Priority::Medium).unwrap(), json!("P3"));
    }

    #[test]
    fn flag_colors_come_from_the_hex_table() {
        assert_eq!(Priority::Urgent.rgb(), (0xFF, 0x00, 0x00));
        assert_eq!(Priority::High.rgb(), (0xFF, 0xA5, 0x00));
        assert_eq!(Priority::NoPriority.rgb(), (0x80, 0x80, 0x80));
    }

    #[test]
    fn null_or_missing_priority_is_lowest() {
        let task: Task = serde_json::from_value(json!({
            "taskId": 1, "title": "a", "priority": null, "taskGroupId": 1
        }))
        .unwrap();
        assert_eq!(task.priority, Priority::NoPriority);

        let tasks: Vec<Task> = serde_json::from_value(json!([
            { "taskId": 1, "title": "a", "priority": "P2", "taskGroupId": 1 },
            { "taskId": 2, "title": "b", "priority": null, "taskGroupId": 1 },
            { "taskId": 3, "title": "c", "taskGroupId": 1 }
        ]))
        .unwrap();
        let priorities: Vec<Priority> = tasks.iter().map(|t| t.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::High, Priority::NoPriority, Priority::NoPriority]
        );
    }

    #[test]
    fn timestamp_layouts() {
        let iso = Timestamp::parse("2024-05-12T14:30:00").unwrap();
        let frac = Timestamp::parse("2024-05-12T14:30:00.123456").unwrap();
        let display = Timestamp::parse("12/05/2024 14:30").unwrap();
        let rfc = Timestamp::parse("2024-05-12T14:30:00Z").unwrap();
        assert_eq!(iso, display);
        assert_eq!(iso, rfc);
        assert_eq!(frac.display(), "12/05/2024 14:30");
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn decodes_task_with_embedded_group() {
        let task: Task = serde_json::from_value(json!({
            "taskId": 10,
            "title": "Write report",
            "description": null,
            "priority": "Urgent",
            "completed": false,
            "completedAt": null,
            "createdAt": "2024-05-12T14:30:00",
            "updatedAt": "2024-05-13T10:15:00",
            "taskGroup": { "taskGroupId": 1, "taskGroupName": "Work", "tasks": [] }
        }))
        .unwrap();
        assert_eq!(task.id, 10);
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.group.name, "Work");
        assert_eq!(task.description, None);
    }

    #[test]
    fn rejects_inconsistent_completion_and_empty_title() {
        let stray_completion = json!({
            "taskId": 1, "title": "a", "completed": false,
            "completedAt": "2024-05-12T14:30:00", "taskGroupId": 1
        });
        assert!(serde_json::from_value::<Task>(stray_completion).is_err());

        let empty_title = json!({ "taskId": 1, "title": "  ", "taskGroupId": 1 });
        assert!(serde_json::from_value::<Task>(empty_title).is_err());

        let no_group = json!({ "taskId": 1, "title": "a" });
        assert!(serde_json::from_value::<Task>(no_group).is_err());
    }

    #[test]
    fn completed_without_timestamp_is_accepted() {
        let task: Task = serde_json::from_value(json!({
            "taskId": 3, "title": "done", "completed": true, "taskGroupId": 2
        }))
        .unwrap();
        assert!(task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.group.display_name(), "Group #2");
    }

    #[test]
    fn nested_tasks_inherit_their_group() {
        let group: TaskGroup = serde_json::from_value(json!({
            "taskGroupId": 4,
            "taskGroupName": "Home",
            "tasks": [
                { "taskId": 7, "title": "Groceries", "priority": "LOW" },
                { "taskId": 8, "title": "Laundry", "taskGroupId": 4 }
            ],
            "createdAt": "01/05/2024 20:10",
            "updatedAt": "11/05/2024 18:20"
        }))
        .unwrap();
        assert_eq!(group.tasks.len(), 2);
        assert!(group.tasks.iter().all(|t| t.group == GroupRef { id: 4, name: "Home".into() }));
        assert_eq!(group.header().name, "Home");
        assert_eq!(group.tasks[0].priority, Priority::Low);
    }

    #[test]
    fn task_round_trips_through_its_wire_names() {
        let task: Task = serde_json::from_value(json!({
            "taskId": 5, "title": "t", "priority": "P2",
            "taskGroup": { "taskGroupId": 9, "taskGroupName": "Ops" }
        }))
        .unwrap();
        let encoded = serde_json::to_value(&task).unwrap();
        assert_eq!(encoded["taskId"], json!(5));
        assert_eq!(encoded["priority"], json!("P2"));
        assert_eq!(encoded["taskGroup"]["taskGroupName"], json!("Ops"));
        assert_eq!(serde_json::from_value::<Task>(encoded).unwrap(), task);
    }

    #[test]
    fn new_task_body_uses_wire_names() {
        let body = NewTask {
            title: "Plan sprint".into(),
            description: String::new(),
            priority: Priority::NoPriority,
            task_group_id: 1,
        };
        assert!(body.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "title": "Plan sprint", "description": "", "priority": "P5", "taskGroupId": 1 })
        );
    }
}
