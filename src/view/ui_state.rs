use std::collections::HashSet;

use crate::types::{GroupId, Task, TaskId};

/// Presentation-only toggles, keyed by id so they outlive list replacement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UiState {
    collapsed_groups: HashSet<GroupId>,
    expanded_tasks: HashSet<TaskId>,
    open_priority_menu: Option<TaskId>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups start expanded.
    pub fn is_group_expanded(&self, id: GroupId) -> bool {
        !self.collapsed_groups.contains(&id)
    }

    /// Returns the new expansion state.
    pub fn toggle_group(&mut self, id: GroupId) -> bool {
        if self.collapsed_groups.remove(&id) {
            true
        } else {
            self.collapsed_groups.insert(id);
            false
        }
    }

    pub fn is_task_expanded(&self, id: TaskId) -> bool {
        self.expanded_tasks.contains(&id)
    }

    pub fn toggle_task(&mut self, id: TaskId) -> bool {
        if self.expanded_tasks.remove(&id) {
            false
        } else {
            self.expanded_tasks.insert(id);
            true
        }
    }

    pub fn open_priority_menu(&self) -> Option<TaskId> {
        self.open_priority_menu
    }

    /// Open the menu for `id`, closing any other; toggling the open one closes it.
    pub fn toggle_priority_menu(&mut self, id: TaskId) -> Option<TaskId> {
        self.open_priority_menu = match self.open_priority_menu {
            Some(open) if open == id => None,
            _ => Some(id),
        };
        self.open_priority_menu
    }

    pub fn close_priority_menu(&mut self) {
        self.open_priority_menu = None;
    }

    /// A click outside any open menu.
    pub fn dismiss_menus(&mut self) {
        self.close_priority_menu();
    }

    /// Drop a dangling menu after the task list changed underneath it.
    pub fn reconcile(&mut self, tasks: &[Task]) {
        if let Some(open) = self.open_priority_menu
            && !tasks.iter().any(|t| t.id == open)
        {
            self.open_priority_menu = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_default_to_expanded() {
        let mut ui = UiState::new();
        assert!(ui.is_group_expanded(1));
        assert!(!ui.toggle_group(1));
        assert!(!ui.is_group_expanded(1));
        assert!(ui.toggle_group(1));
        assert!(ui.is_group_expanded(1));
    }

    #[test]
    fn task_details_toggle() {
        let mut ui = UiState::new();
        assert!(!ui.is_task_expanded(3));
        assert!(ui.toggle_task(3));
        assert!(ui.is_task_expanded(3));
        assert!(!ui.toggle_task(3));
    }

    #[test]
    fn priority_menu_is_exclusive() {
        let mut ui = UiState::new();
        assert_eq!(ui.toggle_priority_menu(1), Some(1));
        assert_eq!(ui.toggle_priority_menu(2), Some(2));
        assert_eq!(ui.open_priority_menu(), Some(2));
        assert_eq!(ui.toggle_priority_menu(2), None);

        ui.toggle_priority_menu(7);
        ui.dismiss_menus();
        assert_eq!(ui.open_priority_menu(), None);
    }
}
