//! Board state, user toggles and terminal rendering.

pub mod board;
pub mod render;
pub mod ui_state;

pub use board::{BoardOptions, TaskBoard};
pub use render::{render_board, render_group_names, render_groups, render_partitions, truncate_description};
pub use ui_state::UiState;
