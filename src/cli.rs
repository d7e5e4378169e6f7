use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Settings;
use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::store::GroupingSource;
use crate::types::{GroupId, Priority, TaskId};

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the grouped board once
    List(ListArgs),
    /// Print the board and redraw it on every live update
    Watch,
    /// Interactive board
    Board,
    /// Create a task
    Create(CreateArgs),
    /// Edit a task; omitted fields keep their current value
    Edit(EditArgs),
    /// Change the priority of a task
    Priority {
        id: TaskId,
        /// P1-P5 or a label such as "urgent"
        priority: Priority,
    },
    /// Mark a task as completed
    Complete { id: TaskId },
    /// List task groups
    Groups {
        /// Only the id → name index
        #[arg(long)]
        names: bool,
    },
    /// Create a task group
    CreateGroup { name: String },
    /// Open an interactive editor for settings.json
    Config,
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Task service base URL
    #[arg(long, env = "NODELIST_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// STOMP WebSocket endpoint
    #[arg(long, env = "NODELIST_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Topic carrying task updates
    #[arg(long, env = "NODELIST_TOPIC", global = true)]
    pub topic: Option<String>,

    /// Settings file (defaults to the user config dir)
    #[arg(long, env = "NODELIST_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Where group names and order come from: embedded or separate-fetch
    #[arg(long, env = "NODELIST_GROUPING", global = true)]
    pub grouping: Option<GroupingSource>,

    /// Do not subscribe to live updates
    #[arg(long, env = "NODELIST_NO_LIVE", global = true)]
    pub no_live: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Command-line and environment values win over the settings file.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.backend_url {
            settings.backend_url = url.clone();
        }
        if let Some(url) = &self.ws_url {
            settings.ws_url = url.clone();
        }
        if let Some(topic) = &self.topic {
            settings.topic = topic.clone();
        }
        if let Some(grouping) = self.grouping {
            settings.grouping_source = grouping;
        }
        if self.no_live {
            settings.enable_live_updates = false;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Show full descriptions
    #[arg(long)]
    pub expand: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    #[arg(short, long, default_value = "P5")]
    pub priority: Priority,

    /// Group id
    #[arg(short, long)]
    pub group: GroupId,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: TaskId,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Move the task to another group
    #[arg(short, long)]
    pub group: Option<GroupId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nodelist",
            "list",
            "--backend-url",
            "http://10.0.0.5:8080",
            "--grouping",
            "separate-fetch",
            "--no-live",
        ])
        .unwrap();

        let mut settings = Settings::default();
        cli.global.apply(&mut settings);
        assert_eq!(settings.backend_url, "http://10.0.0.5:8080");
        assert_eq!(settings.grouping_source, GroupingSource::SeparateFetch);
        assert!(!settings.enable_live_updates);
        assert_eq!(settings.topic, Settings::default().topic);
    }

    #[test]
    fn priority_arguments_accept_labels() {
        let cli = Cli::try_parse_from(["nodelist", "priority", "12", "urgent"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Priority { id: 12, priority: Priority::Urgent }
        ));
        assert!(Cli::try_parse_from(["nodelist", "priority", "12", "P9"]).is_err());
    }

    #[test]
    fn create_defaults_to_no_priority() {
        let cli = Cli::try_parse_from(["nodelist", "create", "Plan sprint", "--group", "1"]).unwrap();
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.priority, Priority::NoPriority);
        assert_eq!(args.description, "");
    }
}
