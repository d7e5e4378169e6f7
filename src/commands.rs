//! Command handlers for the `nodelist` binary

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api::HttpTaskApi;
use crate::cli::{Cli, Command, CreateArgs, EditArgs};
use crate::config::Settings;
use crate::error::{ClientError, ClientResult};
use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::store::GroupingSource;
use crate::types::{GroupId, NewTask, Priority, Task, TaskId, TaskUpdate};
use crate::view::{TaskBoard, render_board, render_group_names, render_groups};

type Board = TaskBoard<HttpTaskApi>;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Resolve settings and run one subcommand.
pub async fn run(cli: Cli) -> ClientResult<()> {
    let path = match cli.global.settings.clone().or_else(Settings::default_path) {
        Some(path) => path,
        None => {
            return Err(ClientError::Config(
                "no user config directory; pass --settings".to_string(),
            ));
        }
    };

    match cli.command {
        Command::Version => {
            handle_version();
            return Ok(());
        }
        Command::Config => return handle_config(path).await,
        _ => {}
    }

    let mut settings = Settings::load(&path)?;
    cli.global.apply(&mut settings);
    let settings = settings.validated()?;
    debug!(backend = %settings.backend_url, live = settings.enable_live_updates, "settings resolved");

    match cli.command {
        Command::List(args) => handle_list(&settings, args.expand).await,
        Command::Watch => handle_watch(&settings).await,
        Command::Board => handle_board(&settings).await,
        Command::Create(args) => handle_create(&settings, args).await,
        Command::Edit(args) => handle_edit(&settings, args).await,
        Command::Priority { id, priority } => handle_priority(&settings, id, priority).await,
        Command::Complete { id } => handle_complete(&settings, id).await,
        Command::Groups { names } => handle_groups(&settings, names).await,
        Command::CreateGroup { name } => handle_create_group(&settings, &name).await,
        Command::Config | Command::Version => Ok(()),
    }
}

fn open_board(settings: &Settings) -> Board {
    let api = HttpTaskApi::new(settings.api_config());
    TaskBoard::new(api, settings.board_options())
}

/// Load the board; only an entirely empty result after a failure is fatal.
async fn load(board: &mut Board) -> ClientResult<()> {
    if let Err(err) = board.refresh().await
        && board.store().tasks().is_empty()
        && board.store().groups().is_empty()
    {
        return Err(err);
    }
    Ok(())
}

/// Handle list command
pub async fn handle_list(settings: &Settings, expand: bool) -> ClientResult<()> {
    let mut board = open_board(settings);
    load(&mut board).await?;

    if expand {
        let ids: Vec<TaskId> = board.store().tasks().iter().map(|t| t.id).collect();
        for id in ids {
            board.toggle_task(id);
        }
    }
    print!("{}", render_board(&board));
    Ok(())
}

/// Handle watch command: redraw on every pushed update until Ctrl-C.
pub async fn handle_watch(settings: &Settings) -> ClientResult<()> {
    let mut board = open_board(settings);
    load(&mut board).await?;

    if !board.mount_live(settings.live_config()).await {
        print!("{}", render_board(&board));
        println!("{}", "Live updates are disabled".yellow());
        return Ok(());
    }

    loop {
        print!("{CLEAR_SCREEN}{}", render_board(&board));
        println!("{}", format!("watching {} (Ctrl-C to stop)", settings.topic).dimmed());

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("watch interrupted");
                break;
            }
            push = board.next_push() => match push {
                Some(task) => {
                    board.apply_push(task);
                    board.apply_pending_pushes();
                }
                None => {
                    warn!("live updates stopped");
                    println!("{}", "Live updates stopped".yellow());
                    break;
                }
            },
        }
    }

    board.unmount_live().await;
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Refresh,
    ToggleGroup,
    ToggleDetails,
    Priority,
    Complete,
    Create,
    Edit,
    CreateGroup,
    Quit,
}

impl Action {
    const ALL: [Action; 9] = [
        Action::Refresh,
        Action::ToggleGroup,
        Action::ToggleDetails,
        Action::Priority,
        Action::Complete,
        Action::Create,
        Action::Edit,
        Action::CreateGroup,
        Action::Quit,
    ];

    fn label(&self) -> &'static str {
        match self {
            Action::Refresh => "Refresh",
            Action::ToggleGroup => "Expand / collapse group",
            Action::ToggleDetails => "Show / hide task details",
            Action::Priority => "Change priority",
            Action::Complete => "Complete task",
            Action::Create => "New task",
            Action::Edit => "Edit task",
            Action::CreateGroup => "New group",
            Action::Quit => "Quit",
        }
    }
}

/// Run a blocking prompt off the async runtime.
async fn prompt<T, F>(ask: F) -> ClientResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ColorfulTheme) -> Result<T, dialoguer::Error> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(move || ask(&ColorfulTheme::default()))
        .await
        .map_err(|e| ClientError::Other(format!("prompt task failed: {e}")))??;
    Ok(answer)
}

async fn select(title: &'static str, items: Vec<String>, default: usize) -> ClientResult<Option<usize>> {
    prompt(move |theme| {
        Select::with_theme(theme)
            .with_prompt(title)
            .items(items.as_slice())
            .default(default)
            .interact_opt()
    })
    .await
}

async fn pick_task(board: &Board, title: &'static str) -> ClientResult<Option<TaskId>> {
    let tasks: Vec<(TaskId, String)> = board
        .store()
        .tasks()
        .iter()
        .map(|t| (t.id, format!("#{} {}", t.id, t.title)))
        .collect();
    if tasks.is_empty() {
        println!("{}", "No tasks yet".yellow());
        return Ok(None);
    }
    let labels = tasks.iter().map(|(_, label)| label.clone()).collect();
    Ok(select(title, labels, 0).await?.map(|i| tasks[i].0))
}

/// Groups offered in pickers: every known header, then any group only seen
/// on a task.
fn known_groups(board: &Board) -> Vec<(GroupId, String)> {
    let mut groups: Vec<(GroupId, String)> = board
        .store()
        .groups()
        .iter()
        .map(|g| (g.id, g.name.clone()))
        .collect();
    for part in board.partition() {
        if !groups.iter().any(|(id, _)| *id == part.group.id) {
            groups.push((part.group.id, part.group.display_name()));
        }
    }
    groups
}

async fn pick_group(board: &Board, current: Option<GroupId>) -> ClientResult<Option<GroupId>> {
    let groups = known_groups(board);
    if groups.is_empty() {
        println!("{}", "Create a group first".yellow());
        return Ok(None);
    }
    let default = current
        .and_then(|id| groups.iter().position(|(g, _)| *g == id))
        .unwrap_or(0);
    let labels = groups.iter().map(|(_, name)| name.clone()).collect();
    Ok(select("Group", labels, default).await?.map(|i| groups[i].0))
}

async fn pick_priority(current: Priority) -> ClientResult<Option<Priority>> {
    let labels = Priority::ALL.iter().map(|p| p.label().to_string()).collect();
    let default = Priority::ALL.iter().position(|p| *p == current).unwrap_or(0);
    Ok(select("Priority", labels, default).await?.map(|i| Priority::ALL[i]))
}

async fn input(title: &'static str, initial: String, allow_empty: bool) -> ClientResult<String> {
    prompt(move |theme| {
        Input::<String>::with_theme(theme)
            .with_prompt(title)
            .with_initial_text(initial)
            .allow_empty(allow_empty)
            .interact_text()
    })
    .await
}

/// Handle board command: the interactive session.
pub async fn handle_board(settings: &Settings) -> ClientResult<()> {
    let mut board = open_board(settings);
    let _ = board.refresh().await;
    board.mount_live(settings.live_config()).await;

    loop {
        let applied = board.apply_pending_pushes();
        if applied > 0 {
            debug!(applied, "applied queued live updates");
        }
        print!("{CLEAR_SCREEN}{}", render_board(&board));
        board.clear_notice();

        let labels = Action::ALL.iter().map(|a| a.label().to_string()).collect();
        let action = match select("Action", labels, 0).await? {
            Some(index) => Action::ALL[index],
            None => Action::Quit,
        };
        board.apply_pending_pushes();

        // Command failures are already on the board as a notice.
        match action {
            Action::Refresh => {
                let _ = board.refresh().await;
            }
            Action::ToggleGroup => {
                let groups: Vec<(GroupId, String)> = board
                    .partition()
                    .iter()
                    .map(|p| (p.group.id, p.group.display_name()))
                    .collect();
                let labels = groups.iter().map(|(_, name)| name.clone()).collect();
                if !groups.is_empty()
                    && let Some(i) = select("Group", labels, 0).await?
                {
                    board.toggle_group(groups[i].0);
                }
            }
            Action::ToggleDetails => {
                if let Some(id) = pick_task(&board, "Task").await? {
                    board.toggle_task(id);
                }
            }
            Action::Priority => {
                if let Some(id) = pick_task(&board, "Task").await? {
                    board.toggle_priority_menu(id);
                    print!("{CLEAR_SCREEN}{}", render_board(&board));
                    let current = board.store().task(id).map(|t| t.priority).unwrap_or_default();
                    match pick_priority(current).await? {
                        Some(priority) => {
                            let _ = board.change_priority(id, priority).await;
                        }
                        None => board.dismiss_menus(),
                    }
                }
            }
            Action::Complete => {
                if let Some(id) = pick_task(&board, "Complete which task?").await? {
                    let _ = board.complete_task(id).await;
                }
            }
            Action::Create => {
                if let Some(new_task) = prompt_new_task(&board).await? {
                    let _ = board.create_task(new_task).await;
                }
            }
            Action::Edit => {
                if let Some(id) = pick_task(&board, "Edit which task?").await?
                    && let Some(task) = board.store().task(id).cloned()
                    && let Some(update) = prompt_task_update(&board, &task).await?
                {
                    let _ = board.update_task(id, update).await;
                }
            }
            Action::CreateGroup => {
                let name = input("Group name", String::new(), false).await?;
                let _ = board.create_group(&name).await;
            }
            Action::Quit => break,
        }
    }

    board.unmount_live().await;
    Ok(())
}

async fn prompt_new_task(board: &Board) -> ClientResult<Option<NewTask>> {
    let title = input("Title", String::new(), false).await?;
    let description = input("Description", String::new(), true).await?;
    let Some(priority) = pick_priority(Priority::NoPriority).await? else {
        return Ok(None);
    };
    let Some(task_group_id) = pick_group(board, None).await? else {
        return Ok(None);
    };
    Ok(Some(NewTask {
        title,
        description,
        priority,
        task_group_id,
    }))
}

async fn prompt_task_update(board: &Board, task: &Task) -> ClientResult<Option<TaskUpdate>> {
    let current = TaskUpdate::from(task);
    let title = input("Title", current.title, false).await?;
    let description = input("Description", current.description, true).await?;
    let Some(priority) = pick_priority(current.priority).await? else {
        return Ok(None);
    };
    let Some(task_group_id) = pick_group(board, Some(current.task_group_id)).await? else {
        return Ok(None);
    };
    Ok(Some(TaskUpdate {
        title,
        description,
        priority,
        task_group_id,
    }))
}

/// Handle create command
pub async fn handle_create(settings: &Settings, args: CreateArgs) -> ClientResult<()> {
    let mut board = open_board(settings);
    let task = board
        .create_task(NewTask {
            title: args.title,
            description: args.description,
            priority: args.priority,
            task_group_id: args.group,
        })
        .await?;

    println!("{}", "✓ Task created successfully".green().bold());
    println!("  ID: {}", task.id);
    println!("  Title: {}", task.title);
    println!("  Group: {}", task.group.display_name());
    println!("  Priority: {}", task.priority);
    Ok(())
}

/// Apply the given fields over the task's current values.
fn merge_edit(task: &Task, args: EditArgs) -> TaskUpdate {
    let current = TaskUpdate::from(task);
    TaskUpdate {
        title: args.title.unwrap_or(current.title),
        description: args.description.unwrap_or(current.description),
        priority: args.priority.unwrap_or(current.priority),
        task_group_id: args.group.unwrap_or(current.task_group_id),
    }
}

/// Handle edit command
pub async fn handle_edit(settings: &Settings, args: EditArgs) -> ClientResult<()> {
    let mut board = open_board(settings);
    load(&mut board).await?;

    let id = args.id;
    let task = board
        .store()
        .task(id)
        .cloned()
        .ok_or(ClientError::UnknownTask(id))?;
    let updated = board.update_task(id, merge_edit(&task, args)).await?;

    println!("{}", "✓ Task updated".green().bold());
    println!("  ID: {}", updated.id);
    println!("  Title: {}", updated.title);
    println!("  Group: {}", updated.group.display_name());
    Ok(())
}

/// Handle priority command
pub async fn handle_priority(settings: &Settings, id: TaskId, priority: Priority) -> ClientResult<()> {
    let mut board = open_board(settings);
    board.change_priority(id, priority).await?;
    println!(
        "{} #{id} is now {}",
        "✓".green().bold(),
        priority.label().truecolor(priority.rgb().0, priority.rgb().1, priority.rgb().2)
    );
    Ok(())
}

/// Handle complete command
pub async fn handle_complete(settings: &Settings, id: TaskId) -> ClientResult<()> {
    let mut board = open_board(settings);
    let task = board.complete_task(id).await?;
    let when = task
        .completed_at
        .map(|t| t.display())
        .unwrap_or_else(|| "now".to_string());
    println!("{} #{} {} completed ({when})", "✓".green().bold(), task.id, task.title);
    Ok(())
}

/// Handle groups command
pub async fn handle_groups(settings: &Settings, names_only: bool) -> ClientResult<()> {
    let mut board = open_board(settings);
    if names_only {
        let names = board.group_names().await?;
        print!("{}", render_group_names(&names));
        return Ok(());
    }
    board.refresh().await?;
    print!("{}", render_groups(board.store().groups()));
    Ok(())
}

/// Handle create-group command
pub async fn handle_create_group(settings: &Settings, name: &str) -> ClientResult<()> {
    let mut board = open_board(settings);
    let group = board.create_group(name).await?;
    println!("{}", "✓ Group created successfully".green().bold());
    println!("  ID: {}", group.id);
    println!("  Name: {}", group.name);
    Ok(())
}

pub fn handle_version() {
    println!("{PKG_NAME} {PKG_VERSION}");
    if !PKG_DESCRIPTION.is_empty() {
        println!("{PKG_DESCRIPTION}");
    }
}

/// Handle config command: edit settings.json interactively.
pub async fn handle_config(path: PathBuf) -> ClientResult<()> {
    let current = Settings::load(&path)?;
    println!("Editing {}", path.display().to_string().bold());

    let backend_url = input("Backend URL", current.backend_url.clone(), false).await?;
    let enable_live_updates = prompt(move |theme| {
        Confirm::with_theme(theme)
            .with_prompt("Enable live updates?")
            .default(current.enable_live_updates)
            .interact()
    })
    .await?;
    let ws_url = input("WebSocket URL", current.ws_url.clone(), false).await?;
    let topic = input("Topic", current.topic.clone(), false).await?;

    let sources = [GroupingSource::Embedded, GroupingSource::SeparateFetch];
    let labels = sources.iter().map(|s| s.as_str().to_string()).collect();
    let default = sources
        .iter()
        .position(|s| *s == current.grouping_source)
        .unwrap_or(0);
    let grouping_source = select("Grouping source", labels, default)
        .await?
        .map(|i| sources[i])
        .unwrap_or(current.grouping_source);

    let timeout = current.request_timeout_secs;
    let request_timeout_secs = prompt(move |theme| {
        Input::<u64>::with_theme(theme)
            .with_prompt("Request timeout (seconds)")
            .default(timeout)
            .interact_text()
    })
    .await?;

    let settings = Settings {
        backend_url,
        ws_url,
        topic,
        enable_live_updates,
        grouping_source,
        request_timeout_secs,
    }
    .validated()?;
    save(&settings, &path)
}

fn save(settings: &Settings, path: &Path) -> ClientResult<()> {
    settings.save(path)?;
    info!(path = %path.display(), "settings saved");
    println!("{} {}", "✓ Saved".green().bold(), path.display());
    Ok(())
}
