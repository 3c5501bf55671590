use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use devbud_tui::{
    api::{ApiClient, TaskApi, TaskFilter},
    app::{update, AppState},
    config::Settings,
    event::AppEvent,
    model::{
        NewTask, Repository, RepositoryId, StreamMessage, Task, TaskAction, TaskId, TaskStatus,
        TaskSummary, Theme,
    },
    stream::{Connection, MessageRouter, SessionDeps, Topic, WsConnector},
    view::render,
    watch::Watcher,
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(name = "devbud-tui", version, about = "Terminal client for DevBud coding tasks")]
struct Cli {
    /// REST base URL (overrides DEVBUD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Streaming base URL (overrides DEVBUD_WS_URL)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List tasks
    Tasks {
        #[arg(long)]
        repository: Option<RepositoryId>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Print one task and its output
    Show { id: TaskId },
    /// Create a task
    Create {
        #[arg(long)]
        repository: RepositoryId,
        #[arg(long)]
        branch: String,
        #[arg(long)]
        instructions: String,
    },
    /// Cancel a pending or running task
    Cancel { id: TaskId },
    /// Delete a finished task
    Delete { id: TaskId },
    /// List repositories, or one repository's tasks
    Repos { id: Option<RepositoryId> },
    /// Check service health
    Health,
    /// Full-screen live view of one task
    Watch { id: TaskId },
    /// Print the active-task set as the service reports it
    Activity,
}

fn main() -> Result<()> {
    // Install color-eyre panic handler for better error messages
    color_eyre::install()?;

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(url) = &cli.api_url {
        settings = settings.with_api_url(url);
    }
    if let Some(url) = &cli.ws_url {
        settings = settings.with_ws_url(url);
    }

    init_logging(&settings, matches!(cli.command, Command::Watch { .. }))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli.command, settings))
}

/// The full-screen viewer owns the terminal, so it logs to a file;
/// one-shot commands log warnings to stderr.
fn init_logging(settings: &Settings, to_file: bool) -> Result<()> {
    let filter = |default: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    if to_file {
        if let Some(parent) = settings.log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter("info"))
            .with_ansi(false)
            .with_writer(Mutex::new(log_file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter("warn"))
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

async fn run(command: Command, settings: Settings) -> Result<()> {
    let api = Arc::new(ApiClient::new(&settings)?);

    match command {
        Command::Tasks { repository, status } => {
            let filter = TaskFilter {
                repository_id: repository,
                status,
            };
            let tasks = api.list_tasks(&filter).await?;
            if tasks.is_empty() {
                println!("no tasks");
            }
            for task in &tasks {
                println!("{}", format_task_row(task));
            }
        }
        Command::Show { id } => {
            let task = api.get_task(&id).await?;
            print!("{}", format_task_detail(&task));
        }
        Command::Create {
            repository,
            branch,
            instructions,
        } => {
            let new_task = NewTask::new(repository, branch, instructions)?;
            let task = api.create_task(&new_task).await?;
            println!("created {} ({})", task.id, task.status);
        }
        Command::Cancel { id } => {
            let task = api.get_task(&id).await?;
            TaskAction::Cancel.check(task.status)?;
            println!("{}", api.cancel_task(&id).await?);
        }
        Command::Delete { id } => {
            let task = api.get_task(&id).await?;
            TaskAction::Delete.check(task.status)?;
            api.delete_task(&id).await?;
            println!("deleted {id}");
        }
        Command::Repos { id: None } => {
            for repo in api.list_repositories().await? {
                println!("{}", format_repository_row(&repo));
            }
        }
        Command::Repos { id: Some(id) } => {
            for summary in api.repository_tasks(&id).await? {
                println!("{}", format_summary_row(&summary));
            }
        }
        Command::Health => println!("{}", api.health().await?),
        Command::Watch { id } => watch(api, settings, id).await?,
        Command::Activity => activity(settings).await?,
    }
    Ok(())
}

async fn watch(api: Arc<ApiClient>, settings: Settings, task_id: TaskId) -> Result<()> {
    // Fail before touching the terminal if the task does not exist
    let task = api.get_task(&task_id).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let deps = SessionDeps {
        api,
        connector: Arc::new(WsConnector),
        settings: settings.clone(),
    };
    let watcher = Watcher::new(deps, tx, std::env::current_dir()?);
    let state = update(AppState::new(task_id), AppEvent::TaskLoaded(task));

    // Terminal initialization
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, state, watcher, rx, settings.poll_interval).await;

    // Terminal cleanup (always execute even if event loop errored)
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let state = result?;
    if state.deleted {
        println!("deleted {}", state.task_id);
    }
    Ok(())
}

/// Main event loop following Elm Architecture.
/// Separated from `watch` so terminal setup and teardown stay in one place.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut state: AppState,
    mut watcher: Watcher,
    mut events: mpsc::UnboundedReceiver<AppEvent>,
    poll_interval: Duration,
) -> Result<AppState> {
    let mut keys = EventStream::new();
    let mut tick = tokio::time::interval(TICK_RATE);
    let mut poll = tokio::time::interval(poll_interval);
    // The first poll tick fires immediately; the task was just fetched
    poll.tick().await;

    loop {
        for request in state.take_requests() {
            watcher.perform(&state, request);
        }

        terminal.draw(|frame| render(&state, frame))?;

        if state.should_quit {
            break;
        }

        tokio::select! {
            key = keys.next() => match key {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    state = update(state, AppEvent::Key(key));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(event) = events.recv() => {
                state = update(state, event);
            }
            opened = watcher.opened(), if watcher.is_opening() => {
                watcher.attach(opened);
            }
            _ = tick.tick() => {
                state = update(state, AppEvent::Tick);
            }
            _ = poll.tick() => {
                watcher.refresh(&state.task_id);
            }
        }
    }

    watcher.shutdown();
    Ok(state)
}

async fn activity(settings: Settings) -> Result<()> {
    let router = MessageRouter::new();
    let _status = router.on(Topic::StatusUpdate, |event| {
        if let Some(StreamMessage::StatusUpdate { active_tasks, .. }) = event.as_message() {
            println!("{}", format_active_tasks(active_tasks));
        }
    });
    let _connected = router.on(Topic::Connected, |_| eprintln!("connected"));
    let _disconnected = router.on(Topic::Disconnected, |_| eprintln!("disconnected, retrying"));

    let connection = Connection::new(
        Arc::new(WsConnector),
        router.clone(),
        settings.reconnect_interval,
    );
    connection.connect(settings.all_tasks_channel_url());

    tokio::signal::ctrl_c().await?;
    connection.close();
    Ok(())
}

fn format_task_row(task: &Task) -> String {
    format!(
        "{} {:<10} {:<36} {:<30} {}",
        Theme::task_status_icon(task.status),
        task.status.as_str(),
        task.id,
        task.branch_name,
        task.repository_name()
    )
}

fn format_summary_row(summary: &TaskSummary) -> String {
    format!(
        "{} {:<10} {:<36} {}",
        Theme::task_status_icon(summary.status),
        summary.status.as_str(),
        summary.id,
        summary.branch_name
    )
}

fn format_repository_row(repo: &Repository) -> String {
    let marker = if repo.is_active { " " } else { "x" };
    format!("{marker} {:<36} {:<20} {}", repo.id, repo.name, repo.path)
}

fn format_task_detail(task: &Task) -> String {
    let mut out = String::new();
    let mut field = |label: &str, value: &str| {
        out.push_str(&format!("{label:<10} {value}\n"));
    };
    field("id", task.id.as_str());
    field("branch", &task.branch_name);
    field("repo", task.repository_name());
    field("status", task.status.as_str());
    if let Some(path) = &task.worktree_path {
        field("worktree", path);
    }
    if let Some(error) = &task.error_message {
        field("error", error);
    }
    field("actions", &enabled_action_names(task.status));
    out.push('\n');
    out.push_str(&task.instructions);
    out.push_str("\n\n--- output ---\n");
    out.push_str(&task.output_log);
    if !task.output_log.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn enabled_action_names(status: TaskStatus) -> String {
    let names: Vec<_> = status.enabled_actions().iter().map(|a| a.as_str()).collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn format_active_tasks(active: &[TaskId]) -> String {
    if active.is_empty() {
        "no active tasks".to_string()
    } else {
        let ids: Vec<_> = active.iter().map(TaskId::as_str).collect();
        format!("{} active: {}", active.len(), ids.join(", "))
    }
}
