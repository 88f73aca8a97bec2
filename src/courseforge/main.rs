use chrono::Local;
use clap::Parser;
use colored::*;
use courseforge::api::{CmdMessage, CourseApi, MessageLevel};
use courseforge::commands::{CmdResult, ConfigAction, SyllabusSummary, SyllabusView};
use courseforge::config::{CourseConfig, CONFIG_KEYS};
use courseforge::error::{CourseError, Result};
use courseforge::export::Artifact;
use courseforge::jobs::BulkProgress;
use courseforge::service::gemini::GeminiClient;
use courseforge::service::GenerativeService;
use courseforge::store::fs::FileStore;
use directories::ProjectDirs;
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

mod args;
mod shell;
use args::{Cli, Commands, RetryArgs, ShellLine};

const HOME_ENV: &str = "COURSEFORGE_HOME";
const API_KEY_ENVS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct AppContext {
    api: CourseApi<FileStore>,
    output: PathBuf,
}

async fn run(cli: Cli) -> Result<()> {
    let mut ctx = init_context(&cli)?;
    let interrupt: InterruptSlot = Arc::new(Mutex::new(ctx.api.cancel_token()));
    spawn_interrupt_handler(interrupt.clone());

    match cli.command {
        None | Some(Commands::List) => handle_list(&ctx),
        Some(Commands::Shell) => run_shell(&mut ctx, &interrupt).await,
        Some(command) => dispatch(&mut ctx, command).await,
    }
}

/// The token Ctrl-C cancels. The shell swaps in a fresh one before each command.
type InterruptSlot = Arc<Mutex<CancellationToken>>;

fn spawn_interrupt_handler(slot: InterruptSlot) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling...".yellow());
            if let Ok(token) = slot.lock() {
                token.cancel();
            }
        }
    });
}

async fn dispatch(ctx: &mut AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::New { theme, context } => {
            handle_new(ctx, &theme, context.as_deref()).await
        }
        Commands::List => handle_list(ctx),
        Commands::Show { syllabus } => handle_show(ctx, &syllabus),
        Commands::Outline { syllabus, save } => handle_outline(ctx, &syllabus, save),
        Commands::Edit { syllabus, file } => handle_edit(ctx, &syllabus, &file),
        Commands::Delete { syllabus } => {
            let result = ctx.api.delete(&syllabus)?;
            print_messages(&result.messages);
            Ok(())
        }
        Commands::Lesson {
            syllabus,
            lesson,
            force,
        } => handle_lesson(ctx, &syllabus, lesson, force).await,
        Commands::Preview { syllabus, lesson } => {
            let result = ctx.api.preview(&syllabus, lesson)?;
            print_text(&result);
            Ok(())
        }
        Commands::Forget { syllabus, lesson } => {
            let result = ctx.api.forget_lesson(&syllabus, lesson)?;
            print_messages(&result.messages);
            Ok(())
        }
        Commands::Archive { syllabus, retry } => {
            handle_archive(ctx, &syllabus, retry).await
        }
        Commands::Ebook {
            syllabus,
            author,
            retry,
        } => handle_ebook(ctx, &syllabus, author.as_deref(), retry).await,
        Commands::Diagram { concept, save } => handle_diagram(ctx, &concept, save).await,
        Commands::Backup => {
            let result = ctx.api.backup(Local::now().date_naive())?;
            finish(ctx, &result)
        }
        Commands::Restore { file } => {
            let json = std::fs::read_to_string(&file)?;
            let result = ctx.api.restore(&json)?;
            print_messages(&result.messages);
            Ok(())
        }
        Commands::Shell => Err(CourseError::validation(
            "Already in an interactive session.",
        )),
        Commands::Config { key, value } => handle_config(ctx, key, value),
    }
}

fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("com", "courseforge", "courseforge")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            CourseError::validation(format!(
                "Could not determine a data directory; set {}",
                HOME_ENV
            ))
        })
}

fn api_key() -> Option<String> {
    API_KEY_ENVS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let data_dir = data_dir()?;
    let config = CourseConfig::load(&data_dir).unwrap_or_else(|e| {
        warn!("ignoring unreadable config: {}", e);
        CourseConfig::default()
    });
    debug!(data_dir = %data_dir.display(), "starting");

    let service = api_key()
        .map(|key| Box::new(GeminiClient::new(key, &config)) as Box<dyn GenerativeService>);
    let store = FileStore::new(data_dir.clone());
    let api = CourseApi::new(store, service, config, data_dir)?;

    Ok(AppContext {
        api,
        output: cli.output.clone(),
    })
}

async fn handle_new(ctx: &mut AppContext, theme: &str, context: Option<&str>) -> Result<()> {
    eprintln!("{}", "Generating syllabus...".dimmed());
    let result = ctx.api.create_syllabus(theme, context).await?;
    print_summaries(&result.summaries);
    print_messages(&result.messages);
    Ok(())
}

fn handle_list(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.list()?;
    print_summaries(&result.summaries);
    print_messages(&result.messages);
    Ok(())
}

const SHELL_PROMPT: &str = "courseforge> ";

/// Reads commands from stdin against one long-lived API, so the lesson cache lasts as long
/// as the session.
async fn run_shell(ctx: &mut AppContext, interrupt: &InterruptSlot) -> Result<()> {
    let interactive = std::io::stdin().is_terminal();
    if interactive {
        eprintln!(
            "{}",
            "Generated lessons stay cached until the session ends. Type help for commands, exit to leave."
                .dimmed()
        );
    }
    let default_output = ctx.output.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            print!("{}", SHELL_PROMPT);
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let words = match shell::split_words(&line) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        };
        match words.first().map(String::as_str) {
            None => continue,
            Some("exit" | "quit") => break,
            Some(_) => {}
        }
        let parsed = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        if let Ok(mut token) = interrupt.lock() {
            *token = ctx.api.renew_cancel_token();
        }
        ctx.output = parsed.output.unwrap_or_else(|| default_output.clone());
        debug!(command = ?parsed.command, "shell command");
        if let Err(e) = dispatch(ctx, parsed.command).await {
            eprintln!("Error: {}", e);
        }
    }
    Ok(())
}

fn handle_show(ctx: &AppContext, syllabus: &str) -> Result<()> {
    let result = ctx.api.show(syllabus)?;
    if let Some(view) = &result.view {
        print_view(view);
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_outline(ctx: &AppContext, syllabus: &str, save: bool) -> Result<()> {
    let result = ctx.api.outline(syllabus)?;
    print_text(&result);
    if save {
        write_artifacts(&ctx.output, &result.artifacts)?;
    }
    Ok(())
}

fn handle_edit(ctx: &mut AppContext, syllabus: &str, file: &Path) -> Result<()> {
    let markdown = if file == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(file)?
    };
    let result = ctx.api.edit_outline(syllabus, markdown)?;
    print_summaries(&result.summaries);
    print_messages(&result.messages);
    Ok(())
}

async fn handle_lesson(
    ctx: &mut AppContext,
    syllabus: &str,
    lesson: u32,
    force: bool,
) -> Result<()> {
    let sink = |status: &str| eprintln!("{}", status.dimmed());
    let result = ctx.api.lesson(syllabus, lesson, force, Some(&sink)).await?;
    finish(ctx, &result)
}

async fn handle_archive(ctx: &mut AppContext, syllabus: &str, retry: RetryArgs) -> Result<()> {
    let printer = spawn_progress_printer(ctx.api.subscribe_progress());
    let mut attempt = 0;
    let outcome = loop {
        match ctx.api.archive(syllabus).await {
            Err(e) if e.is_retryable() && attempt < retry.retries => {
                attempt += 1;
                wait_before_retry(ctx, &e, attempt, retry).await?;
            }
            other => break other,
        }
    };
    printer.abort();
    finish(ctx, &outcome?)
}

async fn handle_ebook(
    ctx: &mut AppContext,
    syllabus: &str,
    author: Option<&str>,
    retry: RetryArgs,
) -> Result<()> {
    let printer = spawn_progress_printer(ctx.api.subscribe_progress());
    let mut attempt = 0;
    let outcome = loop {
        match ctx.api.ebook(syllabus, author).await {
            Err(e) if e.is_retryable() && attempt < retry.retries => {
                attempt += 1;
                wait_before_retry(ctx, &e, attempt, retry).await?;
            }
            other => break other,
        }
    };
    printer.abort();
    finish(ctx, &outcome?)
}

/// Sleeps out the quota window; lessons finished so far are cached, so the re-run resumes.
async fn wait_before_retry(
    ctx: &AppContext,
    error: &CourseError,
    attempt: u32,
    retry: RetryArgs,
) -> Result<()> {
    eprintln!("{}", error.to_string().yellow());
    eprintln!(
        "{}",
        format!(
            "Retrying in {}s (attempt {} of {})...",
            retry.retry_delay, attempt, retry.retries
        )
        .dimmed()
    );
    let cancel = ctx.api.cancel_token();
    tokio::select! {
        _ = cancel.cancelled() => Err(CourseError::Cancelled),
        _ = tokio::time::sleep(Duration::from_secs(retry.retry_delay)) => Ok(()),
    }
}

fn spawn_progress_printer(mut progress: watch::Receiver<Option<BulkProgress>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            if let Some(p) = snapshot {
                eprintln!("{}", format_progress(&p).dimmed());
            }
        }
    })
}

fn format_progress(progress: &BulkProgress) -> String {
    if progress.current == 0 {
        return format!("[cover] {}", progress.status);
    }
    format!(
        "[{}/{}] {} - {}",
        progress.current, progress.total, progress.lesson_title, progress.status
    )
}

async fn handle_diagram(ctx: &AppContext, concept: &str, save: bool) -> Result<()> {
    let result = ctx.api.diagram(concept).await?;
    print_text(&result);
    if save {
        write_artifacts(&ctx.output, &result.artifacts)?;
    }
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(key), None) => ConfigAction::ShowKey(key),
        (Some(key), Some(value)) => ConfigAction::Set(key, value),
    };
    let result = ctx.api.config(action)?;
    if let (Some(config), true) = (&result.config, result.messages.is_empty()) {
        for key in CONFIG_KEYS {
            println!("{} = {}", key, config.get(key).unwrap_or_default());
        }
    }
    print_messages(&result.messages);
    Ok(())
}

/// Writes the result's files, then prints its messages.
fn finish(ctx: &AppContext, result: &CmdResult) -> Result<()> {
    write_artifacts(&ctx.output, &result.artifacts)?;
    print_messages(&result.messages);
    Ok(())
}

fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<()> {
    if artifacts.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    for artifact in artifacts {
        let path = dir.join(&artifact.filename);
        std::fs::write(&path, &artifact.bytes)?;
        println!("{} {}", "Saved".green(), path.display());
    }
    Ok(())
}

fn print_text(result: &CmdResult) {
    if let Some(text) = &result.text {
        println!("{}", text);
    }
    print_messages(&result.messages);
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

const LINE_WIDTH: usize = 100;
const ID_WIDTH: usize = 8;

fn print_summaries(summaries: &[SyllabusSummary]) {
    for summary in summaries {
        let index = format!("{:>3}. ", summary.position);
        let counts = format!(
            "{} mod, {} lessons, {} cached",
            summary.modules, summary.lessons, summary.cached
        );
        let short_id: String = summary.id.chars().take(ID_WIDTH).collect();

        let fixed = index.width() + counts.width() + ID_WIDTH + 4;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let theme = truncate_to_width(&summary.theme, available);
        let padding = available.saturating_sub(theme.width());

        println!(
            "{}{}{}  {}  {}",
            index.yellow(),
            theme.bold(),
            " ".repeat(padding),
            counts.dimmed(),
            short_id.dimmed()
        );
    }
}

fn print_view(view: &SyllabusView) {
    println!("{}", view.syllabus.theme.bold());
    if let Some(context) = &view.syllabus.context {
        println!("{}", context.dimmed());
    }
    for (m, module) in view.tree.modules.iter().enumerate() {
        println!();
        println!("{}", format!("Module {}: {}", m + 1, module.title).yellow());
        for lesson in &module.lessons {
            let marker = if view.cached.contains(&lesson.id) {
                "✓".green()
            } else {
                " ".normal()
            };
            println!("  {} {:>3}  {}", marker, lesson.id, lesson.title);
            if !lesson.objective.is_empty() {
                println!("         {}", lesson.objective.dimmed());
            }
            if !lesson.topics.is_empty() {
                println!("         {}", lesson.topics.join(", ").dimmed());
            }
        }
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}
