use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use exam_core::model::{ExamId, Question, UserId};
use services::{
    Clock, ResultHistoryService, SessionCommand, SessionEngine, SessionEvent, SessionRun,
    format_clock, run_session,
};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingExam,
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingExam => write!(f, "take requires --exam <id>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take    --exam <id> [--db <sqlite_url>] [--user <id>] [--config <path>]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--user <id>] [--config <path>]");
    eprintln!();
    eprintln!("During an exam:");
    eprintln!("  1..9   answer the current question");
    eprintln!("  n / p  next / previous question");
    eprintln!("  g <k>  go to question k");
    eprintln!("  s      mark or unmark the current question as favorite");
    eprintln!("  f      finish now");
    eprintln!("  q      leave without finishing (progress is kept)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DATABASE_URL, EXAM_USER_ID, EXAM_AUTOSAVE_PERIOD_SECS,");
    eprintln!("  EXAM_RESUME_FROM_CHECKPOINT, EXAM_RECORD_MISTAKES, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    exam_id: Option<ExamId>,
    db_url: Option<String>,
    user_id: Option<String>,
    config_path: Option<PathBuf>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--exam" => {
                    let value = require_value(args, "--exam")?;
                    let exam_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidExamId { raw: value.clone() })?;
                    parsed.exam_id = Some(exam_id);
                }
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--user" => parsed.user_id = Some(require_value(args, "--user")?),
                "--config" => parsed.config_path = Some(require_value(args, "--config")?.into()),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── TERMINAL ──────────────────────────────────────────────────────────────────
//

/// Parse one input line into a session command. `Err` carries a message for the user.
fn parse_input(line: &str) -> Result<SessionCommand, String> {
    let mut parts = line.split_whitespace();
    let head = parts.next().ok_or_else(|| "empty input".to_string())?;
    match head {
        "n" => Ok(SessionCommand::Navigate(1)),
        "p" => Ok(SessionCommand::Navigate(-1)),
        "f" => Ok(SessionCommand::Finish),
        "s" => Ok(SessionCommand::ToggleFavoriteCurrent),
        "q" => Ok(SessionCommand::Abandon),
        "g" => {
            let k: usize = parts
                .next()
                .and_then(|raw| raw.parse().ok())
                .filter(|k| *k > 0)
                .ok_or_else(|| "usage: g <question number>".to_string())?;
            Ok(SessionCommand::JumpTo(k - 1))
        }
        choice => match choice.parse::<usize>() {
            Ok(n) if n > 0 => Ok(SessionCommand::Choose(n - 1)),
            _ => Err(format!("unknown command: {choice}")),
        },
    }
}

fn print_question(questions: &[Question], index: usize) {
    let Some(question) = questions.get(index) else {
        return;
    };
    println!();
    println!("Question {}/{}", index + 1, questions.len());
    println!("  {}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}) {}", i + 1, option.label);
    }
}

/// Print session events as they arrive.
async fn print_events(questions: Vec<Question>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Tick { remaining_seconds } => {
                if remaining_seconds % 10 == 0 && remaining_seconds > 0 {
                    println!("[{}]", format_clock(remaining_seconds));
                }
            }
            SessionEvent::Answered {
                question_id,
                option_id,
            } => println!("answered {question_id}: {option_id}"),
            SessionEvent::AnswerRejected { reason } => println!("not accepted: {reason}"),
            SessionEvent::Navigated { index } => print_question(&questions, index),
            SessionEvent::FavoriteToggled {
                question_id,
                favorite: true,
            } => println!("added {question_id} to favorites"),
            SessionEvent::FavoriteToggled {
                question_id,
                favorite: false,
            } => println!("removed {question_id} from favorites"),
            SessionEvent::FavoriteFailed { reason } => eprintln!("favorite not saved: {reason}"),
            SessionEvent::Checkpoint { .. } => {}
            SessionEvent::CheckpointFailed { reason } => {
                eprintln!("progress could not be saved: {reason}");
            }
            SessionEvent::Expired => println!("time is up"),
            SessionEvent::Finished { result, .. } => {
                let score = result.score();
                println!(
                    "score {}/{} ({} wrong or blank, {}%, {:?})",
                    score.correct(),
                    score.total(),
                    score.wrong_or_blank(),
                    score.percent(),
                    score.verdict()
                );
            }
            SessionEvent::ResultWriteFailed { reason, .. } => {
                eprintln!("result could not be saved: {reason}");
            }
            _ => {}
        }
    }
}

async fn take_exam(
    engine: &SessionEngine,
    exam_id: &ExamId,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = engine.start_session(exam_id).await?;
    let questions = controller.questions().to_vec();
    println!(
        "{} ({} questions, {} left)",
        controller.exam().title(),
        questions.len(),
        format_clock(controller.state().remaining_seconds())
    );
    print_question(&questions, controller.state().current_question_index());

    let (commands_tx, commands_rx) = mpsc::channel(16);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(questions, events_rx));

    let mut commands = Some(commands_tx);
    let session = run_session(controller, commands_rx, events_tx);
    tokio::pin!(session);

    let (mut controller, run) = loop {
        tokio::select! {
            done = &mut session => break done,
            line = lines.next_line(), if commands.is_some() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_input(&line) {
                    Ok(command) => {
                        if let Some(tx) = &commands {
                            let _ = tx.send(command).await;
                        }
                    }
                    Err(message) => eprintln!("{message}"),
                },
                Ok(None) | Err(_) => {
                    commands = None;
                }
            },
        }
    };
    let _ = printer.await;

    match run {
        SessionRun::Finished(_) => println!("result saved"),
        SessionRun::Abandoned => println!("left the exam; progress is kept"),
        SessionRun::ResultUnsaved(_) => {
            println!("retry saving the result? [y/N]");
            let answer = lines.next_line().await?.unwrap_or_default();
            if answer.trim().eq_ignore_ascii_case("y") {
                controller.retry_result_write().await?;
                println!("result saved");
            }
        }
    }
    Ok(())
}

async fn show_history(
    history: &ResultHistoryService,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let results = history.recent_results(user_id, 20).await?;
    if results.is_empty() {
        println!("no results yet");
    }
    for item in &results {
        println!(
            "{}  {:<16} {}/{} ({}%, {:?})",
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.exam_id,
            item.correct,
            item.total,
            item.percent,
            item.verdict
        );
    }

    let mistakes = history.wrong_summary(user_id).await?;
    if !mistakes.is_empty() {
        println!();
        println!("most missed:");
    }
    for mistake in &mistakes {
        println!(
            "  {} / {}  x{}  last {}",
            mistake.exam_id,
            mistake.question_id,
            mistake.count,
            mistake.last_attempt.format("%Y-%m-%d")
        );
    }

    let favorites = history.favorites(user_id).await?;
    if !favorites.is_empty() {
        println!();
        println!("favorites:");
    }
    for favorite in &favorites {
        println!(
            "  {} / {}  added {}",
            favorite.exam_id,
            favorite.question_id,
            favorite.added_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = Config::load_from(parsed.config_path.as_deref())?;
    tracing::debug!(?config, "loaded configuration");
    if let Some(db_url) = parsed.db_url {
        config.database_url = db_url;
    }
    if let Some(user_id) = parsed.user_id {
        config.user_id = user_id;
    }
    let user_id = config.user()?;
    let db_url = normalize_sqlite_url(config.database_url.clone());

    // Open + migrate SQLite at startup. Keep this in the binary glue so services stay pure.
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;

    match cmd {
        Command::Take => {
            let exam_id = parsed.exam_id.ok_or(ArgsError::MissingExam)?;
            let engine = SessionEngine::from_storage(
                Clock::System,
                config.session_settings()?,
                &storage,
                Arc::new(user_id),
            );
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            take_exam(&engine, &exam_id, &mut lines).await
        }
        Command::History => {
            let history = ResultHistoryService::new(
                Arc::clone(&storage.results),
                Arc::clone(&storage.mistakes),
                Arc::clone(&storage.favorites),
            );
            show_history(&history, &user_id).await
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
