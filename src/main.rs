//! EduBridge - offline-first study companion
//!
//! Command-line front end over the local study store and the backend shim.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use edubridge::api::{ApiGateway, AuthStub, NoteUpload, Role};
use edubridge::models::{Language, PreferencesUpdate, ThemePreference};
use edubridge::{Config, LocalStore, StudyActions};

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "edubridge")]
#[command(author, version, about = "Offline-first study companion", long_about = None)]
struct Args {
    /// Directory holding the local store
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of the default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never contact the backend
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a local session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        password: String,
        #[arg(long, value_enum, default_value_t = Role::Student)]
        role: Role,
    },
    /// End the local session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Ask the AI tutor a question
    Ask { question: String },
    /// Chat history
    #[command(subcommand)]
    Chat(ChatCommand),
    /// Wellness check-ins
    #[command(subcommand)]
    Wellness(WellnessCommand),
    /// Turn a photo of notes into flashcards and a knowledge map
    Notes { file: PathBuf },
    /// Flashcards
    #[command(subcommand)]
    Flashcards(FlashcardCommand),
    /// Quizzes
    #[command(subcommand)]
    Quiz(QuizCommand),
    /// Engagement metrics for teachers
    Engagement,
    /// Show or change preferences
    Prefs(PrefsArgs),
    /// Toggle offline mode
    Offline {
        #[arg(value_parser = clap::builder::BoolishValueParser::new())]
        enabled: Option<bool>,
    },
    /// Export all local data to a JSON file
    Export { path: Option<PathBuf> },
    /// Import a previously exported JSON file
    Import { path: PathBuf },
    /// Delete all local study data
    Clear {
        /// Skip the confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Storage usage and item counts
    Usage,
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ChatCommand {
    History,
    Clear,
}

#[derive(Subcommand, Debug)]
enum WellnessCommand {
    /// Submit how you feel
    Check { text: String },
    /// Check-ins from the last 30 days
    History {
        /// Include everything, not just the last 30 days
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FlashcardCommand {
    List,
    Add {
        question: String,
        answer: String,
        #[arg(long)]
        subject: Option<String>,
    },
    Remove { id: String },
    Review { id: String },
    /// Knowledge maps built from processed notes
    Maps,
}

#[derive(Subcommand, Debug)]
enum QuizCommand {
    /// Fetch quizzes from the backend into local storage
    Sync,
    List,
    /// Submit answers as QUESTION=OPTION pairs
    Submit {
        quiz_id: String,
        #[arg(value_parser = parse_answer)]
        answers: Vec<(String, usize)>,
    },
    Remove { id: String },
}

#[derive(ClapArgs, Debug)]
struct PrefsArgs {
    #[arg(long, value_enum)]
    language: Option<Language>,
    #[arg(long, value_enum)]
    theme: Option<ThemePreference>,
    #[arg(long)]
    notifications: Option<bool>,
    #[arg(long)]
    auto_sync: Option<bool>,
}

fn parse_answer(raw: &str) -> Result<(String, usize), String> {
    let (question, option) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=OPTION, got {:?}", raw))?;
    let option = option
        .parse()
        .map_err(|_| format!("option must be a number, got {:?}", option))?;
    Ok((question.to_string(), option))
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edubridge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default(&config_path),
    };
    config.apply_overrides(|name| std::env::var(name).ok());
    if args.mock {
        config.use_mock_data = true;
    }

    let data_dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir());
    let store = LocalStore::open(data_dir, config.quota_bytes);
    if !store.is_available() {
        eprintln!("⚠ Local storage is unavailable; changes will not be saved");
    }

    let auth = AuthStub::new(store.medium());
    let gateway = ApiGateway::new(config.api_config(), auth).context("Failed to build HTTP client")?;
    let actions = StudyActions::new(store, gateway);

    run(args.command, &actions, &config, &config_path).await
}

async fn run(
    command: Command,
    actions: &StudyActions,
    config: &Config,
    config_path: &Path,
) -> Result<()> {
    let store = actions.store();
    let auth = actions.gateway().auth();

    match command {
        Command::Login {
            email,
            password,
            role,
        } => {
            if email.trim().is_empty() {
                bail!("email must not be empty");
            }
            let response = auth.login(email.trim(), &password, role);
            println!("✓ Logged in as {} ({})", response.user.email, response.user.role);
        }
        Command::Logout => {
            auth.logout();
            println!("✓ Logged out");
        }
        Command::Whoami => match auth.current_user() {
            Some(user) => println!("{} ({})", user.email, user.role),
            None => println!("Not logged in"),
        },
        Command::Ask { question } => {
            let (_, reply) = actions.ask_tutor(&question).await?;
            println!("{}", reply.message);
        }
        Command::Chat(ChatCommand::History) => {
            for message in store.chat.get_all() {
                println!(
                    "[{}] {:?}: {}",
                    message.timestamp.format("%Y-%m-%d %H:%M"),
                    message.sender,
                    message.message
                );
            }
        }
        Command::Chat(ChatCommand::Clear) => {
            report(store.chat.clear(), "Cleared chat history");
        }
        Command::Wellness(WellnessCommand::Check { text }) => {
            let record = actions.check_wellness(&text).await?;
            println!(
                "Stress: {}  Score: {}/100\n{}",
                record.stress_level.name(),
                record.wellness_score,
                record.suggestion
            );
        }
        Command::Wellness(WellnessCommand::History { all }) => {
            let records = if all {
                store.wellness.get_all()
            } else {
                store.wellness.last_30_days()
            };
            for record in records {
                println!(
                    "{}  {:>3}  {:<7}  {}",
                    record.timestamp.format("%Y-%m-%d"),
                    record.wellness_score,
                    record.stress_level.name(),
                    record.text
                );
            }
        }
        Command::Notes { file } => {
            let upload = NoteUpload::from_path(&file)?;
            let import = actions.process_notes(upload).await;
            println!(
                "✓ Generated {} flashcards{}",
                import.flashcards.len(),
                if import.knowledge_map.is_some() {
                    " and a knowledge map"
                } else {
                    ""
                }
            );
            if let Some(summary) = &import.notes.summary {
                println!("\n{}", summary);
            }
        }
        Command::Flashcards(cmd) => flashcards(cmd, actions).await?,
        Command::Quiz(cmd) => quiz(cmd, actions).await,
        Command::Engagement => {
            let report = actions.gateway().student_engagement().await;
            println!("{}", serde_json::to_string_pretty(&report.engagement)?);
        }
        Command::Prefs(prefs) => {
            let update = PreferencesUpdate {
                language: prefs.language,
                theme: prefs.theme,
                notifications: prefs.notifications,
                auto_sync: prefs.auto_sync,
            };
            if !update.is_empty() {
                report(store.preferences.set(update), "Saved preferences");
            }
            let current = store.preferences.get();
            println!("language       {}", current.language.display_name());
            println!("theme          {:?}", current.theme);
            println!("notifications  {}", current.notifications);
            println!("auto sync      {}", current.auto_sync);
        }
        Command::Offline { enabled } => {
            if let Some(enabled) = enabled {
                report(store.offline.set_offline_mode(enabled), "Updated offline mode");
            }
            println!(
                "Offline mode is {}",
                if store.offline.is_offline_mode() { "on" } else { "off" }
            );
        }
        Command::Export { path } => {
            let path = path.unwrap_or_else(LocalStore::default_export_path);
            let data = store.export_to_file(&path)?;
            println!(
                "✓ Exported {} flashcards, {} quizzes, {} wellness records to {:?}",
                data.flashcards.len(),
                data.quizzes.len(),
                data.wellness_records.len(),
                path
            );
        }
        Command::Import { path } => {
            let ok = store.import_from_file(&path)?;
            report(ok, "Imported data");
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete local data without --yes");
            }
            report(store.clear_all(), "Cleared all local data");
        }
        Command::Usage => {
            let summary = store.summary();
            println!("Items          {}", summary.total_items());
            println!("  flashcards   {}", summary.flashcards);
            println!("  quizzes      {}", summary.quizzes);
            println!("  wellness     {}", summary.wellness_records);
            println!("  chat         {}", summary.chat_messages);
            println!("  maps         {}", summary.knowledge_maps);
            println!("Storage        {:.2} MB", summary.usage_mb);
            match store.sync.last_sync() {
                Some(time) => println!("Last sync      {}", time.format("%Y-%m-%d %H:%M")),
                None => println!("Last sync      never"),
            }
            if summary.quota_warning {
                println!("⚠ Storage is nearly full; export and clear old data");
            }
        }
        Command::Config { write } => {
            print!("{}", toml::to_string_pretty(config)?);
            if write {
                config.save_to(config_path)?;
                println!("✓ Wrote {:?}", config_path);
            }
        }
    }

    Ok(())
}

async fn flashcards(cmd: FlashcardCommand, actions: &StudyActions) -> Result<()> {
    let store = actions.store();

    match cmd {
        FlashcardCommand::List => {
            for card in store.flashcards.get_all() {
                let reviewed = card
                    .last_reviewed
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}  [{}] {} → {}  (reviewed {})",
                    card.id,
                    card.subject.as_deref().unwrap_or("-"),
                    card.question,
                    card.answer,
                    reviewed
                );
            }
        }
        FlashcardCommand::Add {
            question,
            answer,
            subject,
        } => {
            let card = actions
                .create_flashcard(&question, &answer, subject.as_deref())
                .await?;
            println!("✓ Added flashcard {}", card.id);
        }
        FlashcardCommand::Remove { id } => {
            report(store.flashcards.remove(&id), "Removed flashcard");
        }
        FlashcardCommand::Review { id } => {
            report(actions.review_flashcard(&id), "Marked as reviewed");
        }
        FlashcardCommand::Maps => {
            for map in store.knowledge_maps.get_all() {
                let nodes: usize = map.graphs.iter().map(|g| g.nodes.len()).sum();
                println!(
                    "{}  {}  {} graphs, {} nodes",
                    map.id,
                    map.subject,
                    map.graphs.len(),
                    nodes
                );
            }
        }
    }

    Ok(())
}

async fn quiz(cmd: QuizCommand, actions: &StudyActions) {
    let store = actions.store();

    match cmd {
        QuizCommand::Sync => {
            let quizzes = actions.sync_quizzes().await;
            println!("✓ Synced {} quizzes", quizzes.len());
        }
        QuizCommand::List => {
            for quiz in store.quizzes.get_all() {
                println!("{}  {}  ({} questions)", quiz.id, quiz.title, quiz.questions.len());
                for (i, q) in quiz.questions.iter().enumerate() {
                    println!("    {}. [{}] {}", i + 1, q.id, q.question);
                    for (j, option) in q.options.iter().enumerate() {
                        println!("         {}) {}", j, option);
                    }
                }
            }
        }
        QuizCommand::Submit { quiz_id, answers } => {
            let answers: BTreeMap<String, usize> = answers.into_iter().collect();
            let result = actions.submit_quiz(&quiz_id, &answers).await;
            println!("Score: {}/{}", result.score, result.total_questions);
        }
        QuizCommand::Remove { id } => {
            report(store.quizzes.remove(&id), "Removed quiz");
        }
    }
}

fn report(ok: bool, message: &str) {
    if ok {
        println!("✓ {}", message);
    } else {
        eprintln!("✗ {} failed; see logs", message);
    }
}
