use std::{path::PathBuf, str::FromStr, sync::Arc};

use clap::Parser;
use langprogress::{
    config::Config,
    notify::LogNotifier,
    outline::{CourseOutline, GlobalPage, Module},
    service::{ProgressService, ValidateKind, ValidateRequest},
    store::SqliteProgressStore,
    student::{create_student, delete_student, get_student, get_student_list, sign_token},
    utils::init_log,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[derive(Debug, clap::Parser)]
#[command(author, version, about = "Operator tooling for the progress database")]
struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides `database_url`
    #[arg(short, long)]
    database: Option<String>,
    /// Overrides `outline_path`
    #[arg(short, long)]
    outline: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Inspect or correct one student's progress. Corrections do not mail the student.
    Progress {
        id: i64,
        #[arg(short, long, default_value = "A")]
        module: Module,
        #[command(subcommand)]
        command: ProgressCommand,
    },
    Outline {
        #[command(subcommand)]
        command: OutlineCommand,
    },
}

#[derive(Debug, clap::Subcommand)]
enum UserCommand {
    List,
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
    },
    Delete {
        id: i64,
    },
    /// Print an `auth-token` cookie value for a student
    Token {
        id: i64,
        #[arg(long, default_value = "30")]
        days: i64,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ProgressCommand {
    Show,
    AddPage { page: GlobalPage },
    RemovePage { page: GlobalPage },
    AddQuiz { chapter: u32 },
    RemoveQuiz { chapter: u32 },
}

#[derive(Debug, clap::Subcommand)]
enum OutlineCommand {
    /// Validate the course file and print its page layout
    Check,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _guard = match init_log(None) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e:?}");
            return;
        }
    };
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("{:?}", e);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database_url = database;
    }
    if let Some(outline) = args.outline {
        config.outline_path = outline;
    }

    match args.command {
        Commands::Outline {
            command: OutlineCommand::Check,
        } => {
            let outline = CourseOutline::load(&config.outline_path)?;
            print_outline(&outline);
        }
        Commands::User { command } => {
            let store = open_store(&config).await?;
            let database = store.database();
            match command {
                UserCommand::List => {
                    for student in get_student_list(database).await? {
                        println!("{:<8} {:<24} {}", student.id, student.name, student.email);
                    }
                }
                UserCommand::Create { name, email } => {
                    let id = create_student(database, &name, &email).await?;
                    println!("Student created with id: {}", id);
                }
                UserCommand::Delete { id } => {
                    if delete_student(database, id).await? {
                        println!("Student deleted with id: {}", id);
                    } else {
                        println!("No student with id: {}", id);
                    }
                }
                UserCommand::Token { id, days } => {
                    if get_student(database, id).await?.is_none() {
                        anyhow::bail!("no student with id {id}");
                    }
                    let secret = Config::jwt_secret()?;
                    println!(
                        "{}",
                        sign_token(secret.as_bytes(), id, time::Duration::days(days))?
                    );
                }
            }
        }
        Commands::Progress {
            id,
            module,
            command,
        } => {
            let outline = Arc::new(CourseOutline::load(&config.outline_path)?);
            let store = open_store(&config).await?;
            let service = ProgressService::new(outline, Arc::new(store), Arc::new(LogNotifier));
            let (kind, page_number, chapter_number) = match command {
                ProgressCommand::Show => {
                    let summary = service.summary(id, module).await?;
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    return Ok(());
                }
                ProgressCommand::AddPage { page } => (ValidateKind::Page, Some(page), None),
                ProgressCommand::RemovePage { page } => {
                    (ValidateKind::RemovePage, Some(page), None)
                }
                ProgressCommand::AddQuiz { chapter } => (ValidateKind::Quiz, None, Some(chapter)),
                ProgressCommand::RemoveQuiz { chapter } => {
                    (ValidateKind::RemoveQuiz, None, Some(chapter))
                }
            };
            let response = service
                .validate(
                    id,
                    ValidateRequest {
                        kind,
                        page_number,
                        chapter_number,
                        module,
                    },
                )
                .await?;
            println!("{}", response.message);
            if let Some(chapter) = response.chapter_completed {
                println!("Chapter {} is now complete", chapter);
            }
        }
    }
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<SqliteProgressStore> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let store = SqliteProgressStore::new(SqlitePoolOptions::new().connect_with(options).await?);
    store.migrate().await?;
    Ok(store)
}

fn print_outline(outline: &CourseOutline) {
    for chapter in outline.chapters() {
        let module = chapter
            .module
            .map_or("shared".to_string(), |m| m.to_string());
        let pages: Vec<_> = outline.chapter_pages(chapter).collect();
        println!(
            "{:<4} {:<32} {:<7} pages {:?}{}",
            chapter.number,
            chapter.display_title(),
            module,
            pages,
            if chapter.has_quiz() { " + quiz" } else { "" }
        );
    }
    for module in Module::ALL {
        println!(
            "module {}: {} chapters",
            module,
            outline.chapters_in(module).count()
        );
    }
    println!(
        "{} lessons, {} quizzes",
        outline.total_lessons(),
        outline.total_quizzes()
    );
}
