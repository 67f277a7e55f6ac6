use anyhow::Context;
use clap::{Parser, Subcommand};
use snow::areas::repository::Repository;
use snow::artifacts::commit::commit_writer::CommitOptions;
use snow::artifacts::objects::commit::UserData;
use snow::commands::porcelain::OutputFormat;
use snow::commands::porcelain::checkout::ChangePolicy;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
const LOG_ENV: &str = "SNOW_LOG";

#[derive(Parser)]
#[command(
    name = "snow",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Version control for large binary and graphic assets",
    long_about = "snow tracks working directories full of large binary files. \
    Snapshots are content addressed with SHA-256 and files that are still being \
    written by another program are refused instead of stored half-written.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(long, global = true, help = "Disable colored output")]
    no_color: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path. \
        The repository data can be kept outside the working directory by passing a commondir."
    )]
    Init {
        #[arg(index = 1, help = "The path to the working directory")]
        path: Option<PathBuf>,
        #[arg(index = 2, help = "Directory holding the repository data")]
        commondir: Option<PathBuf>,
    },
    #[command(
        name = "add",
        about = "Stage changes",
        long_about = "Stages new and modified files for addition and deleted files for deletion. \
        Use '*' for every change in the working directory or '.' for every change below the current directory."
    )]
    Add {
        #[arg(index = 1)]
        pattern: String,
        #[arg(long, help = "Index id, or 'create' for a new index")]
        index: Option<String>,
    },
    #[command(name = "rm", about = "Remove a file and stage its deletion")]
    Rm {
        #[arg(index = 1)]
        path: String,
        #[arg(long, help = "Index id, or 'create' for a new index")]
        index: Option<String>,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command creates a new commit from the staged changes of an index."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
        #[arg(long, help = "Commit even if nothing changed")]
        allow_empty: bool,
        #[arg(long, value_delimiter = ',', help = "Comma separated tags")]
        tags: Vec<String>,
        #[arg(long, help = "JSON object stored with the commit")]
        user_data: Option<String>,
        #[arg(long, help = "Index id, or 'create' for a new index")]
        index: Option<String>,
    },
    #[command(
        name = "branch",
        about = "List, create, or delete branches",
        long_about = "Without a name every branch is listed. With a name a branch is created at the \
        start point (HEAD when omitted), or deleted with --delete."
    )]
    Branch {
        #[arg(index = 1)]
        name: Option<String>,
        #[arg(index = 2, help = "Commit hash, branch name or HEAD")]
        start_point: Option<String>,
        #[arg(short, long, help = "Delete the branch")]
        delete: bool,
        #[arg(long, help = "JSON object stored with the branch")]
        user_data: Option<String>,
    },
    #[command(
        name = "checkout",
        about = "Check out a commit",
        long_about = "Moves the working directory to the given commit and detaches HEAD. \
        Branches are checked out with 'snow switch'."
    )]
    Checkout {
        #[arg(index = 1)]
        target: String,
        #[arg(long, help = "Discard local changes")]
        discard_changes: bool,
        #[arg(short, long, help = "Keep local changes")]
        keep_changes: bool,
    },
    #[command(name = "switch", about = "Switch to a branch")]
    Switch {
        #[arg(index = 1)]
        target: String,
        #[arg(long, help = "Discard local changes")]
        discard_changes: bool,
        #[arg(short, long, help = "Keep local changes")]
        keep_changes: bool,
        #[arg(short, long, help = "Detach HEAD at the branch's commit")]
        detach: bool,
    },
    #[command(name = "status", about = "Show the working directory status")]
    Status {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
        #[arg(long, help = "Index id")]
        index: Option<String>,
    },
    #[command(name = "log", about = "Show the commit history of every branch")]
    Log {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
        #[arg(short, long, help = "Show tags, user data and files")]
        verbose: bool,
    },
    #[command(name = "index", about = "Manage staging indexes")]
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    #[command(name = "create", about = "Create a new index")]
    Create,
}

fn parse_user_data(raw: Option<&str>) -> anyhow::Result<UserData> {
    raw.map_or_else(
        || Ok(UserData::new()),
        |raw| serde_json::from_str(raw).context("--user-data must be a JSON object"),
    )
}

fn open_repository() -> anyhow::Result<(Repository, PathBuf)> {
    let cwd = std::env::current_dir()?.canonicalize()?;
    let repository = Repository::open(&cwd)?.with_writer(Box::new(std::io::stdout()));

    Ok((repository, cwd))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { path, commondir } => {
            let path = match path {
                Some(path) => path,
                None => std::env::current_dir()?,
            };
            Repository::init(&path, commondir.as_deref(), Box::new(std::io::stdout()))?;
        }
        Commands::Add { pattern, index } => {
            let (repository, cwd) = open_repository()?;
            repository.stage(&pattern, &cwd, index.as_deref()).await?
        }
        Commands::Rm { path, index } => {
            let (repository, cwd) = open_repository()?;
            repository.remove(&path, &cwd, index.as_deref())?
        }
        Commands::Commit {
            message,
            allow_empty,
            tags,
            user_data,
            index,
        } => {
            let (repository, _) = open_repository()?;
            repository
                .commit(
                    &message,
                    CommitOptions { allow_empty },
                    tags,
                    parse_user_data(user_data.as_deref())?,
                    index.as_deref(),
                )
                .await?
        }
        Commands::Branch {
            name,
            start_point,
            delete,
            user_data,
        } => {
            let (repository, _) = open_repository()?;
            repository.branch(
                name.as_deref(),
                start_point.as_deref(),
                delete,
                parse_user_data(user_data.as_deref())?,
            )?
        }
        Commands::Checkout {
            target,
            discard_changes,
            keep_changes,
        } => {
            let (repository, _) = open_repository()?;
            let policy = ChangePolicy {
                discard_changes,
                keep_changes,
            };
            repository.checkout_commit(&target, policy).await?
        }
        Commands::Switch {
            target,
            discard_changes,
            keep_changes,
            detach,
        } => {
            let (repository, _) = open_repository()?;
            let policy = ChangePolicy {
                discard_changes,
                keep_changes,
            };
            repository.switch(&target, policy, detach).await?
        }
        Commands::Status { output, index } => {
            let (repository, _) = open_repository()?;
            repository.status(output, index.as_deref()).await?
        }
        Commands::Log { output, verbose } => {
            let (repository, _) = open_repository()?;
            repository.log(output, verbose)?
        }
        Commands::Index {
            action: IndexAction::Create,
        } => {
            let (repository, _) = open_repository()?;
            repository.index_create()?
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}
