mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use migration::entities::todos::{ActiveModel as TodoActiveModel, TagList};
use migration::entities::Todos;
use migration::Migrator;
use sealite::{
    Facade, FacadeConfig, FacadeError, MigrationCommand, QueryBuildable, Storage,
    DEFAULT_BATCH_SIZE,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Clone, Copy, ValueEnum)]
enum MigrateArg {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

impl From<MigrateArg> for MigrationCommand {
    fn from(arg: MigrateArg) -> Self {
        match arg {
            MigrateArg::Up => MigrationCommand::Up,
            MigrateArg::Down => MigrationCommand::Down,
            MigrateArg::Fresh => MigrationCommand::Fresh,
            MigrateArg::Reset => MigrationCommand::Reset,
            MigrateArg::Refresh => MigrationCommand::Refresh,
            MigrateArg::Status => MigrationCommand::Status,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run a migrator command
    Migrate {
        #[arg(value_enum)]
        command: MigrateArg,
    },
    /// Print defined and applied migrations
    Status,
    /// Insert generated todos
    Seed {
        #[arg(long, default_value_t = 100)]
        count: usize,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long, default_value = "Todo")]
        prefix: String,
    },
    /// Delete every todo
    Purge {
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Print the number of todos
    Count,
}

#[derive(Parser)]
#[command(name = "sealite")]
#[command(about = "Pooled SQLite maintenance tool")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "SEALITE_DB_PATH", default_value = "sealite.db")]
    db: String,

    /// Worker threads and execution lanes (defaults to the CPU count)
    #[arg(long, env = "SEALITE_THREADS")]
    threads: Option<usize>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    telemetry::init_tracing(cli.json_logs);

    if cli.db.trim() == ":memory:" {
        eprintln!("❌ SQLite in-memory databases are not supported for CLI operations.");
        eprintln!();
        eprintln!("Reason: each CLI invocation would create a fresh database that is destroyed");
        eprintln!("when the command completes, so nothing it does would be kept.");
        eprintln!();
        eprintln!("Example: sealite --db ./todos.db migrate up");
        return ExitCode::from(EXIT_USAGE);
    }

    // SEALITE_* knobs first, flags on top
    let mut config = match FacadeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    config.database.storage = Storage::File(PathBuf::from(&cli.db));
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }

    let facade = match Facade::new(config).await {
        Ok(facade) => facade,
        Err(e @ FacadeError::Config { .. }) => {
            eprintln!("❌ {e}");
            return ExitCode::from(EXIT_USAGE);
        }
        Err(e) => {
            eprintln!("❌ failed to open {}: {e}", cli.db);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let result = run(&facade, cli.command).await;
    facade.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(facade: &Facade, command: Command) -> Result<(), FacadeError> {
    match command {
        Command::Migrate { command } => facade.migrate::<Migrator>(command.into()).await,
        Command::Status => {
            let status = facade.migration_status::<Migrator>().await?;
            println!(
                "backend={} database={} defined={} applied={} latest={}",
                status.backend,
                status.database,
                status.defined,
                status.applied,
                status.latest.as_deref().unwrap_or("<none>")
            );
            Ok(())
        }
        Command::Seed {
            count,
            batch_size,
            prefix,
        } => {
            let todos: Vec<TodoActiveModel> = (0..count)
                .map(|n| TodoActiveModel::create(format!("{prefix} #{n}"), TagList::default()))
                .collect();
            let saved = facade.save_batch(todos, batch_size).await?;
            println!("seeded {saved} todo(s)");
            Ok(())
        }
        Command::Purge { batch_size } => {
            let deleted = facade.delete_all::<Todos>(batch_size).await?;
            println!("deleted {deleted} todo(s)");
            Ok(())
        }
        Command::Count => {
            let count = facade.count(facade.query::<Todos>()).await?;
            println!("{count}");
            Ok(())
        }
    }
}
