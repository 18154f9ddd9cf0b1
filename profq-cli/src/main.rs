mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use profq::config::{default_config_path, load_config};
use profq::error::ConfigError;
use profq::{Config, JobLifecycleManager, Principal, ProfqError};

use commands::emit;

#[derive(Parser)]
#[command(
    name = "profq",
    version,
    about = "Queue SMTP profiling and blocklist ping jobs"
)]
struct Cli {
    /// Config file; defaults to <config dir>/profq/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print an {success, data, error} JSON envelope instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Whose jobs to work on
    principal: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a list of domains or addresses for profiling
    Submit {
        /// Read the list from this file instead
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Domains or addresses; stdin is read when none are given
        text: Vec<String>,
    },
    /// Submit domains for a blocklist ping
    Ping {
        #[arg(required = true)]
        domains: Vec<String>,
        /// Retries per domain
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..100))]
        retry: Option<u32>,
        /// Pause between domains, in milliseconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(0..10000))]
        pause: Option<u64>,
    },
    /// List queued, running and completed jobs
    List,
    /// Show the progress of one job
    Progress { stem: String },
    /// Delete every artifact of the given jobs
    Delete {
        #[arg(required = true)]
        stems: Vec<String>,
    },
    /// Show the scheduler's pending queue
    Pending,
    /// Cancel pending scheduler tickets
    Cancel {
        #[arg(required = true)]
        tickets: Vec<String>,
    },
    /// Remove state left behind by interrupted jobs
    Reconcile,
    /// Show the domains on the blocklist hit list
    HitList,
}

fn init_logging(verbose: bool) {
    tracing_log::LogTracer::init().ok();

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(explicit: Option<PathBuf>) -> Result<Config, ProfqError> {
    let path = match explicit.or_else(default_config_path) {
        Some(path) => path,
        None => {
            return Err(ConfigError::Validation {
                message: "no --config given and no platform config directory".to_string(),
            }
            .into())
        }
    };

    debug!("Loading config from {:?}", path);
    Ok(load_config(&path)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("profq v{}", env!("CARGO_PKG_VERSION"));

    let setup = resolve_config(cli.config).and_then(|config| {
        let principal = Principal::new(cli.principal)?;
        Ok((JobLifecycleManager::with_at_scheduler(config), principal))
    });
    let (manager, principal) = match setup {
        Ok(setup) => setup,
        Err(e) => return emit::<()>(cli.json, Err(e)),
    };

    let json = cli.json;
    match cli.command {
        Command::Submit { file, text } => emit(
            json,
            commands::submit::submit(&manager, &principal, file, text).await,
        ),
        Command::Ping {
            domains,
            retry,
            pause,
        } => emit(
            json,
            commands::submit::ping(&manager, &principal, domains, retry, pause).await,
        ),
        Command::List => emit(json, commands::jobs::list(&manager, &principal)),
        Command::Progress { stem } => {
            emit(json, commands::jobs::progress(&manager, &principal, stem))
        }
        Command::Delete { stems } => {
            emit(json, commands::jobs::delete(&manager, &principal, &stems))
        }
        Command::Pending => emit(json, commands::queue::pending(&manager).await),
        Command::Cancel { tickets } => emit(json, commands::queue::cancel(&manager, tickets).await),
        Command::Reconcile => emit(json, commands::jobs::reconcile(&manager, &principal).await),
        Command::HitList => emit(json, commands::jobs::hit_list(&manager, &principal)),
    }
}
