use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use fleet_protocol::logs::{LogQueryRequest, Severity};
use tracing_subscriber::EnvFilter;

mod client;

use client::{print_pushed, print_stream_error, CliError, ControllerClient, PushRecord};

const DEFAULT_CONTROLLER_URL: &str = "http://127.0.0.1:17070";

#[derive(Parser)]
#[command(name = "fleet")]
#[command(about = "Fleet controller log client", long_about = None)]
struct Cli {
    #[arg(long, global = true, env = "FLEET_CONTROLLER_URL")]
    controller: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream log lines from the controller
    DebugLog(DebugLogArgs),
    /// Push one log record to the controller
    Log(LogArgs),
    /// Show version information
    Version,
}

#[derive(Args)]
struct DebugLogArgs {
    /// Only show records from these entities (`*` wildcards allowed)
    #[arg(long = "include")]
    include_entity: Vec<String>,
    /// Hide records from these entities
    #[arg(long = "exclude")]
    exclude_entity: Vec<String>,
    #[arg(long)]
    include_module: Vec<String>,
    #[arg(long)]
    exclude_module: Vec<String>,
    #[arg(long)]
    include_label: Vec<String>,
    #[arg(long)]
    exclude_label: Vec<String>,
    /// Minimum severity to show
    #[arg(long)]
    level: Option<Severity>,
    /// Start from the oldest retained record
    #[arg(long, default_value_t = false)]
    replay: bool,
    /// Stop after the backlog instead of following new records
    #[arg(long, default_value_t = false)]
    no_tail: bool,
    /// Number of backlog lines to show first
    #[arg(short = 'n', long, default_value_t = 10)]
    lines: u64,
    /// Stop after this many lines (0 for no limit)
    #[arg(long, default_value_t = 0)]
    limit: u64,
    /// Only records at or after this RFC 3339 time
    #[arg(long)]
    since: Option<DateTime<Utc>>,
}

impl DebugLogArgs {
    fn into_request(self) -> LogQueryRequest {
        LogQueryRequest {
            from_start: self.replay,
            no_tail: self.no_tail,
            initial_line_count: self.lines,
            start_time: self.since,
            min_severity: self.level.unwrap_or_default(),
            include_entity: self.include_entity,
            include_module: self.include_module,
            include_label: self.include_label,
            exclude_entity: self.exclude_entity,
            exclude_module: self.exclude_module,
            exclude_label: self.exclude_label,
            max_lines: self.limit,
        }
    }
}

#[derive(Args)]
struct LogArgs {
    #[arg(long)]
    entity: String,
    #[arg(long)]
    module: String,
    #[arg(long, default_value = "INFO")]
    level: Severity,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long)]
    label: Vec<String>,
    message: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_stream_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Version = cli.command {
        println!("fleet v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let base_url = cli
        .controller
        .unwrap_or_else(|| DEFAULT_CONTROLLER_URL.to_string());
    let client = ControllerClient::new(&base_url)?;

    match cli.command {
        Commands::DebugLog(args) => {
            let request = args.into_request();
            let mut stream = client.open_stream(&request).await?;
            // Lines already carry their trailing newline.
            while let Some(line) = stream.next_line().await? {
                print!("{line}");
            }
            Ok(())
        }
        Commands::Log(args) => {
            let record = PushRecord {
                time: None,
                entity: args.entity,
                module: args.module,
                location: args.location,
                severity: args.level,
                message: args.message,
                labels: args.label,
            };
            let response = client.push_records(&[record]).await?;
            print_pushed(&response);
            Ok(())
        }
        Commands::Version => Ok(()),
    }
}
