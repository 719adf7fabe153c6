use crate::commands::{run_assemble, run_score, AssembleArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use assessment_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Competency Assessment Engine",
    about = "Score assessment sessions and assemble tests from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a recorded session and print the report as JSON
    Score(ScoreArgs),
    /// Assemble a test from a blueprint and print the selected questions
    Assemble(AssembleArgs),
}

/// Where the in-memory bank and benchmark profiles are loaded from.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct DataArgs {
    /// Question bank CSV export. Defaults to the bundled demo bank.
    #[arg(long)]
    pub(crate) bank_csv: Option<PathBuf>,
    /// JSON array of occupational benchmarks. Defaults to the bundled profiles.
    #[arg(long)]
    pub(crate) benchmarks: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Assemble(args) => run_assemble(args),
    }
}
