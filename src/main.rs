use std::process::ExitCode;

use clap::Parser;

use ankivec::commands::{self, Commands, Context};
use ankivec::output::{ErrorResponse, print_json};
use ankivec::{AnkiConnect, Config, EmbeddingEngine, Error, LocalIndex, logging};

/// ankivec - mirror Anki decks into a local vector index and catch near-duplicate cards
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn open_index(config: &Config) -> Result<LocalIndex<EmbeddingEngine>, Error> {
    config.ensure_directories()?;
    let engine = EmbeddingEngine::new(&config.embedding_model, &config.model_cache)?;
    LocalIndex::open(&config.database_path, engine)
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let config = Config::load()?;
    let source = AnkiConnect::new(&config.anki_url, config.request_timeout())?;
    let ctx = Context {
        config: &config,
        source: &source,
        json: cli.json,
    };
    commands::execute(&cli.command, &ctx, || open_index(&config))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{e}");
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if cli.json {
                print_json(&ErrorResponse {
                    error: e.to_string(),
                });
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
