pub mod backend;
pub mod cli;
pub mod error;
pub mod services;
pub mod state;
pub mod types;
pub mod util;

use std::process::ExitCode;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use backend::{Backend, MemoryBackend, RestBackend};
use cli::Cli;
use error::BoardError;
use services::dashboard::{load_board_result, BoardResult};
use types::Config;

/// Exit status when the config file or flags are unusable.
const EXIT_CONFIG: u8 = 2;

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match load_run_config(&cli) {
        Ok(config) => match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(runtime) => runtime.block_on(render(&cli, &config)),
            Err(e) => {
                eprintln!("kpiboard: failed to start async runtime: {}", e);
                return ExitCode::FAILURE;
            }
        },
        Err(e) => {
            log::error!("{}", e);
            BoardError::Configuration(e).into()
        }
    };

    let output = if cli.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("kpiboard: failed to serialize result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::from(exit_status(&result))
}

/// 0 for a board, 2 for configuration problems, 1 for everything else.
fn exit_status(result: &BoardResult) -> u8 {
    match result {
        ok if ok.is_success() => 0,
        BoardResult::Error {
            kind: error::ErrorKind::Configuration,
            ..
        } => EXIT_CONFIG,
        _ => 1,
    }
}

/// Config file and environment, then command-line flags.
fn load_run_config(cli: &Cli) -> Result<Config, String> {
    let mut config = match &cli.config {
        Some(path) => state::load_config_at(path)?,
        None => state::load_config()?,
    };
    cli.apply(&mut config);
    state::validate_config(&config)?;
    Ok(config)
}

async fn render(cli: &Cli, config: &Config) -> BoardResult {
    let backend = match open_backend(cli, config) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("{}", e);
            return e.into();
        }
    };

    let seed = config.seed.unwrap_or_else(rand::random::<u64>);
    log::debug!("Sampling seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let today = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    load_board_result(&*backend, config, today, &mut rng).await
}

/// Snapshot file when given, the hosted backend otherwise.
fn open_backend(cli: &Cli, config: &Config) -> Result<Box<dyn Backend>, BoardError> {
    if let Some(path) = &cli.snapshot {
        log::info!("Reading board data from snapshot {}", path.display());
        let backend = MemoryBackend::load(path).map_err(BoardError::Configuration)?;
        return Ok(Box::new(backend));
    }

    if !config.backend.is_configured() {
        return Err(BoardError::Configuration(format!(
            "backend url and apiKey are not set (config file or {} / {})",
            state::BACKEND_URL_ENV,
            state::API_KEY_ENV
        )));
    }

    let backend = RestBackend::new(&config.backend, config.month_naming)?;
    Ok(Box::new(backend))
}
