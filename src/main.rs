use clap::Parser;
use expense_bot::args::{Args, Command};
use expense_bot::{api, commands, Bot, Config, Mode, Result};
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();
    let overrides = args.common().config();

    // This allows for running the program without a deployed web app or a model server. When
    // EXPENSE_BOT_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Live.
    let mode = Mode::from_env();

    let now = api::ledger_now();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init => commands::init(home, overrides).await?.print(),

        Command::Log(log_args) => {
            let config = Config::load(home, overrides).await?;
            let mut ledger = api::ledger(&config, mode)?;
            commands::log_expense(ledger.as_mut(), &log_args.message())
                .await?
                .print()
        }

        Command::Total => {
            let config = Config::load(home, overrides).await?;
            let mut ledger = api::ledger(&config, mode)?;
            commands::total(ledger.as_mut(), now.date()).await?.print()
        }

        Command::Stats(stats_args) => {
            let config = Config::load(home, overrides).await?;
            let mut ledger = api::ledger(&config, mode)?;
            commands::stats(ledger.as_mut(), stats_args.month(), config.sheet_url().as_deref())
                .await?
                .print()
        }

        Command::Recent(recent_args) => {
            let config = Config::load(home, overrides).await?;
            let mut ledger = api::ledger(&config, mode)?;
            commands::recent(
                ledger.as_mut(),
                recent_args.limit(),
                now.date(),
                config.sheet_url().as_deref(),
            )
            .await?
            .print()
        }

        Command::Report(report_args) => {
            let config = Config::load(home, overrides).await?;
            let mut ledger = api::ledger(&config, mode)?;
            commands::report(ledger.as_mut(), report_args.period(), now.date())
                .await?
                .print()
        }

        Command::Analyze(analyze_args) => {
            let config = Config::load(home, overrides).await?;
            let mut ledger = api::ledger(&config, mode)?;
            let mut inference = api::inference(&config, mode)?;
            commands::analyze(
                ledger.as_mut(),
                inference.as_mut(),
                analyze_args.period(),
                now,
                !analyze_args.no_log(),
            )
            .await?
            .print()
        }

        Command::Chat => {
            let config = Config::load(home, overrides).await?;
            let mut bot = Bot::from_config(config, mode)?;
            let input = BufReader::new(tokio::io::stdin());
            commands::chat(&mut bot, input, tokio::io::stdout())
                .await?
                .print()
        }

        Command::Check => {
            let config = Config::load(home, overrides).await?;
            let mut ledger = api::ledger(&config, mode)?;
            let mut inference = api::inference(&config, mode)?;
            commands::check(ledger.as_mut(), inference.as_mut())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only. The library and
            // the binary share the crate name `expense_bot`.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
