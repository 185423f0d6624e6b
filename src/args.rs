//! These structs provide the CLI interface for the expense-bot CLI.

use crate::model::Period;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expense-bot: log expenses to a Google Sheet and analyze them with a local LLM.
///
/// Expenses are sent as short messages like `6.60 food` or `9.70 coffee at starbucks` and appended
/// to a Google Sheet through a deployed Apps Script web app, which keeps a running total.
///
/// The analyze command fetches the current month or year of expenses and runs them through a
/// local model served by Ollama in three stages: categorization, pattern detection and insight
/// generation.
///
/// The chat command reads messages from stdin, one per line, and replies to each in turn. It
/// accepts the same slash commands a chat bot would: /total, /stats, /recent, /monthly_report,
/// /annual_report, /analyze_monthly and /analyze_annual.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and write config.json from the given flags.
    ///
    /// You need the URL of your deployed Apps Script web app (--webapp-url). The spreadsheet ID
    /// (--spreadsheet-id) is optional and is only used to print links to your sheet.
    Init,
    /// Log one expense, e.g. `expense-bot log 6.60 food`.
    Log(LogArgs),
    /// Show the running total.
    Total,
    /// Show spending statistics from the web app.
    Stats(StatsArgs),
    /// Show the most recent expenses.
    Recent(RecentArgs),
    /// Show a simple per-category report for this month or this year.
    Report(ReportArgs),
    /// Run the AI analysis for this month or this year.
    Analyze(AnalyzeArgs),
    /// Read messages from stdin, one per line, and reply to each.
    Chat,
    /// Check that the web app and the inference server are reachable.
    Check,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where config.json is kept. Defaults to ~/.expense-bot
    #[arg(long, env = "EXPENSE_BOT_HOME", default_value_t = default_home())]
    home: DisplayPath,

    #[clap(flatten)]
    config: ConfigArgs,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf, config: ConfigArgs) -> Self {
        Self {
            log_level,
            home: home.into(),
            config,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }

    pub fn config(&self) -> &ConfigArgs {
        &self.config
    }
}

/// Configuration values that override config.json.
#[derive(Debug, Default, Parser, Clone)]
pub struct ConfigArgs {
    /// The URL of the deployed Apps Script web app.
    #[arg(long, env = "WEBAPP_URL")]
    webapp_url: Option<String>,

    /// The Google spreadsheet ID, or the spreadsheet's URL.
    #[arg(long, env = "SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,

    /// The base URL of the Ollama server, e.g. http://localhost:11434
    #[arg(long, env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    /// The model used for analysis, e.g. mistral
    #[arg(long, env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Timeout for web app requests, in seconds.
    #[arg(long, env = "EXPENSE_BOT_REQUEST_TIMEOUT")]
    request_timeout_secs: Option<u64>,

    /// Timeout for a single model generation, in seconds. There is no timeout by default.
    #[arg(long, env = "EXPENSE_BOT_INFERENCE_TIMEOUT")]
    inference_timeout_secs: Option<u64>,

    /// Sampling temperature passed to the model.
    #[arg(long, env = "OLLAMA_TEMPERATURE")]
    temperature: Option<f32>,
}

impl ConfigArgs {
    pub fn new(
        webapp_url: Option<String>,
        spreadsheet_id: Option<String>,
        ollama_url: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            webapp_url,
            spreadsheet_id,
            ollama_url,
            model,
            ..Default::default()
        }
    }

    pub fn webapp_url(&self) -> Option<&String> {
        self.webapp_url.as_ref()
    }

    pub fn spreadsheet_id(&self) -> Option<&String> {
        self.spreadsheet_id.as_ref()
    }

    pub fn ollama_url(&self) -> Option<&String> {
        self.ollama_url.as_ref()
    }

    pub fn model(&self) -> Option<&String> {
        self.model.as_ref()
    }

    pub fn request_timeout_secs(&self) -> Option<&u64> {
        self.request_timeout_secs.as_ref()
    }

    pub fn inference_timeout_secs(&self) -> Option<&u64> {
        self.inference_timeout_secs.as_ref()
    }

    pub fn temperature(&self) -> Option<&f32> {
        self.temperature.as_ref()
    }
}

/// Args for the `expense-bot log` command.
#[derive(Debug, Parser, Clone)]
pub struct LogArgs {
    /// The expense as you would type it in chat: an amount followed by a category or description.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    message: Vec<String>,
}

impl LogArgs {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: vec![message.into()],
        }
    }

    /// The words of the message joined back together.
    pub fn message(&self) -> String {
        self.message.join(" ")
    }
}

/// Args for the `expense-bot stats` command.
#[derive(Debug, Parser, Clone)]
pub struct StatsArgs {
    /// `current` for this month, `annual` for this year. Anything else points you to the sheet.
    month: Option<String>,
}

impl StatsArgs {
    pub fn new(month: Option<String>) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Option<&str> {
        self.month.as_deref()
    }
}

/// Args for the `expense-bot recent` command.
#[derive(Debug, Parser, Clone)]
pub struct RecentArgs {
    /// How many expenses to show, between 1 and 20. Defaults to 5.
    limit: Option<i64>,
}

impl RecentArgs {
    pub fn new(limit: Option<i64>) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }
}

/// Args for the `expense-bot report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// The period to report on: "monthly" or "annual"
    period: Period,
}

impl ReportArgs {
    pub fn new(period: Period) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Period {
        self.period
    }
}

/// Args for the `expense-bot analyze` command.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// The period to analyze: "monthly" or "annual"
    period: Period,

    /// Do not append a row to the analysis log sheet.
    #[arg(long)]
    no_log: bool,
}

impl AnalyzeArgs {
    pub fn new(period: Period, no_log: bool) -> Self {
        Self { period, no_log }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn no_log(&self) -> bool {
        self.no_log
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join(".expense-bot"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSE_BOT_HOME instead of relying on the default \
                directory.",
            );
            PathBuf::from(".expense-bot")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
