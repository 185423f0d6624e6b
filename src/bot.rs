//! The chat front-end. A `Bot` turns one incoming message into one reply.
//!
//! Messages that start with `/` are commands. Anything else is treated as an expense in the form
//! `<amount> <category>`. Every failure is turned into a reply here, so callers never see an error
//! for a single message.

use crate::api::{self, Inference, Ledger, Mode};
use crate::commands;
use crate::error::ErrorType;
use crate::model::{category_suggestions, Period};
use crate::{Config, Error, Result};
use chrono::NaiveDateTime;
use tracing::{debug, error, warn};

const WELCOME: &str = "Welcome to the expense bot!

Send me an expense as an amount followed by a category or description:
- 6.60 food
- 9.70 coffee at starbucks
- 15.30 groceries

Commands:
/help - Show usage examples
/total - Show the running total
/stats [current|annual] - Show spending statistics
/recent [n] - Show the last n expenses (default 5, at most 20)
/monthly_report - Per-category report for this month
/annual_report - Per-category report for this year
/analyze_monthly - AI analysis of this month
/analyze_annual - AI analysis of this year";

const HELP: &str = "Usage examples

Basic format: amount category
- 6.60 food
- 9.70 coffee
- 15.30 groceries

With a description: amount description
- 9.70 coffee at starbucks
- 25.50 lunch with colleagues
- 45.00 movie tickets

Amounts may use a dot or a comma as the decimal separator, e.g. 9,70 coffee.

The AI analysis groups your expenses into categories, points out purchases you repeat often and
suggests where you could save. It runs on a local model and can take a minute.";

/// The commands the bot understands, without the leading `/`.
enum BotCommand {
    Start,
    Help,
    Total,
    Stats(Option<String>),
    Recent(Option<i64>),
    Report(Period),
    Analyze(Period),
    Unknown(String),
}

impl BotCommand {
    /// Parses `/name[@bot] [args...]`. Returns `None` when `message` is not a command.
    fn parse(message: &str) -> Option<Self> {
        let rest = message.trim().strip_prefix('/')?;
        let mut words = rest.split_whitespace();
        let head = words.next().unwrap_or_default();
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let arg = words.next();
        Some(match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "total" => Self::Total,
            "stats" => Self::Stats(arg.map(String::from)),
            // A limit that is not a number falls back to the default.
            "recent" => Self::Recent(arg.and_then(|a| a.parse().ok())),
            "monthly_report" => Self::Report(Period::Monthly),
            "annual_report" => Self::Report(Period::Annual),
            "analyze_monthly" => Self::Analyze(Period::Monthly),
            "analyze_annual" => Self::Analyze(Period::Annual),
            _ => Self::Unknown(name),
        })
    }
}

/// Holds the clients for the lifetime of a chat session.
pub struct Bot {
    config: Config,
    ledger: Box<dyn Ledger + Send>,
    inference: Box<dyn Inference + Send>,
}

impl Bot {
    pub fn new(
        config: Config,
        ledger: Box<dyn Ledger + Send>,
        inference: Box<dyn Inference + Send>,
    ) -> Self {
        Self {
            config,
            ledger,
            inference,
        }
    }

    /// Creates the clients for `mode` from `config`.
    pub fn from_config(config: Config, mode: Mode) -> Result<Self> {
        let ledger = api::ledger(&config, mode)?;
        let inference = api::inference(&config, mode)?;
        Ok(Self::new(config, ledger, inference))
    }

    /// Replies to `message` as of the web app's current time.
    pub async fn reply(&mut self, message: &str) -> String {
        self.reply_at(message, api::ledger_now()).await
    }

    /// Replies to `message` as if it arrived at `now`.
    pub async fn reply_at(&mut self, message: &str, now: NaiveDateTime) -> String {
        debug!("Received message '{message}'");
        match BotCommand::parse(message) {
            Some(command) => self.command(command, now).await,
            None => match commands::log_expense(self.ledger.as_mut(), message).await {
                Ok(out) => out.into_message(),
                Err(e) if e.error_type() == ErrorType::Validation => {
                    debug!("Rejected message '{message}': {e}");
                    format!("{e}\n\n{}", category_suggestions())
                }
                Err(e) => self.failure("log your expense", e),
            },
        }
    }

    async fn command(&mut self, command: BotCommand, now: NaiveDateTime) -> String {
        let today = now.date();
        let sheet_url = self.config.sheet_url();
        let result = match command {
            BotCommand::Start => return WELCOME.to_string(),
            BotCommand::Help => return HELP.to_string(),
            BotCommand::Unknown(name) => {
                return format!("Unknown command /{name}. Send /help to see what I can do.")
            }
            BotCommand::Total => commands::total(self.ledger.as_mut(), today)
                .await
                .map(|out| out.into_message()),
            BotCommand::Stats(month) => {
                commands::stats(self.ledger.as_mut(), month.as_deref(), sheet_url.as_deref())
                    .await
                    .map(|out| out.into_message())
            }
            BotCommand::Recent(limit) => {
                commands::recent(self.ledger.as_mut(), limit, today, sheet_url.as_deref())
                    .await
                    .map(|out| out.into_message())
            }
            BotCommand::Report(period) => commands::report(self.ledger.as_mut(), period, today)
                .await
                .map(|out| out.into_message()),
            BotCommand::Analyze(period) => commands::analyze(
                self.ledger.as_mut(),
                self.inference.as_mut(),
                period,
                now,
                true,
            )
            .await
            .map(|out| out.into_message()),
        };
        result.unwrap_or_else(|e| self.failure("complete that request", e))
    }

    /// Turns an error into a reply and logs it.
    fn failure(&self, what: &str, e: Error) -> String {
        match e.error_type() {
            ErrorType::Validation => {
                warn!("Invalid request: {e}");
                e.to_string()
            }
            ErrorType::Connectivity => {
                error!("Unable to {what}: {e}");
                format!("Unable to {what} because a service could not be reached. Please try again later.")
            }
            ErrorType::ModelUnavailable => {
                error!("Unable to {what}: {e}");
                format!(
                    "The AI model '{}' is not available. Pull it with 'ollama pull {}' and try again.",
                    self.inference.model(),
                    self.inference.model()
                )
            }
            ErrorType::Config | ErrorType::Service => {
                error!("Unable to {what}: {e}");
                format!("Unable to {what}: {e}")
            }
        }
    }
}
