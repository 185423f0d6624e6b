//! Command handlers for the expense-bot CLI.
//!
//! Each handler takes the clients it needs as trait objects, so the same code serves the CLI
//! subcommands, the chat loop and the tests.

mod analyze;
mod chat;
mod check;
mod init;
mod log;
mod render;
mod summary;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use analyze::analyze;
pub use chat::chat;
pub use check::check;
pub use init::init;
pub use log::{log_expense, Logged};
pub use render::{render_analysis, render_recent, render_stats, render_summary};
pub use summary::{recent, report, stats, total, PeriodSummary, DEFAULT_RECENT, MAX_RECENT};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and the chat interface.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Consumes `self` and returns the message.
    pub fn into_message(self) -> String {
        self.message
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}
