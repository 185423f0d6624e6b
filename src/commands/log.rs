use crate::api::Ledger;
use crate::commands::Out;
use crate::model::{Amount, ExpenseEntry};
use crate::Result;
use serde::Serialize;
use std::str::FromStr;
use tracing::info;

/// The result of logging one expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Logged {
    pub amount: Amount,
    pub category: String,
    pub running_total: Amount,
}

/// Parses `message` (e.g. `6.60 food`) and appends it to the ledger.
///
/// # Errors
/// - `Validation` if the message is not `<amount> <category>` or fails validation. Nothing is sent
///   to the ledger in that case.
/// - Any error from `Ledger::log_expense`.
pub async fn log_expense(ledger: &mut (dyn Ledger + Send), message: &str) -> Result<Out<Logged>> {
    let entry = ExpenseEntry::from_str(message)?;
    let running_total = ledger
        .log_expense(entry.amount(), entry.category())
        .await?;
    info!(
        "Logged {} for {}, running total {running_total}",
        entry.amount(),
        entry.category()
    );
    let logged = Logged {
        amount: entry.amount(),
        category: entry.category().to_string(),
        running_total,
    };
    Ok(Out::new(
        format!(
            "Logged {} for {}. Running total: {}",
            logged.amount, logged.category, logged.running_total
        ),
        logged,
    ))
}
