use crate::api::{Inference, Ledger};
use crate::commands::render::render_analysis;
use crate::commands::Out;
use crate::model::{AnalysisReport, Period};
use crate::{analysis, Result};
use chrono::NaiveDateTime;
use tracing::{info, warn};

/// Fetches the expenses for `period`, runs the three-stage analysis and, if `log` is set, appends a
/// summary row to the analysis log sheet.
///
/// Logging the analysis is best-effort. A failure there is reported with `warn!` and the report is
/// still returned.
///
/// # Errors
/// - Any error from `Ledger::fetch_expenses`.
/// - `Connectivity` or `ModelUnavailable` if the inference backend is down. Nothing is logged in
///   that case.
pub async fn analyze(
    ledger: &mut (dyn Ledger + Send),
    inference: &mut (dyn Inference + Send),
    period: Period,
    now: NaiveDateTime,
    log: bool,
) -> Result<Out<AnalysisReport>> {
    let records = ledger.fetch_expenses(period, now.date()).await?;
    info!("Fetched {} {period} expenses", records.len());
    let report = analysis::analyze(inference, period, &records, now).await?;

    if log && !report.is_empty() {
        match ledger.log_analysis(&report.log_entry(now)).await {
            Ok(()) => info!("Appended the analysis to the log sheet"),
            Err(e) => warn!("Unable to log the analysis: {e}"),
        }
    }

    Ok(Out::new(render_analysis(&report, now.date()), report))
}
