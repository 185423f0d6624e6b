//! Types that represent the core data model, such as `ExpenseRecord` and `AnalysisReport`.
mod amount;
mod entry;
mod expense;
mod period;
mod report;

pub use amount::{Amount, AmountError};
pub use entry::{
    category_suggestions, validate_amount, validate_category, ExpenseEntry, CATEGORY_VOCABULARY,
    MAX_AMOUNT, MAX_CATEGORY_LEN, OTHER,
};
pub use expense::{filter_period, ExpenseRecord};
pub use period::Period;
pub use report::{
    AnalysisLogEntry, AnalysisReport, CategorySummaries, CategorySummary, Insight,
    PatternFinding, Stage, StageWarning,
};
