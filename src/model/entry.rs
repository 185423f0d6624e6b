//! Parsing of free-text expense messages such as `6.60 food` or `9,70 coffee at starbucks`.

use crate::model::Amount;
use crate::{Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// The largest amount accepted from a single message.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// The longest category/description accepted, in characters.
pub const MAX_CATEGORY_LEN: usize = 100;

/// The categories suggested to users and used as the vocabulary for AI categorization.
pub const CATEGORY_VOCABULARY: &[&str] = &[
    "food",
    "coffee",
    "groceries",
    "gas",
    "transport",
    "entertainment",
    "shopping",
    "utilities",
    "rent",
    "insurance",
    "health",
    "other",
];

/// The catch-all category.
pub const OTHER: &str = "other";

/// Fragments that are never allowed in a category because the text ends up in a spreadsheet cell
/// and in chat replies.
const FORBIDDEN: &[&str] = &[
    "<script",
    "javascript:",
    "data:",
    "vbscript:",
    "onload=",
    "onerror=",
    "onclick=",
    "<iframe",
    "<object",
    "<embed",
];

/// An expense parsed from a chat message, validated and ready to be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseEntry {
    amount: Amount,
    category: String,
}

impl ExpenseEntry {
    /// Validates and creates an entry.
    ///
    /// # Errors
    /// - `Validation` if the amount is not greater than zero or exceeds `MAX_AMOUNT`.
    /// - `Validation` if the category is empty, too long, or contains markup.
    pub fn new(amount: Amount, category: impl AsRef<str>) -> Result<Self> {
        validate_amount(amount)?;
        let category = validate_category(category.as_ref())?;
        Ok(Self { amount, category })
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

impl FromStr for ExpenseEntry {
    type Err = Error;

    /// Parses `<amount> <category>` where the amount is digits with an optional `.` or `,` decimal
    /// part and the category is everything after the first run of whitespace.
    fn from_str(message: &str) -> Result<Self> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::validation("Message is empty."));
        }

        let (amount_text, category) = message
            .split_once(char::is_whitespace)
            .ok_or_else(invalid_format)?;

        if !is_amount_shape(amount_text) {
            return Err(invalid_format());
        }
        let amount = Amount::from_str(&amount_text.replace(',', "."))
            .map_err(|_| Error::validation("Invalid amount. Please enter a valid number."))?;

        ExpenseEntry::new(amount, category)
    }
}

/// Checks that `amount <= 0` and `amount > MAX_AMOUNT` are rejected.
pub fn validate_amount(amount: Amount) -> Result<()> {
    if !amount.is_positive() {
        return Err(Error::validation("Amount must be greater than 0."));
    }
    if amount.value() > MAX_AMOUNT {
        return Err(Error::validation(
            "Amount seems too high. Please check and try again.",
        ));
    }
    Ok(())
}

/// Trims the category and checks its length and content. Returns the trimmed category.
pub fn validate_category(category: &str) -> Result<String> {
    let category = category.trim();
    if category.is_empty() {
        return Err(Error::validation(
            "Please provide a description for your expense.",
        ));
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(Error::validation(format!(
            "Description is too long. Please keep it under {MAX_CATEGORY_LEN} characters."
        )));
    }
    let lower = category.to_lowercase();
    if FORBIDDEN.iter().any(|f| lower.contains(f)) {
        return Err(Error::validation("Description contains invalid content."));
    }
    Ok(category.to_string())
}

/// A one-line list of suggested categories for chat replies.
pub fn category_suggestions() -> String {
    format!("Suggested categories: {}", CATEGORY_VOCABULARY.join(", "))
}

/// Digits, optionally followed by exactly one `.` or `,` and more digits.
fn is_amount_shape(s: &str) -> bool {
    let mut parts = s.splitn(2, ['.', ',']);
    let whole = parts.next().unwrap_or_default();
    let all_digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    match parts.next() {
        Some(frac) => all_digits(whole) && all_digits(frac),
        None => all_digits(whole),
    }
}

fn invalid_format() -> Error {
    Error::validation("Invalid format. Please use: `amount category` (e.g., `6.60 food`)")
}
