use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The window of expenses that a report or an analysis covers. The window is always computed
/// relative to the day the request is made, never from a stored timestamp.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// The calendar month containing today.
    #[default]
    Monthly,
    /// The calendar year containing today.
    Annual,
}

serde_plain::derive_display_from_serialize!(Period);
serde_plain::derive_fromstr_from_deserialize!(Period);

impl Period {
    /// Returns true if `date` falls inside this period as seen from `today`.
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Period::Monthly => date.year() == today.year() && date.month() == today.month(),
            Period::Annual => date.year() == today.year(),
        }
    }

    /// A title-cased label for reports, e.g. `Monthly`.
    pub fn title(&self) -> &'static str {
        match self {
            Period::Monthly => "Monthly",
            Period::Annual => "Annual",
        }
    }

    /// A human description of the window relative to `today`, e.g. `October 2026` or `2026`.
    pub fn describe(&self, today: NaiveDate) -> String {
        match self {
            Period::Monthly => today.format("%B %Y").to_string(),
            Period::Annual => today.format("%Y").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn test_monthly_contains() {
        let today = d("2026-10-19");
        assert!(Period::Monthly.contains(d("2026-10-01"), today));
        assert!(Period::Monthly.contains(d("2026-10-31"), today));
        assert!(!Period::Monthly.contains(d("2026-09-30"), today));
        assert!(!Period::Monthly.contains(d("2025-10-15"), today));
    }

    #[test]
    fn test_annual_contains() {
        let today = d("2026-10-19");
        assert!(Period::Annual.contains(d("2026-01-01"), today));
        assert!(Period::Annual.contains(d("2026-12-31"), today));
        assert!(!Period::Annual.contains(d("2025-12-31"), today));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Period::from_str("annual").unwrap(), Period::Annual);
        assert_eq!(Period::Monthly.to_string(), "monthly");
        assert!(Period::from_str("weekly").is_err());
    }

    #[test]
    fn test_describe() {
        let today = d("2026-10-19");
        assert_eq!(Period::Monthly.describe(today), "October 2026");
        assert_eq!(Period::Annual.describe(today), "2026");
    }
}
