use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Report headers carry dates as `day.month.year`, e.g. `05.03.2024`.
const REPORT_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parse a header label into a calendar date. Downstream consumers need a
/// real date, so anything unparsable is an error rather than a skipped cell.
pub fn parse_report_date(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), REPORT_DATE_FORMAT)
        .with_context(|| format!("cannot parse {:?} as a day.month.year date", label))
}
