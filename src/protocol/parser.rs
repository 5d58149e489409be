use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use super::types::Sample;
use crate::error::RecordError;

/// Validity flag the reference meter writes for a good reading
pub const VALID_FLAG: &str = "1";

/// Reference timestamps end in `:SS`
const REFERENCE_SUFFIX_LEN: usize = 3;

/// Photodiode timestamps end in `:SS UTC`
const PHOTODIODE_SUFFIX_LEN: usize = 7;

/// Both logs are aligned at minute resolution
const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse one tab-separated reference meter line
///
/// Format: `<flag>\t<YYYY-MM-DD HH:MM:SS>\t<PAR>[\t...]`. Only the first three
/// fields are read. The timestamp is truncated to the minute and localized in
/// `tz`, the zone the meter clock runs in.
pub fn parse_reference_line(line: &str, tz: Tz) -> Result<Sample, RecordError> {
    let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');

    let flag = fields.next().ok_or(RecordError::MissingField("valid"))?;
    let datetime = fields.next().ok_or(RecordError::MissingField("datetime"))?;
    let reading = fields.next().ok_or(RecordError::MissingField("par"))?;

    if flag.trim() != VALID_FLAG {
        return Err(RecordError::InvalidFlag(flag.trim().to_string()));
    }

    let value = parse_reading(reading)?;
    let naive = parse_minute(datetime.trim(), REFERENCE_SUFFIX_LEN)?;

    let timestamp = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| RecordError::NonexistentLocalTime(naive.to_string()))?;

    Sample::new(timestamp, value)
}

/// Parse the value and `created_at` fields of one photodiode logger record
///
/// The logger stamps records in UTC; the result is converted to `tz` so both
/// series share a zone.
pub fn parse_photodiode_fields(
    value: &str,
    created_at: &str,
    tz: Tz,
) -> Result<Sample, RecordError> {
    let value = parse_reading(value)?;
    let naive = parse_minute(created_at.trim(), PHOTODIODE_SUFFIX_LEN)?;

    let timestamp: DateTime<Tz> = naive.and_utc().with_timezone(&tz);

    Sample::new(timestamp, value)
}

fn parse_reading(field: &str) -> Result<f64, RecordError> {
    let trimmed = field.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| RecordError::InvalidNumber(trimmed.to_string()))?;

    if !value.is_finite() {
        return Err(RecordError::NonFinite(value));
    }

    Ok(value)
}

/// Drop a fixed-length seconds suffix and parse what is left to the minute
fn parse_minute(raw: &str, suffix_len: usize) -> Result<NaiveDateTime, RecordError> {
    let truncated = raw
        .len()
        .checked_sub(suffix_len)
        .and_then(|end| raw.get(..end))
        .ok_or_else(|| RecordError::InvalidTimestamp(raw.to_string()))?;

    NaiveDateTime::parse_from_str(truncated, MINUTE_FORMAT)
        .map_err(|_| RecordError::InvalidTimestamp(raw.to_string()))
}
