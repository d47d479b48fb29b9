use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Explicit outcome for a value that could not be interpreted by a condition.
///
/// Evaluation treats every variant as "no match"; the variant only exists so callers can log it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueParseError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' is not an integer")]
    NotAnInteger(String),
    #[error("'{0}' is not a date")]
    NotADate(String),
    #[error("range '{0}' must be formatted as min,max")]
    MalformedRange(String),
}

/// Parses the longest numeric prefix of `raw`, so `"50000 INR"` yields `50000.0`.
pub fn parse_leading_float(raw: &str) -> Result<f64, ValueParseError> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let integer_start = end;
    end = scan_digits(bytes, end);
    let mut digits = end - integer_start;

    if bytes.get(end) == Some(&b'.') {
        let fraction_end = scan_digits(bytes, end + 1);
        let fraction_digits = fraction_end - (end + 1);
        if fraction_digits > 0 {
            digits += fraction_digits;
            end = fraction_end;
        }
    }

    if digits == 0 {
        return Err(ValueParseError::NotANumber(raw.to_string()));
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent_start = end + 1;
        if matches!(bytes.get(exponent_start), Some(b'+' | b'-')) {
            exponent_start += 1;
        }
        let exponent_end = scan_digits(bytes, exponent_start);
        if exponent_end > exponent_start {
            end = exponent_end;
        }
    }

    trimmed[..end]
        .parse::<f64>()
        .map_err(|_| ValueParseError::NotANumber(raw.to_string()))
}

/// Parses the leading base-10 integer of `raw`, so `"15 points"` yields `15`.
pub fn parse_leading_integer(raw: &str) -> Result<i64, ValueParseError> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let digits_start = end;
    end = scan_digits(bytes, end);
    if end == digits_start {
        return Err(ValueParseError::NotAnInteger(raw.to_string()));
    }

    trimmed[..end]
        .parse::<i64>()
        .map_err(|_| ValueParseError::NotAnInteger(raw.to_string()))
}

/// Splits a `"min,max"` payload into its inclusive bounds.
pub fn parse_range(raw: &str) -> Result<(f64, f64), ValueParseError> {
    let mut parts = raw.split(',');
    let (Some(min), Some(max)) = (parts.next(), parts.next()) else {
        return Err(ValueParseError::MalformedRange(raw.to_string()));
    };

    Ok((parse_leading_float(min.trim())?, parse_leading_float(max.trim())?))
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD` (midnight UTC) and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, ValueParseError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(midnight_utc(date));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(ValueParseError::NotADate(raw.to_string()))
}

pub(crate) fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn scan_digits(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && bytes[index].is_ascii_digit() {
        index += 1;
    }
    index
}
