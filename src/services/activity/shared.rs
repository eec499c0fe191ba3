use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{self, Result};

use crate::models::activity::Currency;
use crate::utils::date::{format_time, parse_date, parse_time};

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

pub(crate) fn to_date(column: usize, value: String) -> Result<NaiveDate> {
    parse_date(&value).ok_or_else(|| conversion_error(column, format!("invalid date '{value}'")))
}

pub(crate) fn to_time(column: usize, value: Option<String>) -> Result<Option<NaiveTime>> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_time(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(column, format!("invalid time '{raw}'"))),
    }
}

/// Unknown currency codes read back as `None` rather than failing the row.
pub(crate) fn to_currency(value: Option<String>) -> Option<Currency> {
    value.as_deref().and_then(Currency::from_code)
}

pub(crate) fn time_text(time: Option<NaiveTime>) -> Option<String> {
    time.map(format_time)
}
