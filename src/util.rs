use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const COMPACT_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]");

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

/// Current UTC time truncated to whole seconds, the resolution it is stored at.
pub fn now_timestamp() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    let time = now.time().replace_nanosecond(0).unwrap_or(now.time());
    PrimitiveDateTime::new(now.date(), time)
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// `YYYYMMDD`, used to stamp export file names.
pub fn date_stamp(date: Date) -> String {
    date.format(COMPACT_DATE_FORMAT)
        .unwrap_or_else(|_| "19700101".to_string())
}

pub fn format_timestamp(ts: &PrimitiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| "1970-01-01 00:00:00".to_string())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `YYYY-MM-DD`, optionally followed by a time part.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    Date::parse(raw.get(..10).unwrap_or(raw), DATE_FORMAT).ok()
}

/// `YYYY-MM-DD HH:MM:SS` (a `T` separator is accepted), or a bare date at midnight.
pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim().replacen('T', " ", 1);
    let head = raw.get(..19).unwrap_or(raw.as_str());
    if let Ok(ts) = PrimitiveDateTime::parse(head, TIMESTAMP_FORMAT) {
        return Some(ts);
    }
    parse_date(&raw).map(|d| d.midnight())
}

/// Unparseable dates load as today.
pub(crate) mod date_serde {
    use serde::{Deserializer, Serializer, ser::Error as _};
    use time::Date;
    use tracing::warn;

    pub fn serialize<S: Serializer>(value: &Date, s: S) -> Result<S::Ok, S::Error> {
        let text = value.format(super::DATE_FORMAT).map_err(S::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let raw = crate::lenient::string_value(d)?;
        match raw.as_deref().and_then(super::parse_date) {
            Some(day) => Ok(day),
            None => {
                warn!("unreadable date {raw:?}; using today");
                Ok(super::today())
            }
        }
    }
}

/// Unparseable timestamps load as now.
pub(crate) mod timestamp_serde {
    use serde::{Deserializer, Serializer, ser::Error as _};
    use time::PrimitiveDateTime;
    use tracing::warn;

    pub fn serialize<S: Serializer>(value: &PrimitiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        let text = value
            .format(super::TIMESTAMP_FORMAT)
            .map_err(S::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PrimitiveDateTime, D::Error> {
        let raw = crate::lenient::string_value(d)?;
        match raw.as_deref().and_then(super::parse_timestamp) {
            Some(ts) => Ok(ts),
            None => {
                warn!("unreadable timestamp {raw:?}; using now");
                Ok(super::now_timestamp())
            }
        }
    }
}
