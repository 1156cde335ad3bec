use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

pub const MONTH_NAMES: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid period code '{0}', expected YYYY-MM")]
pub struct PeriodCodeError(pub String);

/// Calendar boundaries of a monthly accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub previous_end: NaiveDate,
}

impl PeriodBounds {
    /// Parses a `YYYY-MM` period code.
    pub fn from_code(code: &str) -> Result<Self, PeriodCodeError> {
        let err = || PeriodCodeError(code.to_string());
        let (year_s, month_s) = code.trim().split_once('-').ok_or_else(err)?;
        if year_s.len() != 4 || month_s.len() != 2 {
            return Err(err());
        }
        let year: i32 = year_s.parse().map_err(|_| err())?;
        let month: u32 = month_s.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }

    pub fn new(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = last_day_of_month(year, month)?;
        let previous_end = start.pred_opt()?;
        Some(Self {
            year,
            month,
            start,
            end,
            previous_end,
        })
    }

    pub fn end_key(&self) -> String {
        date_key(self.end)
    }

    pub fn start_key(&self) -> String {
        date_key(self.start)
    }

    pub fn previous_end_key(&self) -> String {
        date_key(self.previous_end)
    }

    pub fn label(&self) -> String {
        month_label(self.year, self.month)
    }

    /// First instant of the start day.
    pub fn range_start(&self) -> DateTime<Utc> {
        start_of_day(self.start)
    }

    /// Last millisecond of the end day.
    pub fn range_end(&self) -> DateTime<Utc> {
        end_of_day(self.end)
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

pub fn month_label(year: i32, month: u32) -> String {
    let name = MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("?");
    format!("{} {}", name, year)
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Accepts either a bare `YYYY-MM-DD` date (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(start_of_day(date));
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn to_iso_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter writing timestamps as `2025-09-30T00:00:00.000Z`.
pub mod iso_millis {
    use super::{parse_timestamp, to_iso_string};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_iso_string(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub mod option {
        use super::super::{parse_timestamp, to_iso_string};
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => s.serialize_str(&to_iso_string(dt)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            Ok(raw.as_deref().and_then(parse_timestamp))
        }
    }
}
