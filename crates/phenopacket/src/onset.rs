//! Onset values and their ordering.
//!
//! Phenopackets record when a feature or disease began as a `TimeElement`. SAMS exports use the
//! `timestamp` and `age` forms; the `ontologyClass` form (for example `HP:0003577 Congenital
//! onset`) also appears in the wild. Any other shape, and timestamp or age text that cannot be
//! read, is carried as [`Onset::Unrecognised`] so it round-trips unchanged.
//!
//! Ordering rules:
//! - timestamps order by instant (a bare `YYYY-MM-DD` date is midnight UTC, and a date-time
//!   without an offset is read as UTC)
//! - ages order only when one is certainly later: beyond the months both share, its shortest
//!   reading (28-day months) exceeds the other's longest (31-day months)
//! - equal values always compare equal, whatever their kind
//! - anything else is incomparable and reported as [`PhenopacketError::IncomparableOnsets`]

use crate::document::OntologyClass;
use crate::{PhenopacketError, PhenopacketResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::fmt;

/// When a phenotypic feature or disease began.
#[derive(Clone, Debug)]
pub enum Onset {
    /// A point in time, kept with the text it was parsed from.
    Timestamp { text: String, at: DateTime<Utc> },
    /// Age of the subject, as an ISO 8601 duration.
    Age(AgeDuration),
    /// An onset ontology term.
    Class(OntologyClass),
    /// A `TimeElement` shape this crate does not interpret.
    Unrecognised(Value),
}

impl Onset {
    /// Parse a timestamp from RFC 3339 text, an offset-less date-time (UTC) or a bare
    /// `YYYY-MM-DD` date.
    pub fn timestamp(text: &str) -> PhenopacketResult<Self> {
        let trimmed = text.trim();
        let at = if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            dt.with_timezone(&Utc)
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            Utc.from_utc_datetime(&naive)
        } else {
            let midnight = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or_else(|| {
                    PhenopacketError::InvalidOnset(format!("'{text}' is not a timestamp"))
                })?;
            Utc.from_utc_datetime(&midnight)
        };

        Ok(Onset::Timestamp {
            text: trimmed.to_owned(),
            at,
        })
    }

    /// Interpret free text as an onset: a timestamp first, then an age.
    ///
    /// Returns `None` when the text is neither.
    pub fn parse_text(text: &str) -> Option<Self> {
        Onset::timestamp(text)
            .or_else(|_| AgeDuration::parse(text).map(Onset::Age))
            .ok()
    }

    /// Compare two onsets under the ordering rules in the module docs.
    ///
    /// # Errors
    ///
    /// Returns [`PhenopacketError::IncomparableOnsets`] when the values differ and are not both
    /// timestamps or both ages, or are ages whose order depends on month length.
    pub fn compare(&self, other: &Onset) -> PhenopacketResult<Ordering> {
        let ordering = match (self, other) {
            (Onset::Timestamp { at: a, .. }, Onset::Timestamp { at: b, .. }) => Some(a.cmp(b)),
            (Onset::Age(a), Onset::Age(b)) => a.partial_cmp(b),
            _ if self == other => Some(Ordering::Equal),
            _ => None,
        };

        ordering.ok_or_else(|| PhenopacketError::IncomparableOnsets {
            left: self.to_string(),
            right: other.to_string(),
        })
    }

    /// Read an onset from its `TimeElement` wire form.
    pub(crate) fn from_wire(value: Value) -> PhenopacketResult<Self> {
        if let Some(text) = value.get("timestamp").and_then(Value::as_str) {
            return Onset::timestamp(text);
        }

        if let Some(text) = value
            .get("age")
            .and_then(|age| age.get("iso8601duration"))
            .and_then(Value::as_str)
        {
            return AgeDuration::parse(text).map(Onset::Age);
        }

        if let Some(class) = value.get("ontologyClass") {
            let class = serde_json::from_value::<OntologyClass>(class.clone()).map_err(|e| {
                PhenopacketError::InvalidOnset(format!("invalid onset ontologyClass: {e}"))
            })?;
            return Ok(Onset::Class(class));
        }

        Ok(Onset::Unrecognised(value))
    }

    /// Render the onset as its `TimeElement` wire form.
    pub(crate) fn to_wire(&self) -> Value {
        match self {
            Onset::Timestamp { text, .. } => json!({ "timestamp": text }),
            Onset::Age(age) => json!({ "age": { "iso8601duration": age.text } }),
            Onset::Class(class) => json!({ "ontologyClass": class }),
            Onset::Unrecognised(value) => value.clone(),
        }
    }
}

impl PartialEq for Onset {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Onset::Timestamp { at: a, .. }, Onset::Timestamp { at: b, .. }) => a == b,
            (Onset::Age(a), Onset::Age(b)) => a == b,
            (Onset::Class(a), Onset::Class(b)) => a.id == b.id,
            (Onset::Unrecognised(a), Onset::Unrecognised(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Onset {}

impl fmt::Display for Onset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Onset::Timestamp { text, .. } => write!(f, "{text}"),
            Onset::Age(age) => write!(f, "{}", age.text),
            Onset::Class(class) => write!(f, "{} - {}", class.id, class.label),
            Onset::Unrecognised(value) => write!(f, "{value}"),
        }
    }
}

/// An ISO 8601 age such as `P3Y2M` or `P10W`, normalised for ordering.
///
/// Years fold into months; weeks, days and the time part fold into seconds. Two ages are equal
/// when their normalised components are equal, so `P1Y` equals `P12M` and `P1D` equals `PT24H`. Ages are only partially
/// ordered: `P1M` and `P30D` have no order because a month is 28 to 31 days.
#[derive(Clone, Debug)]
pub struct AgeDuration {
    text: String,
    months: u64,
    days: u64,
    seconds: u64,
}

impl AgeDuration {
    /// Parse `P[nY][nM][nW][nD][T[nH][nM][nS]]` with integer components.
    pub fn parse(text: &str) -> PhenopacketResult<Self> {
        let invalid = || PhenopacketError::InvalidOnset(format!("'{text}' is not an ISO 8601 age"));

        let trimmed = text.trim();
        let body = trimmed.strip_prefix('P').ok_or_else(invalid)?;

        let mut months = 0u64;
        let mut days = 0u64;
        let mut seconds = 0u64;
        let mut digits = String::new();
        let mut in_time = false;
        let mut last_rank = 0u8;
        let mut components = 0usize;

        for ch in body.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }

            if ch == 'T' && !in_time && digits.is_empty() {
                in_time = true;
                last_rank = 4;
                continue;
            }

            let value: u64 = digits.parse().map_err(|_| invalid())?;
            digits.clear();

            let rank = match (in_time, ch) {
                (false, 'Y') => 1,
                (false, 'M') => 2,
                (false, 'W') => 3,
                (false, 'D') => 4,
                (true, 'H') => 5,
                (true, 'M') => 6,
                (true, 'S') => 7,
                _ => return Err(invalid()),
            };
            if rank <= last_rank {
                return Err(invalid());
            }
            last_rank = rank;
            components += 1;

            match rank {
                1 => months = months.saturating_add(value.saturating_mul(12)),
                2 => months = months.saturating_add(value),
                3 => days = days.saturating_add(value.saturating_mul(7)),
                4 => days = days.saturating_add(value),
                5 => seconds = seconds.saturating_add(value.saturating_mul(3600)),
                6 => seconds = seconds.saturating_add(value.saturating_mul(60)),
                _ => seconds = seconds.saturating_add(value),
            }
        }

        // Trailing digits without a designator, or a dangling `T`.
        if !digits.is_empty() || components == 0 || (in_time && last_rank == 4) {
            return Err(invalid());
        }

        Ok(Self {
            text: trimmed.to_owned(),
            months,
            days,
            seconds,
        })
    }

    /// The duration text as it appeared on the wire.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Total months and total seconds, with a day as 86 400 seconds.
    fn key(&self) -> (u64, u128) {
        let seconds = u128::from(self.days) * SECONDS_PER_DAY + u128::from(self.seconds);
        (self.months, seconds)
    }

    /// Shortest and longest length in seconds beyond the first `skip_months` months, reading a
    /// month as 28 to 31 days.
    fn bounds_beyond(&self, skip_months: u64) -> (u128, u128) {
        let (months, seconds) = self.key();
        let months = u128::from(months.saturating_sub(skip_months));
        let at = |month_days: u128| months * month_days * SECONDS_PER_DAY + seconds;
        (at(28), at(31))
    }
}

const SECONDS_PER_DAY: u128 = 86_400;

impl PartialEq for AgeDuration {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for AgeDuration {}

impl PartialOrd for AgeDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }

        // Months both ages share cover the same span of the subject's life.
        let common = self.months.min(other.months);
        let (self_min, self_max) = self.bounds_beyond(common);
        let (other_min, other_max) = other.bounds_beyond(common);
        if self_max < other_min {
            Some(Ordering::Less)
        } else if self_min > other_max {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}
