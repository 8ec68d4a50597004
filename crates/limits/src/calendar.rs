//! Calendar arithmetic in local time.
//!
//! Accumulator resets follow calendar fields (day, month) in local time, not elapsed
//! durations. All functions are pure over an explicit `now`. The offset is resolved
//! per instant, so zones with daylight saving land on the real local midnight.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Zone {
    Fixed(FixedOffset),
    Local,
}

/// The local calendar limits are evaluated against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Calendar {
    zone: Zone,
}

impl Calendar {
    /// A zone that never changes its offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self { zone: Zone::Fixed(offset) }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// The host's time zone. Its offset is looked up for every instant.
    pub fn local() -> Self {
        Self { zone: Zone::Local }
    }

    /// `Some` for a fixed-offset calendar, `None` when following the host zone.
    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        match self.zone {
            Zone::Fixed(offset) => Some(offset),
            Zone::Local => None,
        }
    }

    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        match self.zone {
            Zone::Fixed(offset) => same_day(a, b, &offset),
            Zone::Local => same_day(a, b, &Local),
        }
    }

    pub fn same_month(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        match self.zone {
            Zone::Fixed(offset) => same_month(a, b, &offset),
            Zone::Local => same_month(a, b, &Local),
        }
    }

    pub fn next_midnight(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            Zone::Fixed(offset) => next_midnight(now, &offset),
            Zone::Local => next_midnight(now, &Local),
        }
    }

    pub fn end_of_month(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            Zone::Fixed(offset) => end_of_month(now, &offset),
            Zone::Local => end_of_month(now, &Local),
        }
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zone {
            Zone::Fixed(offset) => write!(f, "{offset}"),
            Zone::Local => f.write_str("local"),
        }
    }
}

fn local_date<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

pub fn same_day<Tz: TimeZone>(a: DateTime<Utc>, b: DateTime<Utc>, tz: &Tz) -> bool {
    local_date(a, tz) == local_date(b, tz)
}

pub fn same_month<Tz: TimeZone>(a: DateTime<Utc>, b: DateTime<Utc>, tz: &Tz) -> bool {
    let (a, b) = (local_date(a, tz), local_date(b, tz));
    a.year() == b.year() && a.month() == b.month()
}

/// First instant of the local day after `now`.
pub fn next_midnight<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    match local_date(now, tz).succ_opt() {
        Some(tomorrow) => start_of_day(tomorrow, tz),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// The instant the local month containing `now` ends, i.e. the first instant of the
/// next month.
pub fn end_of_month<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let today = local_date(now, tz);
    let (year, month) = match today.month() {
        12 => (today.year() + 1, 1),
        m => (today.year(), m + 1),
    };
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => start_of_day(first, tz),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// First instant of `date` in `tz`. When a forward shift skips midnight the day starts
/// at the first valid quarter hour after it.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=24 * 4)
        .map(|quarters| midnight + Duration::minutes(15 * quarters))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
