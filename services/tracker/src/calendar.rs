//! Jalali (Solar Hijri) calendar used by the outage provider.
//!
//! The provider speaks Jalali dates (`1404/04/19`) in Asia/Tehran wall-clock time;
//! storage uses Gregorian dates. Conversion follows the 33-year break-table
//! algorithm, valid for Jalali years -61 through 3177.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Asia/Tehran offset from UTC (+03:30). Iran has not observed DST since 2022.
pub const PROVIDER_UTC_OFFSET_SECS: i64 = 3 * 3600 + 30 * 60;

/// Days covered by one report request, counted forward from today.
pub const REPORT_WINDOW_DAYS: i64 = 7;

const BREAKS: [i32; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("malformed jalali date: {0:?}")]
    Malformed(String),
    #[error("jalali date out of range: {0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JalaliDate {
    year: i32,
    month: u32,
    day: u32,
}

struct YearInfo {
    /// Position in the 4-year leap cycle; 0 means this year is leap.
    leap: i32,
    gregorian_year: i32,
    /// Day of March on which Farvardin 1 falls.
    march: u32,
}

fn year_info(jy: i32) -> Option<YearInfo> {
    if jy < BREAKS[0] || jy >= BREAKS[BREAKS.len() - 1] {
        return None;
    }
    let gy = jy + 621;
    let mut leap_j = -14;
    let mut jp = BREAKS[0];
    let mut jump = 0;
    for &jm in &BREAKS[1..] {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += jump / 33 * 8 + (jump % 33) / 4;
        jp = jm;
    }
    let mut n = jy - jp;
    leap_j += n / 33 * 8 + (n % 33 + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }
    let leap_g = gy / 4 - (gy / 100 + 1) * 3 / 4 - 150;
    let march = 20 + leap_j - leap_g;

    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }
    Some(YearInfo {
        leap,
        gregorian_year: gy,
        march: u32::try_from(march).ok()?,
    })
}

/// Whether `year` has a 30-day Esfand. `false` outside the supported range.
pub fn is_leap_year(year: i32) -> bool {
    year_info(year).is_some_and(|info| info.leap == 0)
}

/// Length of `month` in `year`, or `None` for an invalid month.
pub fn month_length(year: i32, month: u32) -> Option<u32> {
    match month {
        1..=6 => Some(31),
        7..=11 => Some(30),
        12 if is_leap_year(year) => Some(30),
        12 => Some(29),
        _ => None,
    }
}

impl JalaliDate {
    /// Validated constructor. Rejects out-of-range years, months and days.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        year_info(year)?;
        let len = month_length(year, month)?;
        (1..=len).contains(&day).then_some(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn to_gregorian(&self) -> Option<NaiveDate> {
        let info = year_info(self.year)?;
        let start = NaiveDate::from_ymd_opt(info.gregorian_year, 3, info.march)?;
        let offset = if self.month <= 6 {
            (self.month - 1) * 31
        } else {
            186 + (self.month - 7) * 30
        };
        start.checked_add_signed(Duration::days(i64::from(offset + self.day - 1)))
    }

    pub fn from_gregorian(date: NaiveDate) -> Option<Self> {
        let mut jy = date.year() - 621;
        let info = year_info(jy)?;
        let start = NaiveDate::from_ymd_opt(info.gregorian_year, 3, info.march)?;
        let mut k = (date - start).num_days();

        let (month, day) = if k >= 0 {
            if k <= 185 {
                (1 + k / 31, k % 31 + 1)
            } else {
                k -= 186;
                (7 + k / 30, k % 30 + 1)
            }
        } else {
            jy -= 1;
            k += 179;
            if info.leap == 1 {
                k += 1;
            }
            (7 + k / 30, k % 30 + 1)
        };
        Self::new(jy, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
    }
}

/// Unpadded `jy/jm/jd`, the form the report API expects in requests.
impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.month, self.day)
    }
}

/// Accepts `Y/M/D` with or without zero padding (`1404/04/19`, `1404/4/19`).
impl FromStr for JalaliDate {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CalendarError::Malformed(s.to_owned());
        let mut parts = s.trim().split('/');
        let (Some(y), Some(m), Some(d), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let year: i32 = y.parse().map_err(|_| malformed())?;
        let month: u32 = m.parse().map_err(|_| malformed())?;
        let day: u32 = d.parse().map_err(|_| malformed())?;
        Self::new(year, month, day).ok_or_else(|| CalendarError::OutOfRange(s.to_owned()))
    }
}

/// Parse a provider date string straight to its Gregorian equivalent.
pub fn parse_to_gregorian(s: &str) -> Result<NaiveDate, CalendarError> {
    let date: JalaliDate = s.parse()?;
    date.to_gregorian()
        .ok_or_else(|| CalendarError::OutOfRange(s.to_owned()))
}

/// Today's calendar day on the provider's wall clock, as a Gregorian date.
pub fn provider_today(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::seconds(PROVIDER_UTC_OFFSET_SECS)).date_naive()
}

/// Inclusive `[today, today + 7]` request window in the provider's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub from: JalaliDate,
    pub to: JalaliDate,
}

impl ReportWindow {
    pub fn starting_at(now: DateTime<Utc>) -> Option<Self> {
        let today = provider_today(now);
        let end = today.checked_add_signed(Duration::days(REPORT_WINDOW_DAYS))?;
        Some(Self {
            from: JalaliDate::from_gregorian(today)?,
            to: JalaliDate::from_gregorian(end)?,
        })
    }
}
