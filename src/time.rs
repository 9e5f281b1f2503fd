//! Calendar dates, Modified Julian Dates and uniform UTC arithmetic.
use std::str::FromStr;

use hifitime::Unit;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Duration, Epoch, Error};

/// Last Julian calendar day before the Gregorian reform (1582-10-04),
/// followed by 1582-10-15.
const REFORM_YEAR: i32 = 1582;
const REFORM_MONTH: u8 = 10;
const REFORM_GAP: std::ops::RangeInclusive<u8> = 5..=14;

const MAX_YEAR: i32 = 9999;

/// Gregorian calendar date and UTC time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalendarDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanos: u32,
}

impl CalendarDate {
    /// Builds a [CalendarDate] at midnight.
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Self {
        Self::from_ymd_hms(year, month, day, 0, 0, 0)
    }

    /// Builds a [CalendarDate] with whole seconds.
    pub fn from_ymd_hms(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanos: 0,
        }
    }

    /// Copies and returns [CalendarDate] with fractional second.
    pub fn with_nanos(&self, nanos: u32) -> Self {
        let mut s = *self;
        s.nanos = nanos;
        s
    }

    fn is_leap_year(year: i32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }

    fn days_in_month(year: i32, month: u8) -> u8 {
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if Self::is_leap_year(year) => 29,
            _ => 28,
        }
    }

    /// Verifies this date exists in the Gregorian calendar
    /// and within the supported time span.
    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=12).contains(&self.month) {
            return Err(Error::InvalidDate(format!("month {} out of range", self.month)));
        }
        if self.day == 0 || self.day > Self::days_in_month(self.year, self.month) {
            return Err(Error::InvalidDate(format!(
                "day {} out of range for {:04}-{:02}",
                self.day, self.year, self.month
            )));
        }
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(Error::InvalidDate(format!(
                "time of day {:02}:{:02}:{:02} out of range",
                self.hour, self.minute, self.second
            )));
        }
        if self.nanos >= 1_000_000_000 {
            return Err(Error::InvalidDate(format!(
                "{} nanoseconds out of range",
                self.nanos
            )));
        }

        let before_reform = self.year < REFORM_YEAR
            || (self.year == REFORM_YEAR && self.month < REFORM_MONTH)
            || (self.year == REFORM_YEAR
                && self.month == REFORM_MONTH
                && self.day < *REFORM_GAP.start());

        if self.year == REFORM_YEAR && self.month == REFORM_MONTH && REFORM_GAP.contains(&self.day)
        {
            return Err(Error::InvalidDate(format!(
                "1582-10-{:02} does not exist (Gregorian reform)",
                self.day
            )));
        }
        if before_reform || self.year > MAX_YEAR {
            return Err(Error::InvalidDate(format!(
                "year {} outside of supported range",
                self.year
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.nanos > 0 {
            write!(f, ".{:09}", self.nanos)?;
        }
        Ok(())
    }
}

fn parse_field<T: FromStr>(field: &str, name: &str) -> Result<T, Error> {
    field
        .trim()
        .parse::<T>()
        .map_err(|_| Error::InvalidDate(format!("invalid {} \"{}\"", name, field)))
}

/// Parses "SS[.fff]" into whole seconds and nanoseconds.
fn parse_seconds(field: &str) -> Result<(u8, u32), Error> {
    let (whole, frac) = match field.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (field, ""),
    };

    let second = parse_field::<u8>(whole, "second")?;

    if frac.is_empty() {
        return Ok((second, 0));
    }
    if frac.len() > 9 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidDate(format!("invalid fraction \"{}\"", frac)));
    }

    let padded = format!("{:0<9}", frac);
    let nanos = parse_field::<u32>(&padded, "fraction")?;
    Ok((second, nanos))
}

impl FromStr for CalendarDate {
    type Err = Error;
    /// Parses "YYYY-MM-DD", "YYYY-MM-DD HH:MM:SS[.fff]",
    /// "YYYY-MM-DDTHH:MM:SS[.fff]" or "YYYY MM DD HH MM SS[.fff]".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let fields = if s.contains('-') {
            let (date, time) = match s.split_once(|c: char| c == 'T' || c == ' ') {
                Some((date, time)) => (date, Some(time.trim())),
                None => (s, None),
            };

            let mut fields = date.split('-').collect::<Vec<_>>();
            if let Some(time) = time {
                fields.extend(time.split(':'));
            }
            fields
        } else {
            s.split_ascii_whitespace().collect::<Vec<_>>()
        };

        let date = match fields.as_slice() {
            [y, m, d] => Self::from_ymd(
                parse_field(y, "year")?,
                parse_field(m, "month")?,
                parse_field(d, "day")?,
            ),
            [y, m, d, hh, mm, ss] => {
                let (second, nanos) = parse_seconds(ss)?;
                Self::from_ymd_hms(
                    parse_field(y, "year")?,
                    parse_field(m, "month")?,
                    parse_field(d, "day")?,
                    parse_field(hh, "hour")?,
                    parse_field(mm, "minute")?,
                    second,
                )
                .with_nanos(nanos)
            },
            _ => return Err(Error::InvalidDate(format!("unrecognized format \"{}\"", s))),
        };

        date.validate()?;
        Ok(date)
    }
}

/// Converts a calendar date to its UTC [Epoch].
pub fn date_to_epoch(date: &CalendarDate) -> Result<Epoch, Error> {
    date.validate()?;
    Epoch::maybe_from_gregorian_utc(
        date.year,
        date.month,
        date.day,
        date.hour,
        date.minute,
        date.second,
        date.nanos,
    )
    .map_err(|e| Error::InvalidDate(e.to_string()))
}

/// Converts an [Epoch] back to its UTC calendar date.
pub fn epoch_to_date(epoch: Epoch) -> CalendarDate {
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    CalendarDate {
        year,
        month,
        day,
        hour,
        minute,
        second,
        nanos,
    }
}

/// UTC referenced Modified Julian Date, in days.
pub fn epoch_to_mjd(epoch: Epoch) -> f64 {
    epoch.to_mjd_utc_days()
}

/// [Epoch] from UTC referenced Modified Julian Date.
pub fn mjd_to_epoch(mjd: f64) -> Epoch {
    Epoch::from_mjd_utc(mjd)
}

/// Calendar date to Modified Julian Date.
pub fn date_to_mjd(date: &CalendarDate) -> Result<f64, Error> {
    Ok(epoch_to_mjd(date_to_epoch(date)?))
}

/// Modified Julian Date to calendar date.
pub fn mjd_to_date(mjd: f64) -> CalendarDate {
    epoch_to_date(mjd_to_epoch(mjd))
}

/// Elapsed time from `t0` to `t1` in uniform UTC seconds
/// (leap seconds are not accounted for).
pub fn elapsed_seconds(t0: Epoch, t1: Epoch) -> f64 {
    (t1.to_utc_duration() - t0.to_utc_duration()).to_seconds()
}

/// Offsets `t` by `seconds` of uniform UTC time.
pub fn offset(t: Epoch, seconds: f64) -> Epoch {
    Epoch::from_utc_duration(t.to_utc_duration() + Duration::from_seconds(seconds))
}

/// Julian centuries since J2000, used by the sidereal time
/// and analytical ephemerides.
pub(crate) fn julian_centuries_j2000(t: Epoch) -> f64 {
    (epoch_to_mjd(t) - 51544.5) / 36525.0
}

/// Regular, increasing time grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeGrid {
    /// First epoch
    pub start: Epoch,
    /// Last epoch, included when it lands on the grid
    pub end: Epoch,
    /// Sampling period
    pub step: Duration,
}

impl TimeGrid {
    /// Builds a new [TimeGrid]. `step` must be strictly positive
    /// and `end` must not preceed `start`.
    pub fn new(start: Epoch, end: Epoch, step: Duration) -> Result<Self, Error> {
        if step <= Duration::ZERO || end < start {
            return Err(Error::UnorderedEpochs);
        }
        Ok(Self { start, end, step })
    }

    /// Builds a [TimeGrid] from a start epoch, a total duration and a step,
    /// both expressed in minutes.
    pub fn from_minutes(start: Epoch, duration_min: f64, step_min: f64) -> Result<Self, Error> {
        Self::new(
            start,
            start + duration_min * Unit::Minute,
            step_min * Unit::Minute,
        )
    }

    /// Grid epochs.
    pub fn epochs(&self) -> Vec<Epoch> {
        let span = elapsed_seconds(self.start, self.end);
        let step = self.step.to_seconds();
        // tolerate floating point residue on the last sample
        let n = (span / step + 1.0E-9).floor() as usize;
        (0..=n)
            .map(|i| offset(self.start, i as f64 * step))
            .collect()
    }
}
