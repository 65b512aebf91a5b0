use diesel::{AsExpression, FromSqlRow};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

lazy_static! {
    static ref CLOCK_TIME_REGEX: Regex = Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap();
}

/// A wall-clock time of day with minute granularity, stored as minutes since midnight.
///
/// The textual representation is `HH:MM`. In the database, it is stored in this textual form
/// (see [crate::data_store::util]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsExpression, FromSqlRow)]
#[diesel(sql_type=diesel::sql_types::Text)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    /// Create a ClockTime from hours and minutes. Returns None, if hours or minutes are out of
    /// range.
    pub fn from_hm(hours: u16, minutes: u16) -> Option<Self> {
        if hours < 24 && minutes < 60 {
            Some(Self(hours * 60 + minutes))
        } else {
            None
        }
    }

    /// Create a ClockTime from minutes since midnight, without range check. Only to be used with
    /// values known to be less than [Self::MINUTES_PER_DAY].
    pub(crate) const fn from_minutes_unchecked(minutes: u16) -> Self {
        Self(minutes)
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }
}

impl FromStr for ClockTime {
    type Err = TimeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_minutes(s).map(Self)
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormatError {
    pub value: String,
}

impl Display for TimeFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a valid time of day in HH:MM format", self.value)
    }
}

impl std::error::Error for TimeFormatError {}

/// Parse an `HH:MM` string into minutes since midnight.
///
/// Hours must be in 0..=23 and minutes in 0..=59.
pub fn to_minutes(time: &str) -> Result<u16, TimeFormatError> {
    let error = || TimeFormatError {
        value: time.to_owned(),
    };
    let captures = CLOCK_TIME_REGEX.captures(time.trim()).ok_or_else(error)?;
    let hours: u16 = captures[1].parse().map_err(|_| error())?;
    let minutes: u16 = captures[2].parse().map_err(|_| error())?;
    ClockTime::from_hm(hours, minutes)
        .map(|t| t.minutes())
        .ok_or_else(error)
}

/// Check if the half-open intervals `[a_start, a_end)` and `[b_start, b_end)` overlap.
///
/// Intervals which only touch (one ends exactly when the other begins) do not overlap.
pub fn overlaps(a_start: ClockTime, a_end: ClockTime, b_start: ClockTime, b_end: ClockTime) -> bool {
    a_start < b_end && a_end > b_start
}

/// A non-empty half-open interval `[start, end)` on a single calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: ClockTime,
    end: ClockTime,
}

impl TimeInterval {
    /// Create a new interval. Returns None if `start` is not strictly before `end`.
    pub fn new(start: ClockTime, end: ClockTime) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> ClockTime {
        self.start
    }

    pub fn end(&self) -> ClockTime {
        self.end
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    /// Check if the given point in time lies within `[start, end)`
    pub fn contains(&self, time: ClockTime) -> bool {
        self.start <= time && time < self.end
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes() - self.start.minutes()
    }
}

impl Display for TimeInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
