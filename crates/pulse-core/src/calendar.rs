//! Month grid for the calendar screen and campus-time formatting.
//!
//! Server timestamps are UTC; everything shown to the user is converted to
//! the campus offset from `[calendar]` config first. Weeks start on Monday.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Utc, Weekday};

use crate::models::Event;

/// Calendar date of a UTC instant in the campus time zone.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// `14 May 2025, 16:00`
pub fn format_datetime(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant
        .with_timezone(&offset)
        .format("%-d %B %Y, %H:%M")
        .to_string()
}

/// Start and end of an event, collapsing the date when both fall on the same day.
pub fn format_range(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    offset: FixedOffset,
) -> String {
    let Some(end) = end else {
        return format_datetime(start, offset);
    };
    let (local_start, local_end) = (start.with_timezone(&offset), end.with_timezone(&offset));
    if local_start.date_naive() == local_end.date_naive() {
        format!(
            "{}, {} - {}",
            local_start.format("%-d %B %Y"),
            local_start.format("%H:%M"),
            local_end.format("%H:%M")
        )
    } else {
        format!(
            "{} - {}",
            format_datetime(start, offset),
            format_datetime(end, offset)
        )
    }
}

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    first: NaiveDate,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    /// The month that is current on campus right now.
    pub fn current(offset: FixedOffset) -> Self {
        Self::containing(local_date(Utc::now(), offset))
    }

    pub fn year(self) -> i32 {
        self.first.year()
    }

    pub fn month(self) -> u32 {
        self.first.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.first
    }

    pub fn last_day(self) -> NaiveDate {
        self.next().first - Duration::days(1)
    }

    pub fn next(self) -> Self {
        Self {
            first: self.first.checked_add_months(Months::new(1)).unwrap_or(self.first),
        }
    }

    pub fn prev(self) -> Self {
        Self {
            first: self.first.checked_sub_months(Months::new(1)).unwrap_or(self.first),
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Self::containing(date) == self
    }

    /// `May 2025`
    pub fn label(self) -> String {
        self.first.format("%B %Y").to_string()
    }

    /// Monday-first weeks covering the whole month, padded with days of the
    /// neighbouring months.
    pub fn weeks(self) -> Vec<[NaiveDate; 7]> {
        let lead = i64::from(self.first.weekday().num_days_from_monday());
        let mut day = self.first - Duration::days(lead);
        let last = self.last_day();
        let mut weeks = Vec::new();
        while day <= last {
            let mut week = [day; 7];
            for (i, slot) in week.iter_mut().enumerate() {
                *slot = day + Duration::days(i64::try_from(i).unwrap_or(0));
            }
            weeks.push(week);
            day += Duration::days(7);
        }
        weeks
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = String;

    /// Parses `YYYY-MM`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid month '{value}' (expected YYYY-MM)");
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Month::new(year, month).ok_or_else(invalid)
    }
}

/// Events laid out on a month grid.
#[derive(Debug, Clone, Copy)]
pub struct MonthView {
    pub month: Month,
    pub offset: FixedOffset,
}

impl MonthView {
    pub fn new(month: Month, offset: FixedOffset) -> Self {
        Self { month, offset }
    }

    /// Campus-local first and last day an event occupies.
    pub fn span(&self, event: &Event) -> (NaiveDate, NaiveDate) {
        let start = local_date(event.start_datetime, self.offset);
        let end = local_date(event.effective_end(), self.offset).max(start);
        (start, end)
    }

    pub fn occurs_on(&self, event: &Event, day: NaiveDate) -> bool {
        let (start, end) = self.span(event);
        start <= day && day <= end
    }

    /// Events on `day`, ordered by start time.
    pub fn events_on<'a>(&self, events: &'a [Event], day: NaiveDate) -> Vec<&'a Event> {
        let mut found: Vec<&Event> = events.iter().filter(|e| self.occurs_on(e, day)).collect();
        found.sort_by_key(|e| e.start_datetime);
        found
    }

    /// Events that overlap the month, ordered by start time. This is the set
    /// exported to iCalendar.
    pub fn visible<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        let (first, last) = (self.month.first_day(), self.month.last_day());
        let mut found: Vec<&Event> = events
            .iter()
            .filter(|e| {
                let (start, end) = self.span(e);
                start <= last && end >= first
            })
            .collect();
        found.sort_by_key(|e| e.start_datetime);
        found
    }
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}
