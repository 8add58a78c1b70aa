use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Days, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;

pub const TIME_FORMAT_EXAMPLES: [&str; 3] = ["20:50", "11:34am", "3pm"];

static ALARM_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2})(?::([0-5]\d))?\s*(am|pm)?\s*$")
        .expect("alarm time pattern is valid")
});

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AlarmTime {
    pub hour: u32,
    pub minute: u32,
    pub meridiem: Option<Meridiem>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl AlarmTime {
    pub fn to_clock(self) -> ClockTime {
        let hour = match (self.hour, self.meridiem) {
            (12, Some(Meridiem::Am)) => 0,
            (12, _) => 12,
            (hour, Some(Meridiem::Pm)) => hour + 12,
            (hour, _) => hour,
        };
        ClockTime {
            hour,
            minute: self.minute,
        }
    }
}

impl FromStr for AlarmTime {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        parse_alarm_time(input).ok_or_else(|| {
            anyhow!(
                "invalid alarm time '{}', expected a format like {}",
                input.trim(),
                TIME_FORMAT_EXAMPLES.join(", ")
            )
        })
    }
}

impl ClockTime {
    fn naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

pub fn parse_alarm_time(input: &str) -> Option<AlarmTime> {
    let captures = ALARM_TIME_REGEX.captures(input)?;
    let hour = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let minute = match captures.get(2) {
        Some(value) => value.as_str().parse::<u32>().ok()?,
        None => 0,
    };
    let meridiem = captures
        .get(3)
        .map(|value| match value.as_str().to_ascii_lowercase().as_str() {
            "am" => Meridiem::Am,
            _ => Meridiem::Pm,
        });

    let hour_in_range = match meridiem {
        Some(_) => (1..=12).contains(&hour),
        None => hour <= 23,
    };
    if !hour_in_range || minute > 59 {
        return None;
    }

    Some(AlarmTime {
        hour,
        minute,
        meridiem,
    })
}

// Earliest instance of `naive` after `now`; a repeated hour yields its
// second instance once the first has passed.
fn resolve_local_datetime_after<Tz>(
    timezone: &Tz,
    naive: NaiveDateTime,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => (dt > *now).then_some(dt),
        LocalResult::Ambiguous(first, second) => {
            if first > *now {
                Some(first)
            } else {
                (second > *now).then_some(second)
            }
        }
        LocalResult::None => None,
    }
}

pub fn next_alarm_in_tz<Tz>(clock: ClockTime, now: &DateTime<Tz>, timezone: &Tz) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let time_local = clock.naive()?;

    // Alarm minutes are whole, so "after now" equals the strictly-later
    // minute comparison except inside a repeated hour.
    for day_offset in 0_u64..3 {
        let date = now.date_naive().checked_add_days(Days::new(day_offset))?;
        let naive = date.and_time(time_local);
        if let Some(candidate) = resolve_local_datetime_after(timezone, naive, now) {
            return Some(candidate);
        }
    }

    None
}

pub fn next_alarm_local(clock: ClockTime, now: &DateTime<Local>) -> Option<DateTime<Local>> {
    next_alarm_in_tz(clock, now, &Local)
}

pub fn seconds_between<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> i64 {
    target.clone().signed_duration_since(now.clone()).num_seconds()
}

pub fn seconds_until(clock: ClockTime, now: &DateTime<Local>) -> Result<i64> {
    let target = next_alarm_local(clock, now)
        .ok_or_else(|| anyhow!("no valid local time for {clock} in the next two days"))?;
    Ok(seconds_between(now, &target))
}
